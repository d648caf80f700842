use crate::application::timeline::{FeedStatus, Timeline};
use crate::domain::models::ScheduleBrick;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrickView {
    pub time_label: String,
    pub title: String,
    pub color_class: String,
    pub subtasks: Vec<String>,
    pub height_px: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maps_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarkerView {
    pub minutes_since_anchor: u32,
    pub top_px: f64,
}

/// Everything the renderer needs, as plain data.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayView {
    pub header: String,
    pub bricks: Vec<BrickView>,
    pub marker: Option<MarkerView>,
    pub feed_status: FeedStatus,
}

pub fn brick_view(brick: &ScheduleBrick, pixels_per_minute: f64) -> BrickView {
    let minutes = brick.duration_minutes().max(0);
    BrickView {
        time_label: format!("{} - {}", brick.start.to_12_hour(), brick.end.to_12_hour()),
        title: brick.title.clone(),
        color_class: brick.color.clone(),
        subtasks: brick.subtasks.clone(),
        height_px: f64::from(minutes) * pixels_per_minute,
        maps_link: brick.maps_link.clone(),
    }
}

pub fn marker_view(minutes_since_anchor: Option<u32>, pixels_per_minute: f64) -> Option<MarkerView> {
    minutes_since_anchor.map(|minutes| MarkerView {
        minutes_since_anchor: minutes,
        top_px: f64::from(minutes) * pixels_per_minute,
    })
}

pub fn day_view(
    timeline: &Timeline,
    minutes_since_anchor: Option<u32>,
    pixels_per_minute: f64,
) -> DayView {
    DayView {
        header: format!("{} ({})", timeline.date.format("%Y-%m-%d"), timeline.day_type),
        bricks: timeline
            .bricks
            .iter()
            .map(|brick| brick_view(brick, pixels_per_minute))
            .collect(),
        marker: marker_view(minutes_since_anchor, pixels_per_minute),
        feed_status: timeline.feed_status.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BrickCategory, DayTypeKey};
    use chrono::NaiveDate;

    fn brick(start: &str, end: &str) -> ScheduleBrick {
        ScheduleBrick {
            start: start.parse().expect("start"),
            end: end.parse().expect("end"),
            title: "Morning Launch".to_string(),
            category: BrickCategory::MorningRoutine,
            color: "purple".to_string(),
            subtasks: vec!["Dress".to_string()],
            maps_link: None,
        }
    }

    #[test]
    fn brick_view_scales_height_and_labels_time() {
        let view = brick_view(&brick("06:55", "07:15"), 1.5);
        assert_eq!(view.time_label, "6:55AM - 7:15AM");
        assert_eq!(view.height_px, 30.0);
        assert_eq!(view.color_class, "purple");
        assert_eq!(view.subtasks, vec!["Dress".to_string()]);
    }

    #[test]
    fn inverted_brick_has_zero_height() {
        let view = brick_view(&brick("13:00", "12:00"), 1.2);
        assert_eq!(view.height_px, 0.0);
        assert_eq!(view.time_label, "1:00PM - 12:00PM");
    }

    #[test]
    fn day_view_includes_header_and_marker() {
        let timeline = Timeline {
            date: NaiveDate::from_ymd_opt(2026, 1, 14).expect("valid date"),
            day_type: DayTypeKey::new("A_Day"),
            bricks: vec![brick("06:55", "07:15")],
            feed_status: FeedStatus::NoEventsToday,
            warnings: Vec::new(),
        };
        let view = day_view(&timeline, Some(100), 2.0);
        assert_eq!(view.header, "2026-01-14 (A_Day)");
        assert_eq!(view.bricks.len(), 1);
        assert_eq!(
            view.marker,
            Some(MarkerView {
                minutes_since_anchor: 100,
                top_px: 200.0,
            })
        );

        assert_eq!(day_view(&timeline, None, 2.0).marker, None);
    }
}
