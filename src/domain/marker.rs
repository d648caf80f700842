use crate::domain::wall_clock::WallClockTime;
use serde::{Deserialize, Serialize};

pub const DEFAULT_ANCHOR_HOUR: u8 = 5;
pub const DEFAULT_CUTOFF_HOUR: u8 = 22;

/// Hours during which the "now" marker is drawn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct MarkerWindow {
    pub anchor_hour: u8,
    pub cutoff_hour: u8,
}

impl Default for MarkerWindow {
    fn default() -> Self {
        Self {
            anchor_hour: DEFAULT_ANCHOR_HOUR,
            cutoff_hour: DEFAULT_CUTOFF_HOUR,
        }
    }
}

impl MarkerWindow {
    pub fn validate(&self) -> Result<(), String> {
        if self.anchor_hour > 23 || self.cutoff_hour > 23 {
            return Err("marker hours must be within 0..=23".to_string());
        }
        if self.cutoff_hour < self.anchor_hour {
            return Err("marker cutoff hour must not precede the anchor hour".to_string());
        }
        Ok(())
    }

    pub fn minutes_since_anchor(&self, now: WallClockTime) -> Option<u32> {
        minutes_since_anchor(now, self.anchor_hour, self.cutoff_hour)
    }
}

/// Minutes elapsed since `anchor_hour:00`, or `None` outside
/// `[anchor_hour:00, cutoff_hour:59]`.
pub fn minutes_since_anchor(now: WallClockTime, anchor_hour: u8, cutoff_hour: u8) -> Option<u32> {
    let hour = now.hour();
    if hour < anchor_hour || hour > cutoff_hour {
        return None;
    }
    Some(u32::from(hour - anchor_hour) * 60 + u32::from(now.minute()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(value: &str) -> WallClockTime {
        value.parse().expect("valid time")
    }

    #[test]
    fn no_marker_before_anchor() {
        assert_eq!(MarkerWindow::default().minutes_since_anchor(time("04:59")), None);
    }

    #[test]
    fn marker_counts_from_anchor() {
        let window = MarkerWindow::default();
        assert_eq!(window.minutes_since_anchor(time("05:00")), Some(0));
        assert_eq!(window.minutes_since_anchor(time("07:15")), Some(135));
    }

    #[test]
    fn cutoff_hour_is_inclusive() {
        let window = MarkerWindow::default();
        assert_eq!(window.minutes_since_anchor(time("22:59")), Some(17 * 60 + 59));
        assert_eq!(window.minutes_since_anchor(time("23:00")), None);
    }

    #[test]
    fn validate_rejects_inverted_window() {
        let window = MarkerWindow {
            anchor_hour: 10,
            cutoff_hour: 9,
        };
        assert!(window.validate().is_err());
        assert!(MarkerWindow::default().validate().is_ok());
    }
}
