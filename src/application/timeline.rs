use crate::domain::day_type::{resolve_day_type, TranslationTable};
use crate::domain::dedupe::{dedupe, DedupeKeyPolicy};
use crate::domain::models::{
    BrickCategory, BrickEntry, BrickTemplate, CalendarMap, DayTypeKey, ExternalEvent, HardStop,
    RoutineDefinition, ScheduleBrick, ScheduleConfig, EXTERNAL_EVENT_COLOR, MORNING_ROUTINE_COLOR,
};
use crate::domain::places::{find_place, maps_link};
use crate::infrastructure::config::PlannerSettings;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::feed_parser::{parse_events_for_date, FeedParseOptions};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineOptions {
    pub translations: TranslationTable,
    pub default_day_type: String,
    pub dedupe_key: DedupeKeyPolicy,
    pub feed_title_marker: String,
    pub feed_parse: FeedParseOptions,
}

impl TimelineOptions {
    pub fn from_settings(settings: &PlannerSettings) -> Self {
        Self {
            translations: settings.day_types.translations.clone(),
            default_day_type: settings.day_types.default.clone(),
            dedupe_key: settings.feed.dedupe_key,
            feed_title_marker: settings.feed.title_marker.clone(),
            feed_parse: settings.feed.parse_options(),
        }
    }
}

impl Default for TimelineOptions {
    fn default() -> Self {
        Self::from_settings(&PlannerSettings::default())
    }
}

/// What the feed fetch produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedInput {
    Text(String),
    Unavailable(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FeedStatus {
    Synced { events: usize },
    NoEventsToday,
    Unavailable { reason: String },
    Malformed { reason: String },
}

impl FeedStatus {
    /// Why the feed could not contribute, if it could not.
    pub fn degraded_reason(&self) -> Option<&str> {
        match self {
            Self::Unavailable { reason } | Self::Malformed { reason } => Some(reason),
            Self::Synced { .. } | Self::NoEventsToday => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    pub date: NaiveDate,
    pub day_type: DayTypeKey,
    pub bricks: Vec<ScheduleBrick>,
    pub feed_status: FeedStatus,
    /// Recovered missing references.
    pub warnings: Vec<String>,
}

/// Backward chain: deadline minus commute is departure, departure minus the
/// routine length is the start.
pub fn derive_morning_brick(
    hard_stop: &HardStop,
    routine: &RoutineDefinition,
) -> Result<ScheduleBrick, InfraError> {
    let departure = hard_stop
        .time
        .subtract_minutes(i64::from(hard_stop.commute_minutes))
        .map_err(|message| {
            InfraError::TimeOutOfRange(format!("departure for '{}': {message}", routine.label))
        })?;
    let start = departure
        .subtract_minutes(i64::from(routine.duration))
        .map_err(|message| {
            InfraError::TimeOutOfRange(format!("start of '{}': {message}", routine.label))
        })?;

    Ok(ScheduleBrick {
        start,
        end: departure,
        title: routine.label.clone(),
        category: BrickCategory::MorningRoutine,
        color: MORNING_ROUTINE_COLOR.to_string(),
        subtasks: routine.subtasks.clone(),
        maps_link: None,
    })
}

fn morning_brick(
    schedule: &ScheduleConfig,
    warnings: &mut Vec<String>,
) -> Result<Option<ScheduleBrick>, InfraError> {
    let Some(hard_stop) = schedule.hard_stops.school_dropoff.as_ref() else {
        return Ok(None);
    };
    let Some(routine) = schedule
        .definitions
        .routines
        .get(hard_stop.trigger_routine.trim())
    else {
        warnings.push(
            InfraError::MissingReference {
                kind: "routine",
                id: hard_stop.trigger_routine.clone(),
            }
            .to_string(),
        );
        return Ok(None);
    };
    derive_morning_brick(hard_stop, routine).map(Some)
}

/// Foundation bricks for `day_type` in configured order. Unknown templates
/// and places fall back to neutral values and add a warning.
pub fn expand_foundation(
    schedule: &ScheduleConfig,
    day_type: &DayTypeKey,
    warnings: &mut Vec<String>,
) -> Result<Vec<ScheduleBrick>, InfraError> {
    let Some(entries) = schedule.days.get(day_type.as_str()) else {
        return Ok(Vec::new());
    };

    entries
        .iter()
        .map(|entry| foundation_brick(schedule, entry, warnings))
        .collect()
}

fn foundation_brick(
    schedule: &ScheduleConfig,
    entry: &BrickEntry,
    warnings: &mut Vec<String>,
) -> Result<ScheduleBrick, InfraError> {
    let template = match schedule.definitions.brick_templates.get(entry.template.trim()) {
        Some(template) => template.clone(),
        None => {
            warnings.push(
                InfraError::MissingReference {
                    kind: "brick template",
                    id: entry.template.clone(),
                }
                .to_string(),
            );
            BrickTemplate::neutral()
        }
    };

    let end = match (entry.end, entry.duration) {
        (Some(end), _) => end,
        (None, Some(duration)) => entry
            .start
            .add_minutes(i64::from(duration))
            .map_err(|message| {
                InfraError::TimeOutOfRange(format!("end of '{}': {message}", entry.template))
            })?,
        (None, None) => {
            return Err(InfraError::InvalidConfig(format!(
                "brick '{}' at {} has neither end nor duration",
                entry.template, entry.start
            )));
        }
    };

    let maps_link = entry.place.as_deref().and_then(|place_id| {
        match find_place(&schedule.definitions.places, place_id) {
            Some(place) => maps_link(place),
            None => {
                warnings.push(
                    InfraError::MissingReference {
                        kind: "place",
                        id: place_id.to_string(),
                    }
                    .to_string(),
                );
                None
            }
        }
    });

    let title = entry
        .label
        .clone()
        .or_else(|| template.label.clone())
        .unwrap_or_else(|| entry.template.clone());

    Ok(ScheduleBrick {
        start: entry.start,
        end,
        title,
        category: BrickCategory::Foundation,
        color: template.color,
        subtasks: Vec::new(),
        maps_link,
    })
}

/// Parsed, deduplicated feed events for `date`. Feed problems degrade to an
/// empty list with a status instead of failing.
pub fn feed_events(
    feed: &FeedInput,
    date: NaiveDate,
    options: &TimelineOptions,
) -> (Vec<ExternalEvent>, FeedStatus) {
    let text = match feed {
        FeedInput::Text(text) => text,
        FeedInput::Unavailable(reason) => {
            return (
                Vec::new(),
                FeedStatus::Unavailable {
                    reason: reason.clone(),
                },
            );
        }
    };

    match parse_events_for_date(text, date, options.feed_parse) {
        Ok(events) => {
            let events = dedupe(events, options.dedupe_key);
            let status = if events.is_empty() {
                FeedStatus::NoEventsToday
            } else {
                FeedStatus::Synced {
                    events: events.len(),
                }
            };
            (events, status)
        }
        Err(error) => (
            Vec::new(),
            FeedStatus::Malformed {
                reason: error.to_string(),
            },
        ),
    }
}

fn feed_brick(event: ExternalEvent, title_marker: &str) -> ScheduleBrick {
    ScheduleBrick {
        start: event.start,
        end: event.end,
        title: format!("{title_marker}{}", event.title),
        category: BrickCategory::External,
        color: EXTERNAL_EVENT_COLOR.to_string(),
        subtasks: Vec::new(),
        maps_link: None,
    }
}

/// Output order is morning brick, foundation bricks, then feed bricks. The
/// groups are neither time-sorted nor checked for overlap.
pub fn assemble_timeline(
    schedule: &ScheduleConfig,
    calendar: &CalendarMap,
    feed: &FeedInput,
    today: NaiveDate,
    options: &TimelineOptions,
) -> Result<Timeline, InfraError> {
    let mut warnings = Vec::new();
    let day_type = resolve_day_type(
        today,
        &schedule.overrides,
        calendar,
        &options.translations,
        &options.default_day_type,
    );

    let mut bricks = Vec::new();
    bricks.extend(morning_brick(schedule, &mut warnings)?);
    bricks.extend(expand_foundation(schedule, &day_type, &mut warnings)?);

    let (events, feed_status) = feed_events(feed, today, options);
    bricks.extend(
        events
            .into_iter()
            .map(|event| feed_brick(event, &options.feed_title_marker)),
    );

    Ok(Timeline {
        date: today,
        day_type,
        bricks,
        feed_status,
        warnings,
    })
}
