use crate::domain::places::Place;
use crate::domain::wall_clock::{duration_minutes, WallClockTime};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

pub const MORNING_ROUTINE_COLOR: &str = "purple";
pub const EXTERNAL_EVENT_COLOR: &str = "orange";
pub const NEUTRAL_TEMPLATE_COLOR: &str = "grey";

/// Raw day-type codes keyed by `YYYY-MM-DD`.
pub type CalendarMap = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DayTypeKey(String);

impl DayTypeKey {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DayTypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutineDefinition {
    pub label: String,
    /// Minutes.
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default)]
    pub subtasks: Vec<String>,
}

impl RoutineDefinition {
    pub fn validate(&self, id: &str) -> Result<(), String> {
        validate_non_empty(&self.label, &format!("definitions.routines.{id}.label"))?;
        if self.duration == 0 {
            return Err(format!("definitions.routines.{id}.duration must be > 0"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HardStop {
    pub time: WallClockTime,
    pub commute_minutes: u32,
    pub trigger_routine: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct HardStops {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_dropoff: Option<HardStop>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrickTemplate {
    pub color: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl BrickTemplate {
    pub fn neutral() -> Self {
        Self {
            color: NEUTRAL_TEMPLATE_COLOR.to_string(),
            label: None,
        }
    }
}

/// One foundation schedule entry; `end` wins over `duration` when both are set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BrickEntry {
    pub template: String,
    pub start: WallClockTime,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<WallClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
}

impl BrickEntry {
    pub fn validate(&self, field_name: &str) -> Result<(), String> {
        validate_non_empty(&self.template, &format!("{field_name}.template"))?;
        if self.end.is_none() && self.duration.is_none() {
            return Err(format!("{field_name} needs either end or duration"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Definitions {
    #[serde(default)]
    pub routines: HashMap<String, RoutineDefinition>,
    #[serde(default)]
    pub brick_templates: HashMap<String, BrickTemplate>,
    #[serde(default)]
    pub places: HashMap<String, Place>,
}

/// The static weekly schedule document.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub overrides: HashMap<String, String>,
    #[serde(default)]
    pub hard_stops: HardStops,
    #[serde(default)]
    pub definitions: Definitions,
    #[serde(default)]
    pub days: HashMap<String, Vec<BrickEntry>>,
}

impl ScheduleConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (date, code) in &self.overrides {
            validate_date(date, "overrides key")?;
            validate_non_empty(code, &format!("overrides.{date}"))?;
        }
        for (id, routine) in &self.definitions.routines {
            routine.validate(id)?;
        }
        for (day_type, entries) in &self.days {
            for (index, entry) in entries.iter().enumerate() {
                entry.validate(&format!("days.{day_type}[{index}]"))?;
            }
        }
        Ok(())
    }
}

pub fn validate_calendar(calendar: &CalendarMap) -> Result<(), String> {
    for (date, code) in calendar {
        validate_date(date, "calendar key")?;
        validate_non_empty(code, &format!("calendar.{date}"))?;
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BrickCategory {
    MorningRoutine,
    Foundation,
    External,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScheduleBrick {
    pub start: WallClockTime,
    pub end: WallClockTime,
    pub title: String,
    pub category: BrickCategory,
    pub color: String,
    pub subtasks: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maps_link: Option<String>,
}

impl ScheduleBrick {
    pub fn duration_minutes(&self) -> i32 {
        duration_minutes(self.start, self.end)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalEvent {
    pub title: String,
    pub start: WallClockTime,
    pub end: WallClockTime,
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

fn validate_date(value: &str, field_name: &str) -> Result<(), String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| format!("{field_name} '{value}' must be YYYY-MM-DD"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_SCHEDULE: &str = r#"{
        "overrides": { "2026-01-16": "PD" },
        "hard_stops": {
            "school_dropoff": { "time": "07:30", "commute_minutes": 15, "trigger_routine": "launch" }
        },
        "definitions": {
            "routines": {
                "launch": { "label": "Morning Launch", "duration": 20, "subtasks": ["Dress", "Pack bag"] }
            },
            "brick_templates": { "school": { "color": "blue" } }
        },
        "days": {
            "A_Day": [
                { "template": "school", "start": "08:00", "duration": 390, "label": "School" },
                { "template": "school", "start": "15:00", "end": "15:45" }
            ]
        }
    }"#;

    fn sample_schedule() -> ScheduleConfig {
        serde_json::from_str(SAMPLE_SCHEDULE).expect("valid schedule")
    }

    #[test]
    fn schedule_document_deserializes_in_entry_order() {
        let schedule = sample_schedule();
        let hard_stop = schedule.hard_stops.school_dropoff.as_ref().expect("hard stop");
        assert_eq!(hard_stop.commute_minutes, 15);
        assert_eq!(hard_stop.time.to_string(), "07:30");

        let entries = &schedule.days["A_Day"];
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].duration, Some(390));
        assert_eq!(entries[1].end.map(|end| end.to_string()).as_deref(), Some("15:45"));
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn missing_sections_default_to_empty() {
        let schedule: ScheduleConfig = serde_json::from_str("{}").expect("empty schedule");
        assert!(schedule.hard_stops.school_dropoff.is_none());
        assert!(schedule.days.is_empty());
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn validate_rejects_entry_without_end_or_duration() {
        let mut schedule = sample_schedule();
        if let Some(entries) = schedule.days.get_mut("A_Day") {
            entries[0].duration = None;
        }
        let error = schedule.validate().expect_err("entry without length");
        assert!(error.contains("days.A_Day[0]"));
    }

    #[test]
    fn validate_rejects_bad_override_date_and_zero_duration_routine() {
        let mut schedule = sample_schedule();
        schedule.overrides.insert("01/16/2026".to_string(), "B".to_string());
        assert!(schedule.validate().is_err());

        let mut schedule = sample_schedule();
        if let Some(routine) = schedule.definitions.routines.get_mut("launch") {
            routine.duration = 0;
        }
        assert!(schedule.validate().is_err());
    }

    #[test]
    fn calendar_validation_checks_date_keys() {
        let mut calendar = CalendarMap::new();
        calendar.insert("2026-01-14".to_string(), "A".to_string());
        assert!(validate_calendar(&calendar).is_ok());
        calendar.insert("tomorrow".to_string(), "B".to_string());
        assert!(validate_calendar(&calendar).is_err());
    }

    #[test]
    fn brick_duration_follows_wall_clock() {
        let brick = ScheduleBrick {
            start: "06:55".parse().expect("start"),
            end: "07:15".parse().expect("end"),
            title: "Morning Launch".to_string(),
            category: BrickCategory::MorningRoutine,
            color: MORNING_ROUTINE_COLOR.to_string(),
            subtasks: Vec::new(),
            maps_link: None,
        };
        assert_eq!(brick.duration_minutes(), 20);
    }
}
