use crate::domain::day_type::{default_translation_table, TranslationTable, DEFAULT_RAW_DAY_TYPE};
use crate::domain::dedupe::DedupeKeyPolicy;
use crate::domain::marker::{MarkerWindow, DEFAULT_ANCHOR_HOUR, DEFAULT_CUTOFF_HOUR};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::feed_parser::{FeedParseOptions, DEFAULT_FALLBACK_DURATION_MINUTES};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const APP_JSON: &str = "app.json";
const SCHEDULE_JSON: &str = "schedule.json";
const CALENDAR_JSON: &str = "calendar.json";
const FEED_ICS: &str = "feed.ics";
const DEFAULT_FEED_TITLE_MARKER: &str = "📅 ";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlannerSettings {
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub sources: SourceSettings,
    #[serde(default)]
    pub day_types: DayTypeSettings,
    #[serde(default)]
    pub feed: FeedSettings,
    #[serde(default)]
    pub display: DisplaySettings,
    #[serde(default)]
    pub sync: SyncSettings,
}

/// Each location is an `http(s)://` URL, a `file://` URL, or a path relative
/// to the config directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SourceSettings {
    pub schedule: String,
    pub calendar: String,
    pub feed: String,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            schedule: SCHEDULE_JSON.to_string(),
            calendar: CALENDAR_JSON.to_string(),
            feed: FEED_ICS.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct DayTypeSettings {
    pub default: String,
    pub translations: TranslationTable,
}

impl Default for DayTypeSettings {
    fn default() -> Self {
        Self {
            default: DEFAULT_RAW_DAY_TYPE.to_string(),
            translations: default_translation_table(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct FeedSettings {
    pub fallback_duration_minutes: u32,
    pub dedupe_key: DedupeKeyPolicy,
    pub title_marker: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            fallback_duration_minutes: DEFAULT_FALLBACK_DURATION_MINUTES,
            dedupe_key: DedupeKeyPolicy::default(),
            title_marker: DEFAULT_FEED_TITLE_MARKER.to_string(),
        }
    }
}

impl FeedSettings {
    pub fn parse_options(&self) -> FeedParseOptions {
        FeedParseOptions {
            fallback_duration_minutes: self.fallback_duration_minutes,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DisplaySettings {
    pub pixels_per_minute: f64,
    pub marker_anchor_hour: u8,
    pub marker_cutoff_hour: u8,
    pub marker_refresh_seconds: u64,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            pixels_per_minute: 1.2,
            marker_anchor_hour: DEFAULT_ANCHOR_HOUR,
            marker_cutoff_hour: DEFAULT_CUTOFF_HOUR,
            marker_refresh_seconds: 60,
        }
    }
}

impl DisplaySettings {
    pub fn marker_window(&self) -> MarkerWindow {
        MarkerWindow {
            anchor_hour: self.marker_anchor_hour,
            cutoff_hour: self.marker_cutoff_hour,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct SyncSettings {
    pub max_attempts: u8,
    pub base_delay_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            timeout_seconds: 15,
        }
    }
}

impl Default for PlannerSettings {
    fn default() -> Self {
        Self {
            timezone: None,
            sources: SourceSettings::default(),
            day_types: DayTypeSettings::default(),
            feed: FeedSettings::default(),
            display: DisplaySettings::default(),
            sync: SyncSettings::default(),
        }
    }
}

impl PlannerSettings {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(timezone) = self.timezone.as_deref() {
            timezone
                .trim()
                .parse::<Tz>()
                .map_err(|_| format!("timezone '{timezone}' is not an IANA name"))?;
        }
        for (field, value) in [
            ("sources.schedule", &self.sources.schedule),
            ("sources.calendar", &self.sources.calendar),
            ("sources.feed", &self.sources.feed),
            ("dayTypes.default", &self.day_types.default),
        ] {
            if value.trim().is_empty() {
                return Err(format!("{field} must not be empty"));
            }
        }
        if self.feed.fallback_duration_minutes == 0 {
            return Err("feed.fallbackDurationMinutes must be > 0".to_string());
        }
        if !(self.display.pixels_per_minute > 0.0) {
            return Err("display.pixelsPerMinute must be > 0".to_string());
        }
        if self.display.marker_refresh_seconds == 0 {
            return Err("display.markerRefreshSeconds must be > 0".to_string());
        }
        self.display.marker_window().validate()?;
        if self.sync.timeout_seconds == 0 {
            return Err("sync.timeoutSeconds must be > 0".to_string());
        }
        Ok(())
    }

    pub fn timezone(&self) -> Option<Tz> {
        self.timezone
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .and_then(|value| value.parse::<Tz>().ok())
    }
}

fn default_files() -> HashMap<&'static str, serde_json::Value> {
    HashMap::from([
        (
            APP_JSON,
            serde_json::json!({
                "schema": 1,
                "appName": "Day Planner",
                "timezone": null,
                "sources": {
                    "schedule": SCHEDULE_JSON,
                    "calendar": CALENDAR_JSON,
                    "feed": FEED_ICS
                },
                "dayTypes": {
                    "default": DEFAULT_RAW_DAY_TYPE,
                    "translations": default_translation_table()
                },
                "feed": {
                    "fallbackDurationMinutes": DEFAULT_FALLBACK_DURATION_MINUTES,
                    "dedupeKey": "title_and_start",
                    "titleMarker": DEFAULT_FEED_TITLE_MARKER
                },
                "display": {
                    "pixelsPerMinute": 1.2,
                    "markerAnchorHour": DEFAULT_ANCHOR_HOUR,
                    "markerCutoffHour": DEFAULT_CUTOFF_HOUR,
                    "markerRefreshSeconds": 60
                },
                "sync": {
                    "maxAttempts": 3,
                    "baseDelayMs": 200,
                    "timeoutSeconds": 15
                }
            }),
        ),
        (
            SCHEDULE_JSON,
            serde_json::json!({
                "overrides": {},
                "hard_stops": {},
                "definitions": {
                    "routines": {},
                    "brick_templates": {},
                    "places": {}
                },
                "days": {}
            }),
        ),
        (CALENDAR_JSON, serde_json::json!({})),
    ])
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    for (name, value) in default_files() {
        let path = config_dir.join(name);
        if !path.exists() {
            let formatted = serde_json::to_string_pretty(&value)?;
            fs::write(path, format!("{formatted}\n"))?;
        }
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

pub fn load_settings(config_dir: &Path) -> Result<PlannerSettings, InfraError> {
    let path = config_dir.join(APP_JSON);
    let value = read_config(&path)?;
    let settings: PlannerSettings = serde_json::from_value(value).map_err(|error| {
        InfraError::InvalidConfig(format!("invalid settings in {}: {error}", path.display()))
    })?;
    settings.validate().map_err(InfraError::InvalidConfig)?;
    Ok(settings)
}
