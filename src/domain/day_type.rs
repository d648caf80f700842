use crate::domain::models::{date_key, CalendarMap, DayTypeKey};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

pub const DEFAULT_RAW_DAY_TYPE: &str = "A";

/// Raw calendar code to schedule key, e.g. `"PD"` to `"PD_Day"`.
pub type TranslationTable = BTreeMap<String, String>;

pub fn default_translation_table() -> TranslationTable {
    TranslationTable::from([
        ("A".to_string(), "A_Day".to_string()),
        ("B".to_string(), "B_Day".to_string()),
        ("PD".to_string(), "PD_Day".to_string()),
        ("Work".to_string(), "PD_Day".to_string()),
    ])
}

/// Precedence: override, then calendar, then `default_raw`. The raw code is
/// translated when the table knows it and passed through otherwise.
pub fn resolve_day_type(
    date: NaiveDate,
    overrides: &HashMap<String, String>,
    calendar_day_types: &CalendarMap,
    translation_table: &TranslationTable,
    default_raw: &str,
) -> DayTypeKey {
    let key = date_key(date);
    let raw = non_blank_entry(overrides, &key)
        .or_else(|| non_blank_entry(calendar_day_types, &key))
        .unwrap_or(default_raw);

    let translated = translation_table
        .get(raw)
        .map(String::as_str)
        .unwrap_or(raw);
    DayTypeKey::new(translated)
}

fn non_blank_entry<'a>(source: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    source
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}
