use crate::domain::models::ExternalEvent;
use crate::domain::wall_clock::WallClockTime;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Which fields make two feed events "the same" event.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DedupeKeyPolicy {
    #[default]
    TitleAndStart,
    StartOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FuzzyKey {
    title: Option<String>,
    start: WallClockTime,
}

impl FuzzyKey {
    fn for_event(event: &ExternalEvent, policy: DedupeKeyPolicy) -> Self {
        let title = match policy {
            DedupeKeyPolicy::TitleAndStart => Some(normalize_title(&event.title)),
            DedupeKeyPolicy::StartOnly => None,
        };
        Self {
            title,
            start: event.start,
        }
    }
}

fn normalize_title(title: &str) -> String {
    title
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keeps the first event for every fuzzy key, in first-seen order.
pub fn dedupe(events: Vec<ExternalEvent>, policy: DedupeKeyPolicy) -> Vec<ExternalEvent> {
    let mut seen = HashSet::new();
    events
        .into_iter()
        .filter(|event| seen.insert(FuzzyKey::for_event(event, policy)))
        .collect()
}
