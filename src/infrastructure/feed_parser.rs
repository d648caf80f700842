use crate::domain::models::ExternalEvent;
use crate::domain::wall_clock::WallClockTime;
use crate::infrastructure::error::{InfraError, SourceKind};
use chrono::NaiveDate;
use ical::property::Property;
use ical::PropertyParser;

const CALENDAR_MARKER: &str = "BEGIN:VCALENDAR";
const EVENT_MARKER: &str = "BEGIN:VEVENT";
const PROP_SUMMARY: &str = "SUMMARY";
const PROP_START: &str = "DTSTART";
const PROP_END: &str = "DTEND";

pub const DEFAULT_FALLBACK_DURATION_MINUTES: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedParseOptions {
    /// Length given to events that have no end time.
    pub fallback_duration_minutes: u32,
}

impl Default for FeedParseOptions {
    fn default() -> Self {
        Self {
            fallback_duration_minutes: DEFAULT_FALLBACK_DURATION_MINUTES,
        }
    }
}

fn is_date_only(property: &Property) -> bool {
    property.params.iter().flatten().any(|(name, values)| {
        name.eq_ignore_ascii_case("VALUE")
            && values.iter().any(|value| value.eq_ignore_ascii_case("DATE"))
    })
}

fn property_value(property: &Property) -> &str {
    property.value.as_deref().map(str::trim).unwrap_or_default()
}

/// Timed events on `target_date`, in feed order.
///
/// Blocks without a title or a start time (all-day events included) are
/// skipped. Text that does not look like a calendar feed at all is
/// `MalformedSource`.
pub fn parse_events_for_date(
    feed_text: &str,
    target_date: NaiveDate,
    options: FeedParseOptions,
) -> Result<Vec<ExternalEvent>, InfraError> {
    let mut blocks = feed_text.split(EVENT_MARKER);
    let preamble = blocks.next().unwrap_or_default();
    let blocks = blocks.collect::<Vec<_>>();

    if blocks.is_empty() && !preamble.contains(CALENDAR_MARKER) {
        return Err(InfraError::MalformedSource {
            kind: SourceKind::Feed,
            message: "no calendar or event blocks found".to_string(),
        });
    }

    let compact_date = target_date.format("%Y%m%d").to_string();
    Ok(blocks
        .into_iter()
        .filter_map(|block| parse_block(block, &compact_date, options))
        .collect())
}

fn parse_block(block: &str, compact_date: &str, options: FeedParseOptions) -> Option<ExternalEvent> {
    let properties = block_properties(block);
    let start_property = find_property(&properties, PROP_START)?;
    let start_value = property_value(start_property);
    if !start_value.starts_with(compact_date) || is_date_only(start_property) {
        return None;
    }

    let title = find_property(&properties, PROP_SUMMARY)
        .map(|property| unescape_text(property_value(property)))
        .map(|title| title.trim().to_string())
        .filter(|title| !title.is_empty())?;
    let start = parse_time_of_day(start_value)?;

    let end = find_property(&properties, PROP_END)
        .filter(|property| !is_date_only(property))
        .and_then(|property| parse_time_of_day(property_value(property)))
        .unwrap_or_else(|| {
            start.saturating_add_minutes(i64::from(options.fallback_duration_minutes))
        });

    Some(ExternalEvent { title, start, end })
}

/// Unfolded content lines of one event block. Lines the lexer rejects are
/// skipped.
fn block_properties(block: &str) -> Vec<Property> {
    let block = block.trim_start_matches(['\r', '\n']);
    PropertyParser::from_reader(block.as_bytes())
        .filter_map(Result::ok)
        .collect()
}

fn find_property<'a>(properties: &'a [Property], name: &str) -> Option<&'a Property> {
    properties
        .iter()
        .find(|property| property.name.trim().eq_ignore_ascii_case(name))
}

/// `20260114T160000` or `20260114T160000Z` yield 16:00; date-only values
/// yield nothing.
fn parse_time_of_day(value: &str) -> Option<WallClockTime> {
    let (_, time) = value.rsplit_once(['T', 't'])?;
    let digits = time.get(0..4)?;
    if !digits.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    let hour = digits[0..2].parse::<u8>().ok()?;
    let minute = digits[2..4].parse::<u8>().ok()?;
    WallClockTime::new(hour, minute).ok()
}

fn unescape_text(value: &str) -> String {
    let mut output = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(current) = chars.next() {
        if current != '\\' {
            output.push(current);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => output.push(' '),
            Some(other) => output.push(other),
            None => output.push('\\'),
        }
    }
    output
}
