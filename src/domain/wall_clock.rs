use chrono::{NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Minute-resolution time of day without date or timezone.
///
/// Arithmetic never leaves the day: a result before 00:00 or after 23:59 is
/// rejected instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WallClockTime {
    minute_of_day: u16,
}

impl WallClockTime {
    pub const START_OF_DAY: WallClockTime = WallClockTime { minute_of_day: 0 };
    pub const END_OF_DAY: WallClockTime = WallClockTime {
        minute_of_day: (MINUTES_PER_DAY - 1) as u16,
    };

    pub fn new(hour: u8, minute: u8) -> Result<Self, String> {
        if hour > 23 || minute > 59 {
            return Err(format!("{hour:02}:{minute:02} is not a valid time of day"));
        }
        Ok(Self {
            minute_of_day: u16::from(hour) * 60 + u16::from(minute),
        })
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            minute_of_day: (time.hour() * 60 + time.minute()) as u16,
        }
    }

    pub fn hour(self) -> u8 {
        (self.minute_of_day / 60) as u8
    }

    pub fn minute(self) -> u8 {
        (self.minute_of_day % 60) as u8
    }

    pub fn minute_of_day(self) -> u16 {
        self.minute_of_day
    }

    pub fn add_minutes(self, minutes: i64) -> Result<Self, String> {
        let total = i64::from(self.minute_of_day) + minutes;
        if !(0..MINUTES_PER_DAY).contains(&total) {
            return Err(format!(
                "{self} {} {} minutes leaves the day",
                if minutes < 0 { "minus" } else { "plus" },
                minutes.unsigned_abs()
            ));
        }
        Ok(Self {
            minute_of_day: total as u16,
        })
    }

    pub fn subtract_minutes(self, minutes: i64) -> Result<Self, String> {
        let negated = minutes
            .checked_neg()
            .ok_or_else(|| format!("cannot subtract {minutes} minutes"))?;
        self.add_minutes(negated)
    }

    /// Like `add_minutes`, but pins the result to 00:00 or 23:59.
    pub fn saturating_add_minutes(self, minutes: i64) -> Self {
        let total = (i64::from(self.minute_of_day) + minutes).clamp(0, MINUTES_PER_DAY - 1);
        Self {
            minute_of_day: total as u16,
        }
    }

    /// 12-hour clock label such as `6:55AM` or `12:05PM`.
    pub fn to_12_hour(self) -> String {
        let hour = self.hour();
        let suffix = if hour >= 12 { "PM" } else { "AM" };
        let display_hour = match hour % 12 {
            0 => 12,
            other => other,
        };
        format!("{display_hour}:{:02}{suffix}", self.minute())
    }
}

/// Signed length of `[start, end]`; negative when `end` precedes `start`.
pub fn duration_minutes(start: WallClockTime, end: WallClockTime) -> i32 {
    i32::from(end.minute_of_day) - i32::from(start.minute_of_day)
}

impl fmt::Display for WallClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}

impl FromStr for WallClockTime {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || format!("'{value}' must be HH:MM");
        let (hour_str, minute_str) = value.trim().split_once(':').ok_or_else(invalid)?;
        if minute_str.len() != 2 || minute_str.contains(':') {
            return Err(invalid());
        }
        let hour = hour_str.parse::<u8>().map_err(|_| invalid())?;
        let minute = minute_str.parse::<u8>().map_err(|_| invalid())?;
        Self::new(hour, minute).map_err(|_| invalid())
    }
}

impl Serialize for WallClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for WallClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
