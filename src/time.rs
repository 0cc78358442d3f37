//! Time value parsing and formatting.
//!
//! Upstream windows describe their bounds in several shapes: 1-based slot
//! indices (as numbers or numeric strings), `HH:MM[:SS]`, 12-hour `H:MM AM/PM`,
//! and ISO datetimes. Everything here resolves those to a wall-clock
//! [`ClockTime`] and renders it for display. Unparseable values yield `None`.

use crate::error::{Error, Result};
use crate::options::FormatOptions;
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Timelike};
use chrono_tz::Tz;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

/// Placeholder shown when a time cannot be resolved.
pub const PLACEHOLDER_TIME: &str = "--:--";

/// Separator between the two ends of a rendered range.
pub const RANGE_SEPARATOR: &str = " – ";

static RE_CLOCK_12H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(\d{1,2}):(\d{2})\s*([AP])\.?M\.?$").unwrap());

static RE_CLOCK_24H: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,2}):(\d{2})(?::(\d{2}))?$").unwrap());

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// A time-like value as supplied by upstream records.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeValue {
    Number(f64),
    Text(String),
}

impl TimeValue {
    /// Reads a number or string from a JSON value. Anything else is absent.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(TimeValue::Number),
            Value::String(s) if !s.trim().is_empty() => Some(TimeValue::Text(s.clone())),
            _ => None,
        }
    }

    /// Returns the value as a slot index if it is integer-valued.
    pub fn as_slot(&self) -> Option<i64> {
        match self {
            TimeValue::Number(n) if n.is_finite() && n.fract() == 0.0 => Some(*n as i64),
            TimeValue::Number(_) => None,
            TimeValue::Text(s) => s.trim().parse::<i64>().ok(),
        }
    }

    /// Returns the string form when the value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TimeValue::Text(s) => Some(s.as_str()),
            TimeValue::Number(_) => None,
        }
    }

    /// Renders the raw value as it appeared upstream, for identity keys.
    pub fn raw_string(&self) -> String {
        match self {
            TimeValue::Number(n) if n.fract() == 0.0 && n.is_finite() => format!("{}", *n as i64),
            TimeValue::Number(n) => n.to_string(),
            TimeValue::Text(s) => s.clone(),
        }
    }
}

impl From<&str> for TimeValue {
    fn from(s: &str) -> Self {
        TimeValue::Text(s.to_string())
    }
}

/// Hour and minute of a day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTime {
    pub hour: u32,
    pub minute: u32,
}

impl ClockTime {
    /// Creates a clock time, rejecting out-of-range fields.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    fn from_minutes(total: i64) -> Self {
        let total = total.rem_euclid(1440);
        Self {
            hour: (total / 60) as u32 % 24,
            minute: (total % 60) as u32,
        }
    }

    /// Formats as `h:mm AM/PM` or `HH:mm`.
    pub fn format(&self, use_ampm: bool) -> String {
        format_clock(self.hour, self.minute, use_ampm)
    }
}

/// Formats hours and minutes for display.
pub fn format_clock(hour: u32, minute: u32, use_ampm: bool) -> String {
    let hour = hour % 24;
    if use_ampm {
        let h12 = if hour % 12 == 0 { 12 } else { hour % 12 };
        let suffix = if hour < 12 { "AM" } else { "PM" };
        format!("{}:{:02} {}", h12, minute, suffix)
    } else {
        format!("{:02}:{:02}", hour, minute)
    }
}

/// Joins two displayed times into a range.
pub fn format_time_range(start: &str, end: &str) -> String {
    format!("{}{}{}", start, RANGE_SEPARATOR, end)
}

/// Computes the start and end of a 1-based slot.
pub fn slot_bounds(slot: i64, slot_minutes: u32) -> Result<(ClockTime, ClockTime)> {
    let max = if slot_minutes == 0 {
        0
    } else {
        1440 / i64::from(slot_minutes)
    };
    if slot < 1 || slot > max {
        return Err(Error::SlotOutOfRange { slot, max });
    }
    let start = (slot - 1) * i64::from(slot_minutes);
    let end = slot * i64::from(slot_minutes);
    Ok((ClockTime::from_minutes(start), ClockTime::from_minutes(end)))
}

/// Renders the 12-hour range covered by a slot, or `None` for an invalid slot.
///
/// ```
/// use muhurta::time::slot_to_range;
///
/// assert_eq!(slot_to_range(1, 90).as_deref(), Some("12:00 AM – 1:30 AM"));
/// assert_eq!(slot_to_range(17, 90), None);
/// ```
pub fn slot_to_range(slot: i64, slot_minutes: u32) -> Option<String> {
    let (start, end) = slot_bounds(slot, slot_minutes).ok()?;
    Some(format_time_range(&start.format(true), &end.format(true)))
}

/// Parses `H:MM AM/PM` or `HH:MM[:SS]` into a clock time.
pub fn parse_clock(text: &str) -> Option<ClockTime> {
    let text = text.trim();

    if let Some(caps) = RE_CLOCK_12H.captures(text) {
        let mut hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        let pm = caps[3].eq_ignore_ascii_case("p");
        if hour == 12 && !pm {
            hour = 0;
        } else if pm && hour < 12 {
            hour += 12;
        }
        return ClockTime::new(hour, minute);
    }

    if let Some(caps) = RE_CLOCK_24H.captures(text) {
        let mut hour: u32 = caps[1].parse().ok()?;
        let minute: u32 = caps[2].parse().ok()?;
        if hour == 24 {
            hour = 0;
        }
        return ClockTime::new(hour, minute);
    }

    None
}

/// Parses an ISO datetime (or bare date) into a wall-clock datetime.
///
/// Offset-carrying values are shifted into `tz` when given and otherwise
/// keep their own offset. Naive values are taken as already local.
pub fn parse_iso_datetime(text: &str, tz: Option<Tz>) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.len() < 10 {
        return None;
    }

    let with_offset = DateTime::parse_from_rfc3339(text)
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f%z"))
        .or_else(|_| DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M%z"));
    if let Ok(dt) = with_offset {
        return Some(match tz {
            Some(tz) => dt.with_timezone(&tz).naive_local(),
            None => dt.naive_local(),
        });
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Formats the time-of-day portion of an ISO datetime.
pub fn format_iso_time(text: &str, options: &FormatOptions) -> Option<String> {
    let dt = parse_iso_datetime(text, options.time_zone_lenient())?;
    Some(format_clock(dt.hour(), dt.minute(), options.use_ampm))
}

/// Formats the calendar date of an ISO datetime as `Mon D, YYYY`.
pub fn format_card_date(text: &str, options: &FormatOptions) -> Option<String> {
    let dt = parse_iso_datetime(text, options.time_zone_lenient())?;
    Some(dt.format("%b %-d, %Y").to_string())
}

/// Combines a `YYYY-MM-DD` date with a displayed time into an ISO value.
///
/// With a time zone the result carries that zone's offset; without one it
/// is a naive local datetime.
pub fn synthesize_iso(date: &str, display_time: &str, options: &FormatOptions) -> Option<String> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").ok()?;
    let clock = parse_clock(display_time)?;
    let naive = date.and_hms_opt(clock.hour, clock.minute, 0)?;

    match options.time_zone_lenient() {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.to_rfc3339()),
        None => Some(naive.format("%Y-%m-%dT%H:%M:%S").to_string()),
    }
}

/// Resolves a time value to a display string.
pub fn try_parse_time_value(value: &TimeValue, options: &FormatOptions) -> Result<String> {
    if let Some(slot) = value.as_slot() {
        let (start, _) = slot_bounds(slot, options.slot_minutes)?;
        return Ok(start.format(options.use_ampm));
    }

    let text = value
        .as_text()
        .ok_or_else(|| Error::InvalidTime(value.raw_string()))?;

    if let Some(clock) = parse_clock(text) {
        return Ok(clock.format(options.use_ampm));
    }

    format_iso_time(text, options).ok_or_else(|| Error::InvalidTime(text.to_string()))
}

/// Resolves a time value to a display string, or `None` if it cannot be read.
pub fn parse_time_value(value: &TimeValue, options: &FormatOptions) -> Option<String> {
    match try_parse_time_value(value, options) {
        Ok(display) => Some(display),
        Err(e) => {
            tracing::trace!(error = %e, "unparseable time value");
            None
        }
    }
}
