//! Formatting options shared by the window normalizer and summary pipeline.

use crate::error::{Error, Result};
use chrono_tz::Tz;

/// Default slot length in minutes (16 slots per day).
pub const DEFAULT_SLOT_MINUTES: u32 = 90;

/// Options controlling how time values are rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOptions {
    /// Render times as `h:mm AM/PM` instead of `HH:mm`.
    pub use_ampm: bool,

    /// Length of one numbered slot, in minutes.
    pub slot_minutes: u32,

    /// Calendar date (`YYYY-MM-DD`) used to synthesize ISO values
    /// for windows that only carry a display time.
    pub date: Option<String>,

    /// IANA time zone name (e.g. `Asia/Kolkata`) used when formatting
    /// ISO datetimes. When absent, the datetime's own offset is kept.
    pub tz: Option<String>,
}

impl Default for FormatOptions {
    fn default() -> Self {
        Self {
            use_ampm: true,
            slot_minutes: DEFAULT_SLOT_MINUTES,
            date: None,
            tz: None,
        }
    }
}

impl FormatOptions {
    /// Creates new options with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Renders times in 24-hour `HH:mm` form.
    pub fn twenty_four_hour(mut self) -> Self {
        self.use_ampm = false;
        self
    }

    /// Sets the slot length in minutes.
    pub fn with_slot_minutes(mut self, minutes: u32) -> Self {
        self.slot_minutes = minutes;
        self
    }

    /// Sets the calendar date used for ISO synthesis.
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Sets the display time zone.
    pub fn with_tz(mut self, tz: impl Into<String>) -> Self {
        self.tz = Some(tz.into());
        self
    }

    /// Number of whole slots that fit in one day.
    pub fn slots_per_day(&self) -> i64 {
        if self.slot_minutes == 0 {
            0
        } else {
            1440 / i64::from(self.slot_minutes)
        }
    }

    /// Resolves the configured time zone.
    ///
    /// Blank names are treated as absent.
    pub fn time_zone(&self) -> Result<Option<Tz>> {
        match self.tz.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(name) => name
                .parse::<Tz>()
                .map(Some)
                .map_err(|_| Error::UnknownTimeZone(name.to_string())),
        }
    }

    /// Resolves the time zone, logging and ignoring unknown names.
    pub(crate) fn time_zone_lenient(&self) -> Option<Tz> {
        match self.time_zone() {
            Ok(tz) => tz,
            Err(e) => {
                tracing::debug!(error = %e, "ignoring time zone");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = FormatOptions::default();
        assert!(options.use_ampm);
        assert_eq!(options.slot_minutes, 90);
        assert_eq!(options.slots_per_day(), 16);
        assert!(options.date.is_none());
        assert!(options.tz.is_none());
    }

    #[test]
    fn test_builder_chain() {
        let options = FormatOptions::new()
            .twenty_four_hour()
            .with_slot_minutes(60)
            .with_date("2024-03-15")
            .with_tz("Asia/Kolkata");

        assert!(!options.use_ampm);
        assert_eq!(options.slots_per_day(), 24);
        assert_eq!(options.date.as_deref(), Some("2024-03-15"));
        assert_eq!(options.time_zone().unwrap(), Some(chrono_tz::Asia::Kolkata));
    }

    #[test]
    fn test_zero_slot_minutes() {
        let options = FormatOptions::default().with_slot_minutes(0);
        assert_eq!(options.slots_per_day(), 0);
    }

    #[test]
    fn test_unknown_time_zone() {
        let options = FormatOptions::default().with_tz("Mars/Olympus");
        assert!(matches!(options.time_zone(), Err(Error::UnknownTimeZone(_))));
        assert!(options.time_zone_lenient().is_none());

        let blank = FormatOptions::default().with_tz("  ");
        assert_eq!(blank.time_zone().unwrap(), None);
    }
}
