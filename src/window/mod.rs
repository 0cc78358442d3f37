//! Time-window model and normalization.
//!
//! Raw entries arrive as a sum of bare numbers, bare strings and loosely
//! typed objects. They are coerced once into a uniform [`WindowRecord`],
//! deduplicated, and normalized into [`NormalizedTimeWindow`]s.

mod dedupe;
mod normalize;
mod raw;

pub use dedupe::{dedupe, dedupe_key};
pub use normalize::{normalize_window, NormalizedTimeWindow};
pub use raw::{RawWindowEntry, WindowRecord};

use crate::options::FormatOptions;

/// Builds display windows from an upstream array.
///
/// Duplicates are dropped before normalization; each surviving window is
/// indexed by its position in the deduplicated list. A missing array yields
/// no windows.
///
/// ```
/// use muhurta::{build_time_windows, FormatOptions, RawWindowEntry};
///
/// let raw = vec![RawWindowEntry::slot(1), RawWindowEntry::slot(1), RawWindowEntry::slot(2)];
/// let windows = build_time_windows(Some(&raw), &FormatOptions::default());
/// assert_eq!(windows.len(), 2);
/// assert_eq!(windows[1].time_range(), "1:30 AM – 3:00 AM");
/// ```
pub fn build_time_windows(
    raw: Option<&[RawWindowEntry]>,
    options: &FormatOptions,
) -> Vec<NormalizedTimeWindow> {
    let Some(raw) = raw else {
        return Vec::new();
    };

    dedupe(raw)
        .into_iter()
        .enumerate()
        .map(|(index, entry)| normalize_window(entry, index, options))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::severity::Severity;
    use serde_json::json;

    #[test]
    fn test_missing_array() {
        assert!(build_time_windows(None, &FormatOptions::default()).is_empty());
        assert!(build_time_windows(Some(&[]), &FormatOptions::default()).is_empty());
    }

    #[test]
    fn test_indices_follow_deduplicated_order() {
        let raw: Vec<RawWindowEntry> = serde_json::from_value(json!([
            {"name": "Amrit", "start": 1, "end": 2, "score": 9},
            {"name": "Amrit", "start": 1, "end": 2, "score": 9},
            {"start": 5},
            null
        ]))
        .unwrap();

        let windows = build_time_windows(Some(&raw), &FormatOptions::default());
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[0].name, "Amrit");
        assert_eq!(windows[0].severity, Severity::Auspicious);
        assert_eq!(windows[1].name, "Window 2");
        assert_eq!(windows[1].index, 1);
        assert_eq!(windows[1].start_display, "6:00 AM");
        assert_eq!(windows[2].name, "Window 3");
        assert_eq!(windows[2].start_display, "--:--");
    }

    #[test]
    fn test_every_window_has_display_and_severity() {
        let raw: Vec<RawWindowEntry> = serde_json::from_value(json!([
            0, -4, 99, "", "garbage", {"start": {"nested": true}}, {"score": "NaN"}, [], false
        ]))
        .unwrap();

        let options = FormatOptions::default();
        for (index, entry) in raw.iter().enumerate() {
            let window = normalize_window(entry, index, &options);
            assert!(!window.start_display.is_empty());
            assert!(!window.end_display.is_empty());
            assert!(!window.name.is_empty());
            assert!(matches!(
                window.severity,
                Severity::Auspicious | Severity::Inauspicious | Severity::Neutral
            ));
            if let Some(score) = window.score {
                assert!((0.0..=10.0).contains(&score));
            }
        }

        assert!(build_time_windows(Some(&raw), &options).len() < raw.len());
    }
}
