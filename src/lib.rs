//! # muhurta
//!
//! Normalization of astrology time-window data and cleanup of the narrative
//! summaries that reference it.
//!
//! Upstream services hand over two loosely shaped inputs: an array of time
//! windows (bare slot numbers, time strings, or objects with any mix of
//! legacy keys) and a free-text summary that may carry leaked debug JSON and
//! references such as `time_windows[2]` or "Windows 3, 4, and 5". This crate
//! turns both into display-ready values without ever failing: anything that
//! cannot be interpreted degrades to a placeholder or is left untouched.
//!
//! ## Quick Start
//!
//! ```
//! use muhurta::{build_time_windows, FormatOptions, RawWindowEntry, SummaryCleaner};
//!
//! let raw: Vec<RawWindowEntry> = serde_json::from_str(
//!     r#"[{"name": "Amrit", "start": 5, "score": 9}, 6, "18:30"]"#,
//! )?;
//!
//! let windows = build_time_windows(Some(&raw), &FormatOptions::default());
//! assert_eq!(windows[0].time_range(), "6:00 AM – 7:30 AM");
//! assert_eq!(windows[2].start_display, "6:30 PM");
//!
//! let cleaner = SummaryCleaner::new();
//! let summary = cleaner.clean(Some("Begin in window 1. {\"debug\": true}"), Some(&raw));
//! assert_eq!(summary, "Begin in 6:00 AM – 7:30 AM.");
//! # Ok::<(), serde_json::Error>(())
//! ```
//!
//! ## Modules
//!
//! - [`time`]: slot, clock and ISO time parsing and formatting
//! - [`severity`]: score clamping and severity classification
//! - [`json_extract`]: balanced JSON blob extraction from free text
//! - [`debug_strip`]: multi-pass removal of leaked backend artifacts
//! - [`window`]: raw entries, deduplication and normalization
//! - [`tokens`]: window reference expansion
//! - [`summary`]: the staged summary cleaning pipeline

pub mod debug_strip;
pub mod error;
pub mod json_extract;
pub mod options;
pub mod severity;
pub mod summary;
pub mod time;
pub mod tokens;
pub mod window;

// Re-exports
pub use debug_strip::strip_debug_blocks;
pub use error::{Error, Result};
pub use options::FormatOptions;
pub use severity::{ScoreVariant, Severity};
pub use summary::{clean_summary, SummaryCleaner, SummaryOptions};
pub use tokens::{expand_time_window_tokens, ExpansionState};
pub use window::{build_time_windows, dedupe, normalize_window, NormalizedTimeWindow, RawWindowEntry};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> Vec<RawWindowEntry> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_normalize_score_properties() {
        use crate::severity::normalize_score;

        assert_eq!(normalize_score(&json!(-5)), Some(0.0));
        assert_eq!(normalize_score(&json!(15)), Some(10.0));
        assert_eq!(normalize_score(&json!("7.5")), Some(7.5));
    }

    #[test]
    fn test_severity_always_classified() {
        let entries = raw(json!([{}, null, 3, "x", {"severity": 42}, {"category": ""}]));
        for (index, entry) in entries.iter().enumerate() {
            let window = normalize_window(entry, index, &FormatOptions::default());
            assert!(
                matches!(
                    window.severity,
                    Severity::Auspicious | Severity::Inauspicious | Severity::Neutral
                ),
                "unexpected severity for {:?}",
                entry
            );
        }
        let empty = normalize_window(&entries[0], 0, &FormatOptions::default());
        assert_eq!(empty.severity, Severity::Neutral);
    }

    #[test]
    fn test_slot_range_sentinels() {
        use crate::time::slot_to_range;

        assert_eq!(slot_to_range(1, 90).as_deref(), Some("12:00 AM – 1:30 AM"));
        assert_eq!(slot_to_range(0, 90), None);
        assert_eq!(slot_to_range(17, 90), None);
    }

    #[test]
    fn test_dedupe_keeps_first_in_order() {
        let entries = raw(json!([
            {"name": "A", "start": 1, "end": 2},
            {"name": "A", "start": 1, "end": 2},
            {"name": "B", "start": 1, "end": 2}
        ]));
        let unique = dedupe(&entries);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0], &entries[0]);
        assert_eq!(unique[1], &entries[2]);
    }

    #[test]
    fn test_strip_debug_blocks_idempotent() {
        let inputs = [
            r#"Calm morning. __windows_json__: [{"name": "Amrit", "start": 3}] Busy evening."#,
            "Text\n```json\n{\"debug\": true}\n```\nafter",
            r#"Focus "score": 8, "status": "Ruling", later }}} done"#,
        ];
        for input in inputs {
            let once = strip_debug_blocks(input);
            assert_eq!(strip_debug_blocks(&once), once, "not idempotent for {:?}", input);
        }
    }

    #[test]
    fn test_out_of_range_token_falls_back() {
        let windows: Vec<RawWindowEntry> = (1..=3).map(RawWindowEntry::slot).collect();
        let out = expand_time_window_tokens(
            "See time_windows[5]",
            Some(&windows),
            &FormatOptions::default(),
            &ExpansionState::new(),
        );
        assert_eq!(out, format!("See {}", tokens::FALLBACK_FRAGMENT));
    }

    #[test]
    fn test_contiguous_windows_combine() {
        let windows: Vec<RawWindowEntry> = (1..=5).map(RawWindowEntry::slot).collect();
        let out = expand_time_window_tokens(
            "Windows 3, 4, and 5",
            Some(&windows),
            &FormatOptions::default(),
            &ExpansionState::new(),
        );
        assert_eq!(out, "3:00 AM – 7:30 AM");
    }

    #[test]
    fn test_synthesized_iso_round_trip() {
        let options = FormatOptions::default().with_date("2024-03-15");
        for display in ["12:00 AM", "6:45 AM", "12:30 PM", "11:59 PM"] {
            let iso = time::synthesize_iso("2024-03-15", display, &options).unwrap();
            assert_eq!(time::format_iso_time(&iso, &options).as_deref(), Some(display));
        }
    }

    #[test]
    fn test_window_and_summary_agree() {
        let entries = raw(json!([
            {"name": "Labh", "start": "2024-03-15T09:00:00", "end": "2024-03-15T10:30:00", "score": 8},
            {"name": "Rahu Kalam", "start": 11, "category": "inauspicious"}
        ]));
        let cleaner = SummaryCleaner::new();
        let windows = cleaner.build_windows(Some(&entries));

        assert_eq!(windows[0].time_range(), "9:00 AM – 10:30 AM");
        assert_eq!(windows[0].card_date.as_deref(), Some("Mar 15, 2024"));
        assert_eq!(windows[1].severity, Severity::Inauspicious);
        assert_eq!(windows[1].score_variant, ScoreVariant::Neutral);

        let summary = cleaner.clean(Some("Avoid window 2; prefer window 1."), Some(&entries));
        assert_eq!(summary, "Avoid 3:00 PM – 4:30 PM; prefer 9:00 AM – 10:30 AM.");
    }

    #[test]
    fn test_nothing_panics_on_garbage() {
        let entries = raw(json!([
            {"start": "{{{{", "end": [], "note": "}}}}]]]]", "score": {"x": 1}},
            "time_windows[0]",
            -1e300
        ]));
        let cleaner = SummaryCleaner::new();
        let windows = cleaner.build_windows(Some(&entries));
        assert_eq!(windows.len(), 3);

        let text = "{\"a\": [1, {\"b\": 2}]} time_windows[7] Windows 9, 10 __windows_json__: {";
        let out = cleaner.clean(Some(text), Some(&entries));
        assert!(out.contains(tokens::FALLBACK_FRAGMENT));
        assert!(!out.contains("__windows_json__"));
    }
}
