//! # Summary Cleaning Pipeline
//!
//! Turns a backend narrative into display-ready text.
//!
//! ## Pipeline Stages
//!
//! 1. **String Normalization** - Unicode NFC, control and zero-width character removal
//! 2. **Debug Stripping** - Leaked JSON, markers, fenced blocks
//! 3. **Token Expansion** - `time_windows[n]` tokens and "Windows 3, 4" references
//! 4. **Humanizing** - ISO datetimes to short times, `X to Y` ranges, `[based on ...]` hints
//! 5. **Repetition Collapse** - Duplicate lines, repeated boilerplate sentences
//! 6. **Section Stripping** - Sources blocks and backend-only sections
//! 7. **Final Normalization** - Blank lines, horizontal whitespace, last debug pass
//!
//! Every stage is a total function of its input, so a stage can never abort
//! the pipeline.

use crate::debug_strip::strip_debug_blocks;
use crate::options::FormatOptions;
use crate::time::format_iso_time;
use crate::tokens::{expand_time_window_tokens, has_window_references, ExpansionState};
use crate::window::{build_time_windows, NormalizedTimeWindow, RawWindowEntry};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use unicode_normalization::UnicodeNormalization;

/// Summary cleaning configuration options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryOptions {
    /// Enable Stage 1: String normalization
    pub normalize_strings: bool,
    /// Enable Stage 2 and the final pass of Stage 7: Debug stripping
    pub strip_debug: bool,
    /// Enable Stage 3: Token expansion
    pub expand_tokens: bool,
    /// Enable Stage 4: Humanizing times and hints
    pub humanize_times: bool,
    /// Enable Stage 5: Repetition collapse
    pub collapse_repetition: bool,
    /// Enable Stage 6: Sources and backend section stripping
    pub strip_backend_sections: bool,
    /// Enable Stage 7: Final normalization
    pub final_normalize: bool,
}

impl Default for SummaryOptions {
    fn default() -> Self {
        Self {
            normalize_strings: true,
            strip_debug: true,
            expand_tokens: true,
            humanize_times: true,
            collapse_repetition: true,
            strip_backend_sections: true,
            final_normalize: true,
        }
    }
}

impl SummaryOptions {
    /// Creates options for minimal cleaning (normalization, debug stripping, whitespace)
    pub fn minimal() -> Self {
        Self {
            normalize_strings: true,
            strip_debug: true,
            expand_tokens: false,
            humanize_times: false,
            collapse_repetition: false,
            strip_backend_sections: false,
            final_normalize: true,
        }
    }
}

// ============================================================================
// Stage 1: String Normalization
// ============================================================================

/// Stage 1: Normalize raw string
///
/// - Unicode NFC normalization
/// - Control and zero-width character removal
/// - Ideographic space to ASCII space
pub fn stage1_normalize_string(input: &str) -> String {
    let mut result = String::with_capacity(input.len());

    for c in input.nfc() {
        if is_control_char(c) || is_zero_width_char(c) {
            continue;
        }
        if c == '\u{3000}' {
            result.push(' ');
            continue;
        }
        result.push(c);
    }

    result
}

fn is_control_char(c: char) -> bool {
    matches!(
        c,
        '\0'        // Null
        | '\r'      // Carriage return (CRLF -> LF)
        | '\x0B'    // Vertical Tab
        | '\x0C'    // Form Feed
        | '\u{FEFF}' // BOM
        | '\u{FFFD}' // Replacement character
        | '\u{00AD}' // Soft hyphen
    )
}

fn is_zero_width_char(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}')
}

// ============================================================================
// Stage 2: Debug Stripping
// ============================================================================

/// Stage 2: Remove leaked backend artifacts
pub fn stage2_strip_debug(input: &str) -> String {
    strip_debug_blocks(input)
}

// ============================================================================
// Stage 3: Token Expansion
// ============================================================================

/// Stage 3: Expand window references, when the text has any
pub fn stage3_expand_tokens(
    input: &str,
    windows: Option<&[RawWindowEntry]>,
    format: &FormatOptions,
    state: &ExpansionState,
) -> String {
    if !has_window_references(input) {
        return input.to_string();
    }
    expand_time_window_tokens(input, windows, format, state)
}

// ============================================================================
// Stage 4: Humanizing
// ============================================================================

static RE_ISO_DATETIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?")
        .unwrap()
});

static RE_TIME_TO_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2}:\d{2}(?:\s*[AP]\.?M\.?)?)\s+to\s+(\d{1,2}:\d{2}(?:\s*[AP]\.?M\.?)?)")
        .unwrap()
});

static RE_BASED_ON: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\[based on ([A-Za-z0-9_.\-]+)\]").unwrap());

/// Stage 4: Humanize machine-formatted values
///
/// - Bare ISO datetimes become short local times
/// - `10:00 AM to 11:30 AM` becomes `10:00 AM – 11:30 AM`
/// - `[based on a.b.c]` becomes `*(based on c)*`
pub fn stage4_humanize(input: &str, format: &FormatOptions) -> String {
    let text = RE_ISO_DATETIME.replace_all(input, |caps: &Captures| {
        format_iso_time(&caps[0], format).unwrap_or_else(|| caps[0].to_string())
    });
    let text = RE_TIME_TO_TIME.replace_all(&text, "${1} – ${2}");
    RE_BASED_ON
        .replace_all(&text, |caps: &Captures| {
            match caps[1].rsplit('.').find(|segment| !segment.is_empty()) {
                Some(segment) => format!("*(based on {})*", segment.replace('_', " ").trim()),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

// ============================================================================
// Stage 5: Repetition Collapse
// ============================================================================

/// Sentences the backend appends to many paragraphs.
const BOILERPLATE_SENTENCES: &[&str] = &[
    "Timings are approximate and depend on your location.",
    "Please consult a qualified astrologer for personal guidance.",
    "This reading is for informational purposes only.",
    "Always use your own judgment.",
];

/// Occurrences of a boilerplate sentence kept before the rest are dropped.
const MAX_BOILERPLATE_REPEATS: usize = 2;

static RE_BOILERPLATE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    BOILERPLATE_SENTENCES
        .iter()
        .map(|sentence| {
            let words: Vec<String> = sentence.split_whitespace().map(regex::escape).collect();
            Regex::new(&format!(r"(?i){}", words.join(r"\s+"))).unwrap()
        })
        .collect()
});

/// Drops lines identical (ignoring surrounding whitespace) to the line above.
///
/// Blank lines are always kept and reset the comparison.
pub fn collapse_duplicate_lines(input: &str) -> String {
    let mut lines: Vec<&str> = Vec::new();
    let mut previous: Option<&str> = None;

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            lines.push(line);
            previous = None;
            continue;
        }
        if previous == Some(trimmed) {
            continue;
        }
        previous = Some(trimmed);
        lines.push(line);
    }

    lines.join("\n")
}

/// Keeps at most two occurrences of each boilerplate sentence.
pub fn collapse_boilerplate(input: &str) -> String {
    let mut text = input.to_string();

    for re in RE_BOILERPLATE.iter() {
        let mut seen = 0;
        text = re
            .replace_all(&text, |caps: &Captures| {
                seen += 1;
                if seen <= MAX_BOILERPLATE_REPEATS {
                    caps[0].to_string()
                } else {
                    String::new()
                }
            })
            .into_owned();
    }

    text
}

/// Stage 5: Collapse repetition
pub fn stage5_collapse_repetition(input: &str) -> String {
    collapse_boilerplate(&collapse_duplicate_lines(input))
}

// ============================================================================
// Stage 6: Section Stripping
// ============================================================================

static RE_SOURCES_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*|__)?(?:sources?|references?|credits?)\b(?:\*\*|__)?[ \t]*(?::|$)",
    )
    .unwrap()
});

static RE_BACKEND_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(?:#{1,6}[ \t]*)?(?:\*\*|__)?(?:windows?[ \t]+explanation|appendix|debug(?:ging)?[ \t]+info(?:rmation)?|internal[ \t]+notes)\b(?:\*\*|__)?[ \t]*(?::|$)",
    )
    .unwrap()
});

fn truncate_at(input: &str, heading: &Regex) -> String {
    match heading.find(input) {
        Some(m) => input[..m.start()].trim_end().to_string(),
        None => input.to_string(),
    }
}

/// Cuts a trailing `Sources:` / `References:` / `Credits:` block.
pub fn strip_sources(input: &str) -> String {
    truncate_at(input, &RE_SOURCES_HEADING)
}

/// Cuts everything from the first backend-only section heading.
pub fn strip_backend_sections(input: &str) -> String {
    truncate_at(input, &RE_BACKEND_HEADING)
}

/// Stage 6: Strip non-narrative sections
pub fn stage6_strip_sections(input: &str) -> String {
    strip_backend_sections(&strip_sources(input))
}

// ============================================================================
// Stage 7: Final Normalization
// ============================================================================

static RE_MULTIPLE_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

static RE_MULTIPLE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").unwrap());

/// Stage 7: Final normalization
///
/// - Reduce consecutive newlines (3+ -> 2)
/// - Collapse horizontal whitespace runs to one space
pub fn stage7_final_normalize(input: &str) -> String {
    let text = RE_MULTIPLE_NEWLINES.replace_all(input, "\n\n");
    let text = RE_MULTIPLE_SPACES.replace_all(&text, " ");
    text.trim().to_string()
}

// ============================================================================
// Main Pipeline
// ============================================================================

/// Run the full pipeline with explicit stage options.
pub fn clean_summary_with_options(
    summary: Option<&str>,
    windows: Option<&[RawWindowEntry]>,
    format: &FormatOptions,
    options: &SummaryOptions,
    state: &ExpansionState,
) -> String {
    let Some(summary) = summary else {
        return String::new();
    };
    let mut result = summary.to_string();

    if options.normalize_strings {
        result = stage1_normalize_string(&result);
    }

    if options.strip_debug {
        result = stage2_strip_debug(&result);
    }

    if options.expand_tokens {
        result = stage3_expand_tokens(&result, windows, format, state);
    }

    if options.humanize_times {
        result = stage4_humanize(&result, format);
    }

    if options.collapse_repetition {
        result = stage5_collapse_repetition(&result);
    }

    if options.strip_backend_sections {
        result = stage6_strip_sections(&result);
    }

    if options.final_normalize {
        result = stage7_final_normalize(&result);
    }

    if options.strip_debug {
        result = strip_debug_blocks(&result);
    }

    result
}

/// Clean a narrative summary with every stage enabled.
///
/// # Example
///
/// ```
/// use muhurta::summary::clean_summary;
/// use muhurta::tokens::ExpansionState;
/// use muhurta::{FormatOptions, RawWindowEntry};
///
/// let windows = vec![RawWindowEntry::slot(7), RawWindowEntry::slot(8)];
/// let text = "Travel during Windows 1 and 2. __windows_json__: [7, 8]\n\nSources: feed";
/// let clean = clean_summary(Some(text), Some(&windows), &FormatOptions::default(), &ExpansionState::new());
/// assert_eq!(clean, "Travel during 9:00 AM – 12:00 PM.");
/// ```
pub fn clean_summary(
    summary: Option<&str>,
    windows: Option<&[RawWindowEntry]>,
    format: &FormatOptions,
    state: &ExpansionState,
) -> String {
    clean_summary_with_options(summary, windows, format, &SummaryOptions::default(), state)
}

/// Builder for cleaning summaries and building windows with shared settings.
///
/// Owns its [`ExpansionState`], so the missing-windows warning is emitted at
/// most once per cleaner.
///
/// # Example
///
/// ```
/// use muhurta::{FormatOptions, RawWindowEntry, SummaryCleaner};
///
/// let cleaner = SummaryCleaner::new()
///     .with_format(FormatOptions::default().twenty_four_hour());
/// let windows = vec![RawWindowEntry::slot(2)];
///
/// assert_eq!(cleaner.clean(Some("Go in window 1."), Some(&windows)), "Go in 01:30 – 03:00.");
/// assert_eq!(cleaner.build_windows(Some(&windows))[0].start_display, "01:30");
/// ```
#[derive(Debug, Default)]
pub struct SummaryCleaner {
    format: FormatOptions,
    options: SummaryOptions,
    state: ExpansionState,
}

impl SummaryCleaner {
    /// Creates a cleaner with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the time formatting options.
    pub fn with_format(mut self, format: FormatOptions) -> Self {
        self.format = format;
        self
    }

    /// Sets the stage options.
    pub fn with_options(mut self, options: SummaryOptions) -> Self {
        self.options = options;
        self
    }

    /// Uses minimal stage options.
    pub fn minimal(mut self) -> Self {
        self.options = SummaryOptions::minimal();
        self
    }

    pub fn format_options(&self) -> &FormatOptions {
        &self.format
    }

    pub fn summary_options(&self) -> &SummaryOptions {
        &self.options
    }

    pub fn state(&self) -> &ExpansionState {
        &self.state
    }

    /// Cleans a summary, expanding references against `windows`.
    pub fn clean(&self, summary: Option<&str>, windows: Option<&[RawWindowEntry]>) -> String {
        clean_summary_with_options(summary, windows, &self.format, &self.options, &self.state)
    }

    /// Builds normalized windows with this cleaner's format options.
    pub fn build_windows(&self, raw: Option<&[RawWindowEntry]>) -> Vec<NormalizedTimeWindow> {
        build_time_windows(raw, &self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::FALLBACK_FRAGMENT;

    fn slots(count: i64) -> Vec<RawWindowEntry> {
        (1..=count).map(RawWindowEntry::slot).collect()
    }

    #[test]
    fn test_normalize_string() {
        let input = "Cafe\u{0301}\u{200B} time\u{3000}now\u{FEFF}\r\n";
        assert_eq!(stage1_normalize_string(input), "Café time now\n");
    }

    #[test]
    fn test_humanize_iso_datetimes() {
        let format = FormatOptions::default();
        assert_eq!(
            stage4_humanize("Starts at 2024-03-15T10:30:00+05:30 sharp.", &format),
            "Starts at 10:30 AM sharp."
        );
        assert_eq!(
            stage4_humanize("2024-03-15T06:00:00 to 2024-03-15T07:30:00", &format),
            "6:00 AM – 7:30 AM"
        );
    }

    #[test]
    fn test_humanize_iso_in_time_zone() {
        let format = FormatOptions::default().with_tz("Asia/Kolkata");
        assert_eq!(stage4_humanize("at 2024-03-15T04:00:00Z", &format), "at 9:30 AM");
    }

    #[test]
    fn test_time_to_time_phrase() {
        let format = FormatOptions::default();
        assert_eq!(
            stage4_humanize("Travel from 9:00 AM to 10:30 AM.", &format),
            "Travel from 9:00 AM – 10:30 AM."
        );
        assert_eq!(stage4_humanize("from 14:00 to 15:30", &format), "from 14:00 – 15:30");
        assert_eq!(stage4_humanize("go to the temple", &format), "go to the temple");
    }

    #[test]
    fn test_based_on_hint() {
        let format = FormatOptions::default();
        assert_eq!(
            stage4_humanize("Strong focus [based on pakshi.day_ruler_status]", &format),
            "Strong focus *(based on day ruler status)*"
        );
        assert_eq!(
            stage4_humanize("[Based on tara]", &format),
            "*(based on tara)*"
        );
    }

    #[test]
    fn test_collapse_duplicate_lines() {
        assert_eq!(collapse_duplicate_lines("A\nA\n\nA\nB\n  B  "), "A\n\nA\nB");
        assert_eq!(collapse_duplicate_lines("\n\n"), "\n");
    }

    #[test]
    fn test_collapse_boilerplate() {
        let sentence = "Always use your own judgment.";
        let input = format!("{s} One. {s} Two. {s} Three. always use  your own judgment.", s = sentence);
        let result = collapse_boilerplate(&input);
        assert_eq!(result.matches(sentence).count(), 2);
        assert!(!result.to_lowercase().contains("three. always"));
        assert!(result.contains("Three."));
    }

    #[test]
    fn test_strip_sources() {
        assert_eq!(strip_sources("Body text.\n\nSources: Drik Panchang\nMore"), "Body text.");
        assert_eq!(strip_sources("Body.\n**References:**\n- a"), "Body.");
        assert_eq!(strip_sources("Body.\n## Credits\nTeam"), "Body.");
        assert_eq!(
            strip_sources("References to Mars are favourable."),
            "References to Mars are favourable."
        );
    }

    #[test]
    fn test_strip_backend_sections() {
        assert_eq!(
            strip_backend_sections("Summary.\n\n## Windows Explanation\nWindow 1 is ..."),
            "Summary."
        );
        assert_eq!(strip_backend_sections("Summary.\nInternal notes: x"), "Summary.");
        assert_eq!(strip_backend_sections("Summary.\nDebugging Info\n{}"), "Summary.");
        assert_eq!(strip_backend_sections("Read the appendix later."), "Read the appendix later.");
    }

    #[test]
    fn test_final_normalize() {
        assert_eq!(stage7_final_normalize("a  \t b\n\n\n\nc\n"), "a b\n\nc");
    }

    #[test]
    fn test_full_pipeline() {
        let windows = slots(3);
        let input = "Your day is steady.\n__windows_json__: [{\"start\": 1}]\nBest: time_windows[0]\nWindows 2 and 3 suit travel.\n\n\n\nSources: panchang feed";
        let result = clean_summary(
            Some(input),
            Some(&windows),
            &FormatOptions::default(),
            &ExpansionState::new(),
        );

        let expected = concat!(
            "Your day is steady.\n\nBest: ",
            r#"<span class="mv-time-window mv-severity--neutral">12:00 AM – 1:30 AM "#,
            r#"<span class="mv-score mv-score--neutral">--</span></span>"#,
            "\n1:30 AM – 4:30 AM suit travel."
        );
        assert_eq!(result, expected);
    }

    #[test]
    fn test_pipeline_is_stable() {
        let windows = slots(4);
        let input = "Peak at 2024-03-15T09:00:00.\nPeak at 2024-03-15T09:00:00.\n[based on a.b_c] {\"debug\": true}";
        let format = FormatOptions::default();
        let once = clean_summary(Some(input), Some(&windows), &format, &ExpansionState::new());
        let twice = clean_summary(Some(&once), Some(&windows), &format, &ExpansionState::new());
        assert_eq!(once, "Peak at 9:00 AM.\n*(based on b c)*");
        assert_eq!(once, twice);
    }

    #[test]
    fn test_missing_summary() {
        let result = clean_summary(None, None, &FormatOptions::default(), &ExpansionState::new());
        assert_eq!(result, "");
    }

    #[test]
    fn test_minimal_options() {
        let input = "Line\nLine\n\n\n\nSources: x   y";
        let result = clean_summary_with_options(
            Some(input),
            None,
            &FormatOptions::default(),
            &SummaryOptions::minimal(),
            &ExpansionState::new(),
        );
        assert_eq!(result, "Line\nLine\n\nSources: x y");
    }

    #[test]
    fn test_cleaner_warns_once_without_windows() {
        let cleaner = SummaryCleaner::new();
        let result = cleaner.clean(Some("Use time_windows[0] today."), None);
        assert_eq!(result, format!("Use {} today.", FALLBACK_FRAGMENT));
        assert!(cleaner.state().has_warned());

        cleaner.state().reset();
        assert!(!cleaner.state().has_warned());
    }

    #[test]
    fn test_cleaner_builder() {
        let cleaner = SummaryCleaner::new()
            .with_format(FormatOptions::default().with_slot_minutes(60))
            .minimal();
        assert_eq!(cleaner.format_options().slot_minutes, 60);
        assert_eq!(cleaner.summary_options(), &SummaryOptions::minimal());
        assert_eq!(cleaner.build_windows(Some(&slots(2))).len(), 2);
    }
}
