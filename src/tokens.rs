//! Expansion of time-window references in narrative text.
//!
//! Two independent passes run over the text:
//!
//! - Positional tokens `time_windows[n]` (0-based, case-insensitive) become a
//!   small HTML fragment carrying the window's time range, score and severity
//!   classes. Unresolvable tokens become a fixed neutral fragment.
//! - Prose references such as "Windows 3, 4, and 6" or "window 2" (1-based,
//!   after deduplication) become plain time ranges. Contiguous window numbers
//!   collapse into one range. Anything that fails to resolve is left as is.

use crate::options::FormatOptions;
use crate::time::format_time_range;
use crate::window::{build_time_windows, normalize_window, NormalizedTimeWindow, RawWindowEntry};
use regex::{Captures, Regex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::LazyLock;

/// Fragment substituted for a positional token that cannot be resolved.
pub const FALLBACK_FRAGMENT: &str = r#"<span class="mv-time-window mv-severity--neutral">--:-- – --:-- <span class="mv-score mv-score--neutral">--</span></span>"#;

static RE_POSITIONAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)time_windows\[(\d+)\]").unwrap());

static RE_WINDOW_LIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bwindows\s+#?(\d+(?:(?:\s*,\s*(?:(?:and|&)\s+)?|\s+(?:and|&)\s+)#?\d+)*)")
        .unwrap()
});

static RE_SINGLE_WINDOW: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bwindow\s+#?(\d+)\b").unwrap());

static RE_INTEGER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Tracks whether the missing-windows warning has been emitted.
///
/// Owned by the caller so separate pipelines (and tests) do not share it.
#[derive(Debug, Default)]
pub struct ExpansionState {
    warned: AtomicBool,
}

impl ExpansionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_warned(&self) -> bool {
        self.warned.load(Ordering::Relaxed)
    }

    /// Clears the flag so the next missing-windows expansion warns again.
    pub fn reset(&self) {
        self.warned.store(false, Ordering::Relaxed);
    }

    /// Sets the flag, returning `true` only for the first caller.
    fn mark_warned(&self) -> bool {
        !self.warned.swap(true, Ordering::Relaxed)
    }
}

/// Escapes text placed inside a fragment.
fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }

    result
}

/// Renders the fragment for a resolved window.
///
/// ```
/// use muhurta::tokens::render_window_fragment;
/// use muhurta::{normalize_window, FormatOptions, RawWindowEntry};
///
/// let window = normalize_window(&RawWindowEntry::slot(1), 0, &FormatOptions::default());
/// assert_eq!(
///     render_window_fragment(&window),
///     r#"<span class="mv-time-window mv-severity--neutral">12:00 AM – 1:30 AM <span class="mv-score mv-score--neutral">--</span></span>"#
/// );
/// ```
pub fn render_window_fragment(window: &NormalizedTimeWindow) -> String {
    let badges: String = window
        .pakshi_badges()
        .into_iter()
        .map(|(kind, value)| {
            format!(
                r#" <span class="mv-pakshi mv-pakshi--{}">{}</span>"#,
                kind,
                escape_html(value)
            )
        })
        .collect();

    format!(
        r#"<span class="mv-time-window mv-severity--{}">{} <span class="mv-score mv-score--{}">{}</span>{}</span>"#,
        window.severity.as_str(),
        escape_html(&window.time_range()),
        window.score_variant.as_str(),
        escape_html(&window.score_text),
        badges
    )
}

/// Replaces `time_windows[n]` tokens with window fragments.
pub fn expand_positional_tokens(
    text: &str,
    windows: Option<&[RawWindowEntry]>,
    options: &FormatOptions,
    state: &ExpansionState,
) -> String {
    if !RE_POSITIONAL.is_match(text) {
        return text.to_string();
    }

    let Some(windows) = windows else {
        if state.mark_warned() {
            tracing::warn!("time window tokens found but no windows were supplied");
        }
        return RE_POSITIONAL
            .replace_all(text, FALLBACK_FRAGMENT)
            .into_owned();
    };

    RE_POSITIONAL
        .replace_all(text, |caps: &Captures| {
            let entry = caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| windows.get(index).map(|entry| (index, entry)));
            match entry {
                Some((index, entry)) => {
                    render_window_fragment(&normalize_window(entry, index, options))
                }
                None => {
                    tracing::debug!(
                        token = &caps[0],
                        available = windows.len(),
                        "time window token out of range"
                    );
                    FALLBACK_FRAGMENT.to_string()
                }
            }
        })
        .into_owned()
}

/// Groups sorted, deduplicated numbers into inclusive contiguous runs.
fn group_runs(sorted: &[usize]) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for &n in sorted {
        match runs.last_mut() {
            Some((_, end)) if *end + 1 == n => *end = n,
            _ => runs.push((n, n)),
        }
    }
    runs
}

fn window_by_number(windows: &[NormalizedTimeWindow], number: usize) -> Option<&NormalizedTimeWindow> {
    number.checked_sub(1).and_then(|index| windows.get(index))
}

/// Resolves a list like `3, 4, and 6` to `start – end, start – end`.
fn resolve_window_list(list: &str, windows: &[NormalizedTimeWindow]) -> Option<String> {
    let mut numbers = RE_INTEGER
        .find_iter(list)
        .map(|m| m.as_str().parse::<usize>().ok())
        .collect::<Option<Vec<_>>>()?;
    numbers.sort_unstable();
    numbers.dedup();

    let ranges = group_runs(&numbers)
        .into_iter()
        .map(|(first, last)| {
            let first = window_by_number(windows, first)?;
            let last = window_by_number(windows, last)?;
            Some(format_time_range(&first.start_display, &last.end_display))
        })
        .collect::<Option<Vec<_>>>()?;

    (!ranges.is_empty()).then(|| ranges.join(", "))
}

/// Replaces prose window-number references with time ranges.
pub fn expand_window_references(text: &str, windows: &[NormalizedTimeWindow]) -> String {
    let text = RE_WINDOW_LIST.replace_all(text, |caps: &Captures| {
        resolve_window_list(&caps[1], windows).unwrap_or_else(|| caps[0].to_string())
    });

    RE_SINGLE_WINDOW
        .replace_all(&text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|number| window_by_number(windows, number))
                .map(NormalizedTimeWindow::time_range)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Whether `text` contains any reference this module can expand.
pub fn has_window_references(text: &str) -> bool {
    RE_POSITIONAL.is_match(text) || RE_WINDOW_LIST.is_match(text) || RE_SINGLE_WINDOW.is_match(text)
}

/// Expands positional tokens and prose window references.
///
/// Never fails: unresolvable references become the fallback fragment
/// (positional) or are left untouched (prose).
///
/// ```
/// use muhurta::tokens::{expand_time_window_tokens, ExpansionState};
/// use muhurta::{FormatOptions, RawWindowEntry};
///
/// let windows: Vec<_> = (1..=5).map(RawWindowEntry::slot).collect();
/// let state = ExpansionState::new();
/// let out = expand_time_window_tokens(
///     "Windows 3, 4, and 5",
///     Some(&windows),
///     &FormatOptions::default(),
///     &state,
/// );
/// assert_eq!(out, "3:00 AM – 7:30 AM");
/// ```
pub fn expand_time_window_tokens(
    text: &str,
    windows: Option<&[RawWindowEntry]>,
    options: &FormatOptions,
    state: &ExpansionState,
) -> String {
    let text = expand_positional_tokens(text, windows, options, state);

    match windows {
        Some(raw) if RE_WINDOW_LIST.is_match(&text) || RE_SINGLE_WINDOW.is_match(&text) => {
            let built = build_time_windows(Some(raw), options);
            expand_window_references(&text, &built)
        }
        _ => text,
    }
}
