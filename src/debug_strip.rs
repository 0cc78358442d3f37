//! Removal of backend artifacts leaked into narrative text.
//!
//! The passes run in a fixed order; each one is idempotent on its own.
//!
//! 1. Marker-prefixed JSON blobs
//! 2. Literal markers and fenced code blocks
//! 3. Standalone JSON-looking objects/arrays (bounded scan)
//! 4. Leaked `"key": value,` fragments and empty `{}`/`[]`
//! 5. Runs of closing braces/brackets, `{"key":` opening fragments and
//!    `"key":` labels whose value was already removed
//! 6. Trailing `Debug:` / `Raw payload:` / `Raw data:` sections
//! 7. Whitespace and punctuation cleanup
//!
//! The positional token syntax `time_windows[n]` uses a single bracket pair
//! around a bare integer and is never matched by any pass.

use crate::json_extract::{find_balanced_end, find_marker, skip_marker_separators};
use regex::Regex;
use std::sync::LazyLock;

/// Maximum blobs inspected by a single JSON-removal pass.
pub const MAX_BLOB_ITERATIONS: usize = 256;

static RE_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)__(?:windows_json|debug|raw)__").unwrap());

static RE_FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[^\n`]*\n?.*?```").unwrap());

static RE_STRAY_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`{3,}").unwrap());

static RE_JSON_OBJECT_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\{\s*"[^"\n]{1,64}"\s*:"#).unwrap());

static RE_JSON_ARRAY_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\[\s*(?:\{\s*)?""#).unwrap());

static RE_JSON_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"\n]{1,64}"\s*:"#).unwrap());

static RE_LEAKED_KV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""[A-Za-z_][A-Za-z0-9_ ]{0,40}"\s*:\s*(?:"[^"\n]*"|-?\d+(?:\.\d+)?|true|false|null)\s*,?"#,
    )
    .unwrap()
});

static RE_EMPTY_CONTAINER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\s*\}|\[\s*\]").unwrap());

static RE_CLOSING_RUN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?:"[A-Za-z_]\w*"\s*:?\s*)?[\}\]](?:\s*[\}\]]){2,}"#).unwrap()
});

static RE_OPENING_FRAGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*"[A-Za-z_]\w*"\s*:"#).unwrap());

static RE_DANGLING_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[A-Za-z_]\w{0,40}"\s*:"#).unwrap());

static RE_TRAILING_DEBUG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\b(?:debug|raw\s+payload|raw\s+data)\s*:.*$").unwrap()
});

static RE_BRACE_RUN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\{\}\[\]]{2,}").unwrap());

static RE_MULTI_SPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]{2,}").unwrap());

static RE_SPACE_BEFORE_PUNCT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+([,.;:!?])").unwrap());

static RE_REPEATED_COMMA: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",(?:\s*,)+").unwrap());

static RE_TRAILING_LINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+\n").unwrap());

static RE_MULTI_NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").unwrap());

/// Pass 1: removes `__windows_json__` markers together with the blob they prefix.
pub fn remove_marker_blobs(input: &str) -> String {
    let mut text = input.to_string();
    let mut cursor = 0;

    for _ in 0..MAX_BLOB_ITERATIONS {
        let Some((marker_start, marker_end)) = find_marker(&text, cursor) else {
            break;
        };
        let blob_start = skip_marker_separators(&text, marker_end);
        match find_balanced_end(&text, blob_start) {
            Some(blob_end) => {
                text.replace_range(marker_start..blob_end, " ");
                cursor = marker_start;
            }
            None => cursor = marker_end,
        }
    }

    text
}

/// Pass 2: removes literal markers and fenced code blocks.
pub fn remove_markers_and_fences(input: &str) -> String {
    let text = RE_FENCED_BLOCK.replace_all(input, "");
    let text = RE_STRAY_FENCE.replace_all(&text, "");
    RE_MARKERS.replace_all(&text, "").into_owned()
}

/// Heuristic for whether a balanced slice is machine JSON rather than prose.
pub fn looks_like_json(candidate: &str) -> bool {
    RE_JSON_OBJECT_START.is_match(candidate)
        || RE_JSON_ARRAY_START.is_match(candidate)
        || RE_JSON_KEY.find_iter(candidate).take(2).count() >= 2
}

/// Pass 3: removes standalone JSON objects and arrays.
///
/// Each candidate is bounded by the blob scan limit and the pass stops after
/// a fixed number of candidates, so pathological input still terminates.
pub fn remove_json_blobs(input: &str) -> String {
    let mut text = input.to_string();
    let mut cursor = 0;

    for _ in 0..MAX_BLOB_ITERATIONS {
        let Some(offset) = text.get(cursor..).and_then(|rest| rest.find(['{', '['])) else {
            break;
        };
        let start = cursor + offset;
        match find_balanced_end(&text, start) {
            Some(end) if looks_like_json(&text[start..end]) => {
                text.replace_range(start..end, " ");
                cursor = start;
            }
            _ => cursor = start + 1,
        }
    }

    text
}

/// Removes empty `{}`/`[]` containers, including nested ones such as `[ [ ] ]`.
pub fn remove_empty_containers(input: &str) -> String {
    let mut text = input.to_string();

    for _ in 0..MAX_BLOB_ITERATIONS {
        if !RE_EMPTY_CONTAINER.is_match(&text) {
            break;
        }
        text = RE_EMPTY_CONTAINER.replace_all(&text, "").into_owned();
    }

    text
}

/// Pass 4: removes leaked `"key": value` fragments and empty containers.
pub fn remove_leaked_fragments(input: &str) -> String {
    let text = RE_LEAKED_KV.replace_all(input, "");
    remove_empty_containers(&text)
}

/// Whether `rest` begins (after whitespace) with something that reads as a JSON value.
fn starts_with_value(rest: &str) -> bool {
    let rest = rest.trim_start();
    rest.starts_with(['"', '{', '[', '-'])
        || rest.starts_with(|c: char| c.is_ascii_digit())
        || ["true", "false", "null"].iter().any(|word| rest.starts_with(word))
}

/// Removes `"key":` labels left without a value once their blob is gone.
pub fn remove_dangling_keys(input: &str) -> String {
    let mut text = input.to_string();

    for _ in 0..MAX_BLOB_ITERATIONS {
        let mut result = String::with_capacity(text.len());
        let mut last = 0;
        for m in RE_DANGLING_KEY.find_iter(&text) {
            if starts_with_value(&text[m.end()..]) {
                continue;
            }
            result.push_str(&text[last..m.start()]);
            last = m.end();
        }
        if last == 0 {
            break;
        }
        result.push_str(&text[last..]);
        text = result;
    }

    text
}

/// Pass 5: removes runs of closing delimiters, `{"key":` openers and dangling keys.
pub fn remove_delimiter_debris(input: &str) -> String {
    let text = RE_CLOSING_RUN.replace_all(input, "");
    let text = RE_OPENING_FRAGMENT.replace_all(&text, "");
    remove_dangling_keys(&text)
}

/// Pass 6: drops a trailing debug/raw-payload section.
pub fn remove_trailing_debug(input: &str) -> String {
    RE_TRAILING_DEBUG.replace(input, "").into_owned()
}

/// Pass 7: collapses whitespace and punctuation left behind by earlier passes.
pub fn collapse_artifacts(input: &str) -> String {
    let text = RE_BRACE_RUN.replace_all(input, "");
    let text = remove_empty_containers(&text);
    let text = RE_MULTI_SPACE.replace_all(&text, " ");
    let text = RE_SPACE_BEFORE_PUNCT.replace_all(&text, "$1");
    let text = RE_REPEATED_COMMA.replace_all(&text, ",");
    let text = RE_TRAILING_LINE_SPACE.replace_all(&text, "\n");
    let text = RE_MULTI_NEWLINES.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Strips every kind of backend artifact from `input`.
///
/// ```
/// use muhurta::debug_strip::strip_debug_blocks;
///
/// let text = r#"Good for travel. __windows_json__: [{"name": "Amrit"}] Enjoy!"#;
/// assert_eq!(strip_debug_blocks(text), "Good for travel. Enjoy!");
/// ```
pub fn strip_debug_blocks(input: &str) -> String {
    if input.trim().is_empty() {
        return String::new();
    }

    let text = remove_marker_blobs(input);
    let text = remove_markers_and_fences(&text);
    let text = remove_json_blobs(&text);
    let text = remove_leaked_fragments(&text);
    let text = remove_delimiter_debris(&text);
    let text = remove_trailing_debug(&text);
    collapse_artifacts(&text)
}

/// [`strip_debug_blocks`] for optional input; absent text becomes empty.
pub fn strip_debug_blocks_opt(input: Option<&str>) -> String {
    input.map(strip_debug_blocks).unwrap_or_default()
}
