//! Extraction of JSON blobs embedded in free text.
//!
//! Backend narratives sometimes carry a raw window payload, either after the
//! `__windows_json__` marker or inline with no marker at all. Blobs are located
//! with an explicit depth counter rather than a regex so nesting is handled
//! regardless of size.

use crate::error::{Error, Result};
use serde_json::Value;

/// Marker that precedes a machine-readable window payload.
pub const WINDOWS_JSON_MARKER: &str = "__windows_json__";

/// Upper bound on bytes scanned for the end of a single blob.
pub const MAX_BLOB_SCAN: usize = 64 * 1024;

/// Result of scanning text for an embedded JSON blob.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    /// Parsed value, when a blob was found and parsed.
    pub data: Option<Value>,
    /// The text with the parsed blob (and its marker) removed, or the
    /// original text when nothing parsed.
    pub text: String,
}

impl Extraction {
    fn unchanged(text: &str) -> Self {
        Self {
            data: None,
            text: text.to_string(),
        }
    }
}

/// Finds the byte index just past the delimiter closing the one at `start`.
///
/// Only the opening character's own pair is counted, so `{` scans for the
/// matching `}` and ignores square brackets. Returns `None` when the text
/// (or the scan bound) ends first.
pub fn find_balanced_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open = *bytes.get(start)?;
    let close = match open {
        b'{' => b'}',
        b'[' => b']',
        _ => return None,
    };

    let limit = bytes.len().min(start.saturating_add(MAX_BLOB_SCAN));
    let mut depth = 0usize;
    for (offset, &b) in bytes[start..limit].iter().enumerate() {
        if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(start + offset + 1);
            }
        }
    }
    None
}

/// Parses a candidate blob, retrying with unescaped quotes.
///
/// Tried in order: the raw slice, HTML-entity quotes unescaped, then
/// backslash-escaped quotes unescaped. The first success wins.
pub fn parse_lenient_json(candidate: &str) -> Result<Value> {
    let first_err = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let entity_unescaped = candidate
        .replace("&quot;", "\"")
        .replace("&#34;", "\"")
        .replace("&#x22;", "\"");
    if let Ok(value) = serde_json::from_str::<Value>(&entity_unescaped) {
        return Ok(value);
    }

    let slash_unescaped = candidate.replace("\\\"", "\"");
    if let Ok(value) = serde_json::from_str::<Value>(&slash_unescaped) {
        return Ok(value);
    }

    Err(Error::Json(first_err))
}

/// Locates the marker (case-insensitive) and returns its byte range.
pub(crate) fn find_marker(text: &str, from: usize) -> Option<(usize, usize)> {
    let haystack = text.get(from..)?;
    let lower = haystack.to_ascii_lowercase();
    lower
        .find(WINDOWS_JSON_MARKER)
        .map(|pos| (from + pos, from + pos + WINDOWS_JSON_MARKER.len()))
}

/// Skips separator characters that may sit between a marker and its blob.
pub(crate) fn skip_marker_separators(text: &str, from: usize) -> usize {
    let rest = &text[from..];
    let skipped = rest
        .find(|c: char| !(c.is_whitespace() || matches!(c, ':' | '=' | '-' | '>')))
        .unwrap_or(rest.len());
    from + skipped
}

fn try_extract(text: &str) -> Result<(Value, String)> {
    let (cut_start, blob_start) = match find_marker(text, 0) {
        Some((marker_start, marker_end)) => {
            let blob_start = skip_marker_separators(text, marker_end);
            match text.as_bytes().get(blob_start) {
                Some(b'{') | Some(b'[') => (marker_start, blob_start),
                _ => return Err(Error::NoEmbeddedJson),
            }
        }
        None => {
            let blob_start = text.find(['{', '[']).ok_or(Error::NoEmbeddedJson)?;
            (blob_start, blob_start)
        }
    };

    let blob_end = find_balanced_end(text, blob_start).ok_or(Error::NoEmbeddedJson)?;
    let value = parse_lenient_json(&text[blob_start..blob_end])?;

    let mut remaining = String::with_capacity(text.len() - (blob_end - cut_start));
    remaining.push_str(text[..cut_start].trim_end());
    let tail = text[blob_end..].trim_start();
    if !remaining.is_empty() && !tail.is_empty() {
        remaining.push(' ');
    }
    remaining.push_str(tail);

    Ok((value, remaining))
}

/// Extracts the first embedded JSON blob from `text`.
///
/// When the marker is present only the marker-anchored blob is considered.
/// On any failure the original text is returned untouched for the debug
/// stripper to deal with.
///
/// ```
/// use muhurta::json_extract::extract_embedded_json;
///
/// let out = extract_embedded_json(r#"Good day. __windows_json__: {"score": 8}"#);
/// assert_eq!(out.data.unwrap()["score"], 8);
/// assert_eq!(out.text, "Good day.");
/// ```
pub fn extract_embedded_json(text: &str) -> Extraction {
    match try_extract(text) {
        Ok((value, remaining)) => Extraction {
            data: Some(value),
            text: remaining,
        },
        Err(Error::NoEmbeddedJson) => Extraction::unchanged(text),
        Err(e) => {
            tracing::debug!(error = %e, "embedded JSON did not parse");
            Extraction::unchanged(text)
        }
    }
}
