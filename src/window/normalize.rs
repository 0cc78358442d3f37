//! Normalization of one raw window into its canonical display form.

use super::raw::{RawWindowEntry, WindowRecord};
use crate::debug_strip::strip_debug_blocks;
use crate::json_extract::extract_embedded_json;
use crate::options::FormatOptions;
use crate::severity::{
    classify_severity, normalize_score, score_text, score_variant, ScoreVariant, Severity,
};
use crate::time::{
    format_card_date, format_iso_time, format_time_range, parse_iso_datetime, parse_time_value,
    slot_bounds, synthesize_iso, TimeValue, PLACEHOLDER_TIME,
};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::sync::LazyLock;

const NAME_KEYS: &[&str] = &["name", "title", "label", "category"];
const CATEGORY_KEYS: &[&str] = &["category", "type", "kind"];
const EXPLICIT_SEVERITY_KEYS: &[&str] = &["severity", "impact", "status"];

const START_KEYS: &[&str] = &["start", "start_time", "from"];
const END_KEYS: &[&str] = &["end", "end_time", "to"];
const START_ISO_KEYS: &[&str] = &["start_iso", "startISO", "start_time_iso"];
const END_ISO_KEYS: &[&str] = &["end_iso", "endISO", "end_time_iso"];
const START_DISPLAY_KEYS: &[&str] = &["start_display", "startDisplay"];
const END_DISPLAY_KEYS: &[&str] = &["end_display", "endDisplay"];

const SCORE_KEYS: &[&str] = &["score", "rating", "quality_score"];

const PAKSHI_DAY_KEYS: &[&str] = &["pakshi_day", "day_pakshi", "pakshiDay", "ruling_pakshi"];
const PAKSHI_NIGHT_KEYS: &[&str] = &["pakshi_night", "night_pakshi", "pakshiNight"];
const PAKSHI_STATUS_KEYS: &[&str] = &[
    "pakshi_status",
    "pakshi_activity",
    "pakshiStatus",
    "activity",
];
const TARA_KEYS: &[&str] = &["tara", "tara_bala"];
const NITHYA_KEYS: &[&str] = &["nithya", "nithya_yoga"];

const FREE_TEXT_KEYS: &[&str] = &["note", "short_desc", "description"];
const SHORT_DESC_KEYS: &[&str] = &["short_desc", "description"];

static RE_QUOTED_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""[^"\n]*"\s*:"#).unwrap());

/// Canonical window ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedTimeWindow {
    pub name: String,
    pub index: usize,
    #[serde(rename = "startISO", skip_serializing_if = "Option::is_none")]
    pub start_iso: Option<String>,
    #[serde(rename = "endISO", skip_serializing_if = "Option::is_none")]
    pub end_iso: Option<String>,
    pub start_display: String,
    pub end_display: String,
    pub score: Option<f64>,
    pub score_text: String,
    pub score_variant: ScoreVariant,
    pub severity: Severity,
    #[serde(rename = "pakshi_day", skip_serializing_if = "Option::is_none")]
    pub pakshi_day: Option<String>,
    #[serde(rename = "pakshi_night", skip_serializing_if = "Option::is_none")]
    pub pakshi_night: Option<String>,
    #[serde(rename = "pakshi_status", skip_serializing_if = "Option::is_none")]
    pub pakshi_status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tara: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nithya: Option<String>,
    #[serde(rename = "card_date", skip_serializing_if = "Option::is_none")]
    pub card_date: Option<String>,
    #[serde(rename = "short_desc", skip_serializing_if = "Option::is_none")]
    pub short_desc: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// The entry as received. Kept for diagnostics only.
    pub raw: RawWindowEntry,
}

impl NormalizedTimeWindow {
    /// `start – end` using the display times.
    pub fn time_range(&self) -> String {
        format_time_range(&self.start_display, &self.end_display)
    }

    /// Pakshi values present on this window, labelled by kind.
    pub fn pakshi_badges(&self) -> Vec<(&'static str, &str)> {
        [
            ("day", self.pakshi_day.as_deref()),
            ("night", self.pakshi_night.as_deref()),
            ("status", self.pakshi_status.as_deref()),
        ]
        .into_iter()
        .filter_map(|(kind, value)| value.map(|v| (kind, v)))
        .collect()
    }
}

/// Pulls JSON embedded in free-text fields into the record.
///
/// Fields already on the record win over embedded ones; the text fields are
/// rewritten without the blob.
fn merge_embedded_json(record: &mut WindowRecord) {
    for key in FREE_TEXT_KEYS {
        let Some(text) = record.raw_text(key) else {
            continue;
        };
        let extraction = extract_embedded_json(text);
        let Some(data) = extraction.data else {
            continue;
        };
        record.set(key, Value::String(extraction.text));
        if let Value::Object(map) = data {
            record.merge_missing(map);
        }
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Resolves a metadata label from its aliases.
///
/// Blank strings count as absent; a non-string truthy value is known to exist
/// but has no usable label, so `unknown` stands in for it.
fn resolve_label(record: &WindowRecord, keys: &[&str], unknown: &str) -> Option<String> {
    keys.iter().find_map(|key| match record.get(key)? {
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.trim().to_string()),
        other if is_truthy(other) => Some(unknown.to_string()),
        _ => None,
    })
}

fn looks_like_raw_json(text: &str) -> bool {
    text.chars().count() < 3
        || text.contains("{\"")
        || text.contains("\":")
        || RE_QUOTED_KEY.is_match(text)
}

fn clean_free_text(text: Option<&str>) -> Option<String> {
    text.map(strip_debug_blocks).filter(|s| !s.is_empty())
}

/// Display time read straight from the raw start/end value.
fn raw_display(value: Option<&TimeValue>, options: &FormatOptions) -> Option<String> {
    value.and_then(|v| parse_time_value(v, options))
}

/// End of the slot when `start` is a valid slot index.
fn slot_end_display(start: Option<&TimeValue>, options: &FormatOptions) -> Option<String> {
    let slot = start?.as_slot()?;
    let (_, end) = slot_bounds(slot, options.slot_minutes).ok()?;
    Some(end.format(options.use_ampm))
}

fn iso_from_text(value: Option<&TimeValue>) -> Option<String> {
    let text = value?.as_text()?.trim();
    parse_iso_datetime(text, None).map(|_| text.to_string())
}

struct Bound {
    iso: Option<String>,
    display: String,
}

fn resolve_bound(
    record: &WindowRecord,
    iso_keys: &[&str],
    display_keys: &[&str],
    value: Option<&TimeValue>,
    fallback_display: Option<String>,
    date: Option<&str>,
    options: &FormatOptions,
) -> Bound {
    let explicit_display = record.first_text(display_keys).map(str::to_string);
    let value_display = raw_display(value, options).or(fallback_display);

    let iso = record
        .first_text(iso_keys)
        .map(str::to_string)
        .or_else(|| iso_from_text(value))
        .or_else(|| {
            let display = explicit_display.as_deref().or(value_display.as_deref())?;
            synthesize_iso(date?, display, options)
        });

    let display = explicit_display
        .or_else(|| iso.as_deref().and_then(|iso| format_iso_time(iso, options)))
        .or(value_display)
        .unwrap_or_else(|| PLACEHOLDER_TIME.to_string());

    Bound { iso, display }
}

/// Normalizes one raw entry at position `index`.
///
/// Never fails: missing or unreadable fields fall back to placeholders.
pub fn normalize_window(
    entry: &RawWindowEntry,
    index: usize,
    options: &FormatOptions,
) -> NormalizedTimeWindow {
    let mut record = WindowRecord::from_entry(entry);
    merge_embedded_json(&mut record);

    let name = record
        .first_text(NAME_KEYS)
        .map(str::to_string)
        .unwrap_or_else(|| format!("Window {}", index + 1));

    let date = record.text("date").or(options.date.as_deref());
    let start_value = record.first_time(START_KEYS);
    let end_value = record.first_time(END_KEYS);

    let start = resolve_bound(
        &record,
        START_ISO_KEYS,
        START_DISPLAY_KEYS,
        start_value.as_ref(),
        None,
        date,
        options,
    );
    let end = resolve_bound(
        &record,
        END_ISO_KEYS,
        END_DISPLAY_KEYS,
        end_value.as_ref(),
        if end_value.is_none() {
            slot_end_display(start_value.as_ref(), options)
        } else {
            None
        },
        date,
        options,
    );

    let score = record.first_value(SCORE_KEYS).and_then(normalize_score);
    let severity = classify_severity(
        record.first_text(EXPLICIT_SEVERITY_KEYS),
        record.first_text(CATEGORY_KEYS),
        score,
    );

    let short_desc = clean_free_text(record.first_text(SHORT_DESC_KEYS));
    let note = match clean_free_text(record.text("note")) {
        Some(note) if looks_like_raw_json(&note) => short_desc.clone(),
        other => other,
    };

    let card_date = record.text("card_date").map(str::to_string).or_else(|| {
        start
            .iso
            .as_deref()
            .and_then(|iso| format_card_date(iso, options))
    });

    NormalizedTimeWindow {
        name,
        index,
        start_iso: start.iso,
        end_iso: end.iso,
        start_display: start.display,
        end_display: end.display,
        score,
        score_text: score_text(score),
        score_variant: score_variant(score),
        severity,
        pakshi_day: resolve_label(&record, PAKSHI_DAY_KEYS, "Unknown Pakshi"),
        pakshi_night: resolve_label(&record, PAKSHI_NIGHT_KEYS, "Unknown Pakshi"),
        pakshi_status: resolve_label(&record, PAKSHI_STATUS_KEYS, "Unknown Pakshi"),
        tara: resolve_label(&record, TARA_KEYS, "Unknown Tara"),
        nithya: resolve_label(&record, NITHYA_KEYS, "Unknown Nithya"),
        card_date,
        short_desc,
        note,
        raw: entry.clone(),
    }
}
