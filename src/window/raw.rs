//! Raw upstream window entries and the uniform record they coerce into.

use crate::time::TimeValue;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A window entry exactly as supplied upstream.
///
/// Deserializes from any JSON value: numbers are slot indices, strings are
/// time values, objects are records. Other shapes (null, booleans, nested
/// arrays) become an empty record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum RawWindowEntry {
    /// A bare slot index.
    Slot(Number),
    /// A bare time value or slot index as text.
    Text(String),
    /// An object with any subset of the known window fields.
    Record(Map<String, Value>),
}

impl From<Value> for RawWindowEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::Number(n) => RawWindowEntry::Slot(n),
            Value::String(s) => RawWindowEntry::Text(s),
            Value::Object(map) => RawWindowEntry::Record(map),
            Value::Null | Value::Bool(_) | Value::Array(_) => RawWindowEntry::Record(Map::new()),
        }
    }
}

impl From<RawWindowEntry> for Value {
    fn from(entry: RawWindowEntry) -> Self {
        match entry {
            RawWindowEntry::Slot(n) => Value::Number(n),
            RawWindowEntry::Text(s) => Value::String(s),
            RawWindowEntry::Record(map) => Value::Object(map),
        }
    }
}

impl RawWindowEntry {
    /// A bare slot index entry.
    pub fn slot(slot: i64) -> Self {
        RawWindowEntry::Slot(Number::from(slot))
    }

    /// A bare text entry.
    pub fn text(text: impl Into<String>) -> Self {
        RawWindowEntry::Text(text.into())
    }
}

/// Uniform view over a [`RawWindowEntry`].
///
/// Bare numbers and strings become `{"start": value}`; records are copied.
/// All field lookups go through the typed accessors below.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WindowRecord {
    fields: Map<String, Value>,
}

impl WindowRecord {
    pub fn from_entry(entry: &RawWindowEntry) -> Self {
        let fields = match entry {
            RawWindowEntry::Slot(n) => {
                let mut map = Map::new();
                map.insert("start".to_string(), Value::Number(n.clone()));
                map
            }
            RawWindowEntry::Text(s) => {
                let mut map = Map::new();
                map.insert("start".to_string(), Value::String(s.clone()));
                map
            }
            RawWindowEntry::Record(map) => map.clone(),
        };
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// First non-null value among `keys`.
    pub fn first_value(&self, keys: &[&str]) -> Option<&Value> {
        keys.iter()
            .filter_map(|k| self.fields.get(*k))
            .find(|v| !v.is_null())
    }

    /// A string field, trimmed, or `None` when absent or blank.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// First non-blank string among `keys`.
    pub fn first_text(&self, keys: &[&str]) -> Option<&str> {
        keys.iter().find_map(|k| self.text(k))
    }

    /// A string field without trimming or blank filtering.
    pub fn raw_text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// First number-or-string among `keys`, as a time value.
    pub fn first_time(&self, keys: &[&str]) -> Option<TimeValue> {
        keys.iter()
            .filter_map(|k| self.fields.get(*k))
            .find_map(TimeValue::from_json)
    }

    /// Renders a field as it appeared upstream: strings verbatim, numbers in
    /// JSON form, anything else empty.
    pub fn identity_part(&self, key: &str) -> String {
        match self.fields.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        }
    }

    /// Adds keys from `other` that this record does not already carry.
    pub fn merge_missing(&mut self, other: Map<String, Value>) {
        for (key, value) in other {
            self.fields.entry(key).or_insert(value);
        }
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }
}
