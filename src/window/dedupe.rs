//! Order-stable removal of duplicate raw windows.

use super::raw::{RawWindowEntry, WindowRecord};
use std::collections::HashSet;

/// Identity key `name|start|end` built from the raw, un-normalized fields.
pub fn dedupe_key(entry: &RawWindowEntry) -> String {
    let record = WindowRecord::from_entry(entry);
    format!(
        "{}|{}|{}",
        record.identity_part("name"),
        record.identity_part("start"),
        record.identity_part("end")
    )
}

/// Keeps the first entry for each identity key, preserving input order.
pub fn dedupe(entries: &[RawWindowEntry]) -> Vec<&RawWindowEntry> {
    let mut seen = HashSet::with_capacity(entries.len());
    entries
        .iter()
        .filter(|entry| seen.insert(dedupe_key(entry)))
        .collect()
}
