//! Aggregated per-publication results file
//!
//! The file is a JSON array that only ever grows: new records are merged with
//! the stored ones, exact duplicates are dropped, and nothing already stored
//! is removed.

use super::traits::{OutputError, OutputResult, PostRecord};
use crate::storage::atomic_write;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use serde_json::Value;
use std::fs;
use std::path::Path;

/// Merges `records` into the results array at `path`
///
/// Stored entries are compared as raw JSON values so fields written by other
/// tools survive the merge.
///
/// # Returns
///
/// The number of records that were not already present
pub fn merge_results(path: &Path, records: &[PostRecord]) -> OutputResult<usize> {
    let mut merged = load_existing(path)?;

    let mut added = 0usize;
    for record in records {
        let value = serde_json::to_value(record)?;
        if !merged.contains(&value) {
            merged.push(value);
            added += 1;
        }
    }

    if added == 0 && path.exists() {
        return Ok(0);
    }

    atomic_write(path, &to_pretty_json(&merged)?)?;
    tracing::debug!("Merged {} new record(s) into {:?}", added, path);
    Ok(added)
}

fn load_existing(path: &Path) -> OutputResult<Vec<Value>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)?;
    if content.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(&content)? {
        Value::Array(items) => Ok(items),
        _ => Err(OutputError::Format(format!(
            "{:?} does not hold a JSON array",
            path
        ))),
    }
}

/// Serializes with four-space indentation
fn to_pretty_json<T: Serialize>(value: &T) -> OutputResult<String> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| OutputError::Format(e.to_string()))
}
