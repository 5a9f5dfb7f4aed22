//! Processing Result Normalization
//!
//! The backend has shipped more than one response shape for `/process/`:
//! statistics appear under either `stats` or `state`, and the replacement
//! counter is named either `replaced_rows` or `replaced_count`. This module
//! decodes any of those shapes into a single [`ProcessingResult`].
//!
//! ## Resolution order
//!
//! 1. Stats source: `stats` if present and non-null, else `state`, else empty.
//!    The chosen source is used as a whole; the two are never merged.
//! 2. `replaced_count`: `replaced_rows` from the source, else `replaced_count`, else 0.
//! 3. `total_rows`, `matched_rows`, `unmatched_rows`: read from the source;
//!    absent, negative, fractional or non-numeric values become 0.
//! 4. `processed_data` must be an array of row objects, otherwise the whole
//!    payload is rejected.
//! 5. `regex_pattern` and `replacement` pass through (absent becomes empty);
//!    `model_used`, `column_name` and `pattern_description` are optional.

use serde_json::Value;
use thiserror::Error;

use crate::types::{cell_text, CanonicalStats, ProcessingResult, Row};

/// Unvalidated JSON returned by the processing endpoint
#[derive(Debug, Clone, PartialEq)]
pub struct RawProcessingPayload(Value);

impl RawProcessingPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for RawProcessingPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizationError {
    #[error("invalid processed data format: {reason}")]
    InvalidProcessedData { reason: String },
}

impl NormalizationError {
    fn invalid(reason: impl Into<String>) -> Self {
        NormalizationError::InvalidProcessedData {
            reason: reason.into(),
        }
    }
}

/// Decode a raw payload into the canonical result. Never panics.
pub fn normalize(payload: &RawProcessingPayload) -> Result<ProcessingResult, NormalizationError> {
    let root = payload.as_value();

    let processed_rows = match present(root, "processed_data") {
        None => return Err(NormalizationError::invalid("processed_data is missing")),
        Some(Value::Array(items)) => rows_from(items)?,
        Some(_) => return Err(NormalizationError::invalid("processed_data is not an array")),
    };

    let source = present(root, "stats")
        .or_else(|| present(root, "state"))
        .and_then(Value::as_object);

    let stats = match source {
        Some(source) => CanonicalStats {
            total_rows: count(source.get("total_rows")),
            matched_rows: count(source.get("matched_rows")),
            replaced_count: count(
                source
                    .get("replaced_rows")
                    .filter(|v| !v.is_null())
                    .or_else(|| source.get("replaced_count")),
            ),
            unmatched_rows: count(source.get("unmatched_rows")),
        },
        None => CanonicalStats::default(),
    };

    Ok(ProcessingResult {
        processed_rows,
        stats,
        regex_pattern: text(root, "regex_pattern").unwrap_or_default(),
        replacement: text(root, "replacement").unwrap_or_default(),
        model_used: text(root, "model_used"),
        column_name: text(root, "column_name"),
        pattern_description: text(root, "pattern_description"),
    })
}

/// Field lookup treating explicit `null` the same as absence
fn present<'a>(root: &'a Value, key: &str) -> Option<&'a Value> {
    root.get(key).filter(|v| !v.is_null())
}

fn rows_from(items: &[Value]) -> Result<Vec<Row>, NormalizationError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            item.as_object()
                .cloned()
                .ok_or_else(|| NormalizationError::invalid(format!("row {} is not an object", index)))
        })
        .collect()
}

/// Non-negative whole numbers only; fractional, negative or out-of-range
/// values count as non-numeric
fn count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f < u64::MAX as f64)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        _ => 0,
    }
}

fn text(root: &Value, key: &str) -> Option<String> {
    present(root, key).map(|v| cell_text(v).into_owned())
}
