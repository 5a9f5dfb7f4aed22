// Type definitions shared across the pipeline

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::collections::HashSet;

use crate::controller::ControllerError;
use crate::export::ExportError;
use crate::intake::ValidationError;
use crate::normalize::NormalizationError;
use crate::transport::TransportError;

/// One record of a table, keyed by column name. Key order is preserved as received.
pub type Row = serde_json::Map<String, Value>;

/// Render a cell value as text: null becomes empty, strings are taken verbatim,
/// other scalars use their JSON form and nested values are emitted as JSON text.
/// Whole-valued floats print without a fraction (`25.0` is `25`).
pub fn cell_text(value: &Value) -> Cow<'_, str> {
    match value {
        Value::Null => Cow::Borrowed(""),
        Value::String(s) => Cow::Borrowed(s.as_str()),
        Value::Bool(b) => Cow::Owned(b.to_string()),
        Value::Number(n) => Cow::Owned(number_text(n)),
        other => Cow::Owned(other.to_string()),
    }
}

/// Integral floats below 1e21 print in plain integer form, everything else
/// keeps its JSON form
fn number_text(n: &serde_json::Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.is_finite() && f.fract() == 0.0 && f.abs() < 1e21 => {
            if f == 0.0 {
                "0".to_string()
            } else {
                format!("{:.0}", f)
            }
        }
        _ => n.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DatasetError {
    #[error("dataset has no columns")]
    NoColumns,

    #[error("duplicate column name: {0}")]
    DuplicateColumn(String),

    #[error("row {row} has a value for unknown column '{column}'")]
    UnknownColumn { row: usize, column: String },
}

/// An in-memory table currently loaded in the pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
    /// Name the backend reports for the parsed file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    /// Total row count reported by the backend (the payload may be a preview)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    row_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    column_count: Option<u64>,
}

impl Dataset {
    /// Build a dataset, checking that columns are non-empty and unique and that
    /// every row only uses known columns.
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Result<Self, DatasetError> {
        if columns.is_empty() {
            return Err(DatasetError::NoColumns);
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(DatasetError::DuplicateColumn(column.clone()));
            }
        }

        for (index, row) in rows.iter().enumerate() {
            if let Some(column) = row.keys().find(|key| !seen.contains(key.as_str())) {
                return Err(DatasetError::UnknownColumn {
                    row: index,
                    column: column.clone(),
                });
            }
        }

        Ok(Self {
            columns,
            rows,
            file_name: None,
            row_count: None,
            column_count: None,
        })
    }

    pub fn with_metadata(
        mut self,
        file_name: Option<String>,
        row_count: Option<u64>,
        column_count: Option<u64>,
    ) -> Self {
        self.file_name = file_name;
        self.row_count = row_count;
        self.column_count = column_count;
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    /// Total rows in the source file, falling back to the rows held locally
    pub fn total_rows(&self) -> u64 {
        self.row_count.unwrap_or(self.rows.len() as u64)
    }

    pub fn is_preview(&self) -> bool {
        self.total_rows() > self.rows.len() as u64
    }
}

/// The four counters every processing result is normalized into
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalStats {
    pub total_rows: u64,
    pub matched_rows: u64,
    pub replaced_count: u64,
    pub unmatched_rows: u64,
}

/// Canonical outcome of a processing call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub processed_rows: Vec<Row>,
    pub stats: CanonicalStats,
    pub regex_pattern: String,
    pub replacement: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_description: Option<String>,
}

/// Pipeline state owned by the workflow controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    Idle,
    Uploading,
    DatasetReady,
    Processing,
    ResultReady,
    Failed,
}

impl std::fmt::Display for PipelineState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineState::Idle => write!(f, "idle"),
            PipelineState::Uploading => write!(f, "uploading"),
            PipelineState::DatasetReady => write!(f, "dataset-ready"),
            PipelineState::Processing => write!(f, "processing"),
            PipelineState::ResultReady => write!(f, "result-ready"),
            PipelineState::Failed => write!(f, "failed"),
        }
    }
}

/// Where an error originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Upload,
    Validation,
    Process,
    Normalize,
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Phase::Upload => write!(f, "upload"),
            Phase::Validation => write!(f, "validation"),
            Phase::Process => write!(f, "process"),
            Phase::Normalize => write!(f, "normalize"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub phase: Phase,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(phase: Phase, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            phase,
            occurred_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Normalization(#[from] NormalizationError),

    #[error(transparent)]
    Controller(#[from] ControllerError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error("{0}")]
    Pipeline(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Row {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_dataset_requires_columns() {
        assert_eq!(Dataset::new(vec![], vec![]), Err(DatasetError::NoColumns));
    }

    #[test]
    fn test_dataset_rejects_duplicate_and_unknown_columns() {
        let dup = Dataset::new(vec!["a".into(), "a".into()], vec![]);
        assert_eq!(dup, Err(DatasetError::DuplicateColumn("a".into())));

        let unknown = Dataset::new(
            vec!["email".into()],
            vec![row(json!({"email": "a@b.com"})), row(json!({"phone": "555"}))],
        );
        assert_eq!(
            unknown,
            Err(DatasetError::UnknownColumn { row: 1, column: "phone".into() })
        );
    }

    #[test]
    fn test_dataset_allows_empty_rows_and_sparse_rows() {
        let empty = Dataset::new(vec!["a".into()], vec![]).unwrap();
        assert!(empty.rows().is_empty());

        let sparse = Dataset::new(vec!["a".into(), "b".into()], vec![row(json!({"b": 1}))]).unwrap();
        assert_eq!(sparse.rows().len(), 1);
    }

    #[test]
    fn test_preview_detection() {
        let dataset = Dataset::new(vec!["a".into()], vec![row(json!({"a": 1}))])
            .unwrap()
            .with_metadata(Some("big.csv".into()), Some(250), Some(1));
        assert!(dataset.is_preview());
        assert_eq!(dataset.total_rows(), 250);
        assert_eq!(dataset.file_name(), Some("big.csv"));
    }

    #[test]
    fn test_cell_text() {
        assert_eq!(cell_text(&Value::Null), "");
        assert_eq!(cell_text(&json!("x\"y")), "x\"y");
        assert_eq!(cell_text(&json!(0)), "0");
        assert_eq!(cell_text(&json!(2.5)), "2.5");
        assert_eq!(cell_text(&json!(false)), "false");
        assert_eq!(cell_text(&json!([1, 2])), "[1,2]");
    }

    #[test]
    fn test_whole_floats_print_as_integers() {
        assert_eq!(cell_text(&json!(25.0)), "25");
        assert_eq!(cell_text(&json!(-3.0)), "-3");
        assert_eq!(cell_text(&json!(-0.0)), "0");
        assert_eq!(cell_text(&json!(1e20)), "100000000000000000000");
        assert_eq!(cell_text(&json!(25.5)), "25.5");
        assert_eq!(cell_text(&json!(u64::MAX)), "18446744073709551615");
        assert_eq!(cell_text(&json!(-7)), "-7");
    }
}
