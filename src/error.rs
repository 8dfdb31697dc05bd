use serde::Serialize;
use thiserror::Error;

use crate::types::ReportType;

/// Errors that abort a whole analysis run.
///
/// Row-level failures are not errors: they are collected as [`RowError`]
/// values and the rest of the upload is still processed.
#[derive(Error, Debug)]
pub enum EsgError {
    #[error("Missing required columns for {report_type} report: {}", missing.join(", "))]
    Schema {
        report_type: ReportType,
        missing: Vec<String>,
    },

    #[error("Columns map to the same field: {}", clashes.join("; "))]
    DuplicateColumns { clashes: Vec<String> },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EsgError {
    /// Short machine-readable tag for the presentation layer.
    pub fn kind(&self) -> &'static str {
        match self {
            EsgError::Schema { .. } | EsgError::DuplicateColumns { .. } => "schema",
            EsgError::Configuration(_) => "configuration",
            EsgError::Csv(_) => "csv",
            EsgError::Io(_) => "io",
            EsgError::Json(_) => "json",
        }
    }
}

pub type EsgResult<T> = Result<T, EsgError>;

/// A data row excluded from the run. `row` counts data rows from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowError {
    pub row: usize,
    pub reason: String,
}

/// A row kept in the run with one or more metrics marked not applicable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationWarning {
    pub row: usize,
    pub farm_id: String,
    pub message: String,
}
