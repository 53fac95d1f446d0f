//! Error types for the analysis pipeline.
//!
//! A single `thiserror` hierarchy covers every stage. Errors surface
//! immediately to the caller; there is no retry or recovery logic anywhere
//! in the pipeline.
//!
//! Errors serialize as `{ code, message }` so downstream tooling can switch
//! on the code without parsing messages.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The database backend could not be opened.
    #[error("Cannot open database '{path}': {reason}")]
    Connection { path: String, reason: String },

    /// An expected table is absent from the database.
    #[error("Table '{0}' not found in database")]
    MissingTable(String),

    /// An expected column is absent from a table.
    #[error("Column '{column}' missing from table '{table}'")]
    MissingColumn { table: String, column: String },

    /// Column was not found in the assembled dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A robust statistic was requested over a column with no valid values.
    #[error("Cannot compute robust statistics for '{column}': no non-missing values")]
    InsufficientData { column: String },

    /// The link table maps the same left identifier more than once, which
    /// would multiply rows through the left join.
    #[error("Link table contains {count} duplicate id1 values")]
    DuplicateLinks { count: usize },

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Report generation failed.
    #[error("Failed to generate report: {0}")]
    ReportFailed(String),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite driver error wrapper.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for machine consumption.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "CONNECTION_ERROR",
            Self::MissingTable(_) | Self::MissingColumn { .. } => "SCHEMA_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InsufficientData { .. } => "INSUFFICIENT_DATA",
            Self::DuplicateLinks { .. } => "DUPLICATE_LINKS",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::ReportFailed(_) => "REPORT_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Sqlite(_) => "SQLITE_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check whether this error (or its root cause) is a schema mismatch.
    pub fn is_schema_error(&self) -> bool {
        self.error_code() == "SCHEMA_ERROR"
    }
}

/// Serialize errors as a `{ code, message }` struct.
impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for pipeline operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, rusqlite::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Sqlite(e).with_context(context))
    }
}
