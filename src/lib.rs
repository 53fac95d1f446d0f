//! Insurance Charges Analysis Pipeline
//!
//! An exploratory analysis library for relational insurance data, built with
//! Rust and Polars.
//!
//! # Overview
//!
//! The pipeline runs four sequential stages:
//!
//! - **Loading**: Reads the feature, link, and target tables from a SQLite
//!   database, verifying each table's schema up front
//! - **Assembly**: Left-joins the three tables into one analysis dataset and
//!   drops the identifier columns, preserving one output row per feature row
//! - **Sanitization**: Recodes the `-999` sentinel in `age` to missing and
//!   flags `bmi` values outside the robust median/MAD interval, keeping an
//!   untouched copy of the raw dataset alongside the cleaned one
//! - **Reporting**: Summarizes both datasets, fits a linear charges trend on
//!   each, and emits chart specifications plus a JSON report and cleaned CSV
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use claimscope::{Pipeline, PipelineConfig};
//!
//! let config = PipelineConfig::builder()
//!     .mad_multiplier(5.0)
//!     .output_dir("outputs")
//!     .build()?;
//!
//! let run = Pipeline::builder()
//!     .config(config)
//!     .build()?
//!     .process_file("insurance.db")?;
//!
//! println!("{} sentinel values recoded", run.data.summary.sentinel_recoded);
//! println!("{} outliers flagged", run.data.summary.outliers_flagged);
//! if let Some(trend) = &run.report.trend_cleaned {
//!     println!("cleaned trend slope: {:.2}", trend.slope);
//! }
//! ```
//!
//! # Errors
//!
//! All stages share [`error::AnalysisError`]. Failures fall into three
//! groups: connection problems opening the database, schema mismatches in
//! the source tables, and insufficient data for the robust statistics. An
//! error anywhere aborts the run; nothing is retried.

pub mod config;
pub mod error;
pub mod joiner;
pub mod loader;
pub mod pipeline;
pub mod reporter;
pub mod sanitizer;
pub mod stats;

// Re-exports for convenient access
pub use config::{ConfigValidationError, MadScaling, PipelineConfig, PipelineConfigBuilder};
pub use error::{AnalysisError, Result, ResultExt};
pub use joiner::TableJoiner;
pub use loader::{SourceTables, SqliteLoader};
pub use pipeline::{Pipeline, PipelineBuilder, PipelineRun};
pub use reporter::{
    AnalysisReport, AxisRange, ChartKind, ChartSpec, ColumnSummary, DatasetState, ReportGenerator,
    TrendLine,
};
pub use sanitizer::{SanitizationSummary, SanitizedData, Sanitizer};
