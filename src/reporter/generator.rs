//! Assembly and persistence of the analysis report.

use super::{ChartSpec, ColumnSummary, TrendLine, build_charts, fit_trend, summarize};
use crate::config::PipelineConfig;
use crate::error::{AnalysisError, Result};
use crate::sanitizer::{SanitizationSummary, SanitizedData};
use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

/// Everything one analysis run produces, minus the datasets themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// Timestamp when the report was generated.
    pub generated_at: String,
    /// Path of the source database.
    pub source: String,
    /// Shape of the assembled dataset (rows, columns).
    pub shape: (usize, usize),
    /// What the sanitizer recoded and flagged.
    pub sanitization: SanitizationSummary,
    /// Per-column summaries before cleaning.
    pub raw_summary: Vec<ColumnSummary>,
    /// Per-column summaries after cleaning.
    pub cleaned_summary: Vec<ColumnSummary>,
    /// Trend of target vs. the configured predictor, fitted on raw data.
    /// Absent when too few paired observations exist for a fit.
    pub trend_raw: Option<TrendLine>,
    /// Same trend fitted on cleaned data.
    pub trend_cleaned: Option<TrendLine>,
    /// Chart specifications for the external plotting service.
    pub charts: Vec<ChartSpec>,
}

/// Builds the report and writes the run's outputs to disk.
pub struct ReportGenerator {
    output_dir: PathBuf,
    output_name: Option<String>,
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("outputs"),
            output_name: None,
        }
    }
}

impl ReportGenerator {
    /// Create a generator with custom output settings.
    pub fn new(output_dir: PathBuf, output_name: Option<String>) -> Self {
        Self {
            output_dir,
            output_name,
        }
    }

    /// Build the full report from the sanitized datasets.
    ///
    /// Both trend fits are computed here so the overlay carries the
    /// raw/cleaned pair together. A fit that cannot be computed (too few
    /// paired observations) is recorded as absent and the chart overlay
    /// simply carries fewer lines.
    pub fn build_report(
        &self,
        source: &str,
        data: &SanitizedData,
        config: &PipelineConfig,
    ) -> Result<AnalysisReport> {
        let raw_summary = summarize(&data.raw)?;
        let cleaned_summary = summarize(&data.cleaned)?;

        let trend_raw = fit_trend(
            &data.raw,
            &config.trend_predictor,
            &config.target_column,
            "raw",
        )?;
        let trend_cleaned = fit_trend(
            &data.cleaned,
            &config.trend_predictor,
            &config.target_column,
            "cleaned",
        )?;

        let trends: Vec<TrendLine> = [trend_raw.clone(), trend_cleaned.clone()]
            .into_iter()
            .flatten()
            .collect();
        let charts = build_charts(&data.raw, &data.cleaned, config, &trends)?;

        Ok(AnalysisReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            source: source.to_string(),
            shape: (data.raw.height(), data.raw.width()),
            sanitization: data.summary.clone(),
            raw_summary,
            cleaned_summary,
            trend_raw,
            trend_cleaned,
            charts,
        })
    }

    /// Write the report as pretty JSON into the output directory.
    pub fn write_report(&self, report: &AnalysisReport) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join("analysis_report.json");
        let mut file = File::create(&path)?;
        file.write_all(serde_json::to_string_pretty(report)?.as_bytes())?;
        info!("Report saved: {}", path.display());
        Ok(path)
    }

    /// Write the cleaned dataset as CSV into the output directory.
    pub fn write_cleaned_csv(&self, cleaned: &DataFrame) -> Result<PathBuf> {
        let file_name = self
            .output_name
            .clone()
            .unwrap_or_else(|| "cleaned_insurance".to_string());

        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("{}.csv", file_name));
        let mut file = File::create(&path)?;

        let mut df = cleaned.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(b',')
            .finish(&mut df)
            .map_err(|e| AnalysisError::ReportFailed(e.to_string()))?;

        info!("Cleaned dataset saved: {}", path.display());
        Ok(path)
    }
}
