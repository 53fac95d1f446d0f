//! Comparative reporting over the raw and cleaned datasets.
//!
//! Summaries and trend fits are computed here; chart rendering is
//! delegated to an external plotting service that consumes the
//! serialized [`charts::ChartSpec`]s.

mod charts;
mod generator;

pub use charts::{AxisRange, ChartKind, ChartSpec, DatasetState, build_charts};
pub use generator::{AnalysisReport, ReportGenerator};

use crate::error::{AnalysisError, Result};
use crate::stats;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Descriptive summary of one column.
///
/// Numeric fields are None for string columns and vice versa.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub dtype: String,
    /// Count of non-missing values.
    pub count: usize,
    pub null_count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub q1: Option<f64>,
    pub median: Option<f64>,
    pub q3: Option<f64>,
    pub max: Option<f64>,
    pub unique_count: Option<usize>,
    pub most_frequent: Option<String>,
}

/// A fitted linear trend of the target against one predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendLine {
    /// Which dataset state the fit came from ("raw" or "cleaned").
    pub label: String,
    pub intercept: f64,
    pub slope: f64,
    /// Number of pairwise non-missing observations used.
    pub n: usize,
}

/// Check if a DataType is numeric (integer or float).
pub(crate) fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Compute per-column descriptive summaries for a dataset.
pub fn summarize(df: &DataFrame) -> Result<Vec<ColumnSummary>> {
    let mut summaries = Vec::with_capacity(df.width());

    for column in df.get_columns() {
        let series = column.as_materialized_series();
        let name = series.name().to_string();
        let dtype = series.dtype().to_string();
        let null_count = series.null_count();
        let count = series.len() - null_count;

        let summary = if is_numeric_dtype(series.dtype()) {
            let values: Vec<f64> = series
                .cast(&DataType::Float64)?
                .f64()?
                .into_iter()
                .flatten()
                .collect();
            ColumnSummary {
                name,
                dtype,
                count,
                null_count,
                mean: stats::mean(&values),
                std: (!values.is_empty()).then(|| stats::std_dev(&values)),
                min: values.iter().copied().reduce(f64::min),
                q1: stats::quantile(&values, 0.25),
                median: stats::median(&values),
                q3: stats::quantile(&values, 0.75),
                max: values.iter().copied().reduce(f64::max),
                unique_count: None,
                most_frequent: None,
            }
        } else if series.dtype() == &DataType::String {
            let ca = series.str()?;
            let mut counts: HashMap<&str, usize> = HashMap::new();
            for value in ca.into_iter().flatten() {
                *counts.entry(value).or_insert(0) += 1;
            }
            let most_frequent = counts
                .iter()
                .max_by(|a, b| a.1.cmp(b.1).then(b.0.cmp(a.0)))
                .map(|(value, _)| value.to_string());
            ColumnSummary {
                name,
                dtype,
                count,
                null_count,
                mean: None,
                std: None,
                min: None,
                q1: None,
                median: None,
                q3: None,
                max: None,
                unique_count: Some(counts.len()),
                most_frequent,
            }
        } else {
            ColumnSummary {
                name,
                dtype,
                count,
                null_count,
                mean: None,
                std: None,
                min: None,
                q1: None,
                median: None,
                q3: None,
                max: None,
                unique_count: None,
                most_frequent: None,
            }
        };

        summaries.push(summary);
    }

    Ok(summaries)
}

/// Fit a simple linear trend of `y` on `x` over pairwise non-missing rows.
///
/// Returns `Ok(None)` when fewer than two pairs remain or the predictor
/// has no variance. Sparse data is a legitimate state here (unmatched
/// join rows carry missing targets), so a degenerate fit is reported as
/// absent rather than as an error.
pub fn fit_trend(df: &DataFrame, x: &str, y: &str, label: &str) -> Result<Option<TrendLine>> {
    let x_series = df
        .column(x)
        .map_err(|_| AnalysisError::ColumnNotFound(x.to_string()))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    let y_series = df
        .column(y)
        .map_err(|_| AnalysisError::ColumnNotFound(y.to_string()))?
        .as_materialized_series()
        .cast(&DataType::Float64)?;

    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (xv, yv) in x_series.f64()?.into_iter().zip(y_series.f64()?.into_iter()) {
        if let (Some(xv), Some(yv)) = (xv, yv) {
            xs.push(xv);
            ys.push(yv);
        }
    }

    Ok(stats::ols_fit(&xs, &ys).map(|(intercept, slope)| TrendLine {
        label: label.to_string(),
        intercept,
        slope,
        n: xs.len(),
    }))
}
