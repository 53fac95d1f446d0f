//! Corrective passes over the assembled dataset.
//!
//! Two independent corrections are applied: sentinel-coded values are
//! recoded to missing (exact match only), and statistical outliers are
//! flagged as missing using a median/MAD bound. Mean and standard
//! deviation are themselves distorted by outliers, so the bound's own
//! parameters come from outlier-resistant estimators.
//!
//! The pre-sanitization dataset is preserved alongside the cleaned one;
//! the reporter needs both states for comparison.

use crate::config::{MadScaling, PipelineConfig};
use crate::error::{AnalysisError, Result};
use crate::stats;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// What the sanitizer did, for the report and the terminal summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SanitizationSummary {
    pub sentinel_column: String,
    pub sentinel_value: f64,
    /// Number of sentinel-coded values recoded to missing.
    pub sentinel_recoded: usize,
    pub outlier_column: String,
    /// Inlier bound [median - k*MAD, median + k*MAD].
    pub inlier_low: f64,
    pub inlier_high: f64,
    /// Number of values flagged missing for falling outside the bound.
    pub outliers_flagged: usize,
    /// Human-readable log of every correction applied.
    pub actions: Vec<String>,
}

/// Raw and cleaned datasets, produced together by one sanitization run.
#[derive(Debug, Clone)]
pub struct SanitizedData {
    /// The dataset exactly as assembled, untouched.
    pub raw: DataFrame,
    /// The dataset with sentinels and outliers recoded to missing.
    pub cleaned: DataFrame,
    pub summary: SanitizationSummary,
}

/// Applies the two corrective passes.
pub struct Sanitizer;

impl Sanitizer {
    /// Run both passes, keeping an unmodified copy of the input.
    ///
    /// The outlier bound is recomputed from whatever values are present,
    /// so re-running on already-cleaned output is a no-op as long as the
    /// surviving values fall inside their own recomputed bound. That holds
    /// for the sentinel-and-spike contamination this pipeline targets; a
    /// heavy-tailed column can tighten the bound after removal and lose
    /// further values on a rerun (see `flag_outliers`).
    pub fn sanitize(df: DataFrame, config: &PipelineConfig) -> Result<SanitizedData> {
        let raw = df.clone();
        let mut cleaned = df;
        let mut actions = Vec::new();

        let sentinel_recoded = Self::recode_sentinel(
            &mut cleaned,
            &config.sentinel_column,
            config.sentinel_value,
        )?;
        if sentinel_recoded > 0 {
            actions.push(format!(
                "Recoded {} sentinel values ({}) in '{}' to missing",
                sentinel_recoded, config.sentinel_value, config.sentinel_column
            ));
        }
        debug!(
            "Sentinel pass on '{}': {} values recoded",
            config.sentinel_column, sentinel_recoded
        );

        let (inlier_low, inlier_high, outliers_flagged) = Self::flag_outliers(
            &mut cleaned,
            &config.outlier_column,
            config.mad_multiplier,
            config.mad_scaling,
        )?;
        if outliers_flagged > 0 {
            actions.push(format!(
                "Flagged {} outliers in '{}' outside [{:.4}, {:.4}] as missing",
                outliers_flagged, config.outlier_column, inlier_low, inlier_high
            ));
        }
        info!(
            "Outlier pass on '{}': bound [{:.4}, {:.4}], {} values flagged",
            config.outlier_column, inlier_low, inlier_high, outliers_flagged
        );

        Ok(SanitizedData {
            raw,
            cleaned,
            summary: SanitizationSummary {
                sentinel_column: config.sentinel_column.clone(),
                sentinel_value: config.sentinel_value,
                sentinel_recoded,
                outlier_column: config.outlier_column.clone(),
                inlier_low,
                inlier_high,
                outliers_flagged,
                actions,
            },
        })
    }

    /// Replace values exactly equal to the sentinel with missing.
    ///
    /// This is an equality substitution, not a range check: values merely
    /// close to the sentinel are left untouched. Returns the number of
    /// values recoded. The column keeps its dtype.
    pub fn recode_sentinel(df: &mut DataFrame, column: &str, sentinel: f64) -> Result<usize> {
        let series = df
            .column(column)
            .map_err(|_| AnalysisError::ColumnNotFound(column.to_string()))?
            .as_materialized_series()
            .clone();

        let (recoded, count) = match series.dtype() {
            DataType::Int64 => {
                let ca = series.i64()?;
                let count = ca
                    .into_iter()
                    .filter(|v| v.is_some_and(|x| x as f64 == sentinel))
                    .count();
                let cleaned = ca.apply(|v| v.filter(|&x| x as f64 != sentinel));
                (cleaned.into_series(), count)
            }
            DataType::Float64 => {
                let ca = series.f64()?;
                let count = ca
                    .into_iter()
                    .filter(|v| v.is_some_and(|x| x == sentinel))
                    .count();
                let cleaned = ca.apply(|v| v.filter(|&x| x != sentinel));
                (cleaned.into_series(), count)
            }
            other => {
                return Err(AnalysisError::InvalidConfig(format!(
                    "sentinel column '{}' has non-numeric dtype {}",
                    column, other
                )));
            }
        };

        if count > 0 {
            df.replace(column, recoded)?;
        }
        Ok(count)
    }

    /// Compute the inlier bound [med - k*s, med + k*s] from the non-missing
    /// values of a series, where `med` is the median and `s` the MAD under
    /// the configured scaling convention.
    ///
    /// Fails with an insufficient-data error when every value is missing:
    /// median and MAD are undefined, and silently producing no bound would
    /// hide the problem from the operator.
    pub fn robust_bound(series: &Series, k: f64, scaling: MadScaling) -> Result<(f64, f64)> {
        let float_series = series.cast(&DataType::Float64)?;
        let values: Vec<f64> = float_series.f64()?.into_iter().flatten().collect();

        let Some(med) = stats::median(&values) else {
            return Err(AnalysisError::InsufficientData {
                column: series.name().to_string(),
            });
        };
        // values is non-empty here, so the MAD is defined too
        let s = stats::mad(&values).unwrap_or(0.0) * scaling.factor();

        Ok((med - k * s, med + k * s))
    }

    /// Flag values strictly outside the robust inlier bound as missing.
    ///
    /// A zero MAD collapses the bound to the median itself; every value
    /// not exactly equal to it is then flagged. That is the accepted
    /// outcome, not a special case.
    ///
    /// The bound always comes from the values currently present. Removing
    /// a heavy tail shifts the median and MAD, so applying the pass again
    /// can flag values the first pass kept.
    ///
    /// Returns (low, high, flagged count). The column is left as Float64.
    pub fn flag_outliers(
        df: &mut DataFrame,
        column: &str,
        k: f64,
        scaling: MadScaling,
    ) -> Result<(f64, f64, usize)> {
        let series = df
            .column(column)
            .map_err(|_| AnalysisError::ColumnNotFound(column.to_string()))?
            .as_materialized_series()
            .clone();

        let (low, high) = Self::robust_bound(&series, k, scaling)?;

        let float_series = series.cast(&DataType::Float64)?;
        let ca = float_series.f64()?;
        let flagged = ca
            .into_iter()
            .filter(|v| v.is_some_and(|x| x < low || x > high))
            .count();

        let cleaned = ca.apply(|v| v.filter(|&x| x >= low && x <= high));
        df.replace(column, cleaned.into_series())?;

        Ok((low, high, flagged))
    }
}
