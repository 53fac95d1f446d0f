//! Chart specifications for the external plotting service.
//!
//! Rendering is not done here. Each spec names the columns, the dataset
//! state it should be drawn from, and pre-selected axis ranges. Raw and
//! cleaned variants of the same chart share one range (the combined
//! min/max of both datasets) so the before/after plots are directly
//! comparable.

use super::{TrendLine, is_numeric_dtype};
use crate::config::PipelineConfig;
use crate::error::{AnalysisError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How the external service should draw a chart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    /// Univariate distribution of a numeric column.
    Histogram,
    /// Target against a numeric predictor.
    Scatter,
    /// Target against a categorical predictor.
    Box,
}

/// Which dataset state a chart is drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetState {
    Raw,
    Cleaned,
}

impl DatasetState {
    fn label(self) -> &'static str {
        match self {
            DatasetState::Raw => "raw",
            DatasetState::Cleaned => "cleaned",
        }
    }
}

/// Numeric axis range. Absent for categorical axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub min: f64,
    pub max: f64,
}

/// One chart for the external plotting service to render.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartSpec {
    pub title: String,
    pub kind: ChartKind,
    pub dataset: DatasetState,
    pub x_column: String,
    pub y_column: Option<String>,
    pub x_range: Option<AxisRange>,
    pub y_range: Option<AxisRange>,
    /// Fitted trend lines to overlay (raw and cleaned together on the
    /// trend-comparison chart, empty elsewhere).
    pub trend_lines: Vec<TrendLine>,
}

/// Build the fixed chart set: target distribution before/after, plus one
/// target-vs-predictor chart pair per configured predictor. The trend
/// predictor's charts carry both fitted trend lines for overlay.
pub fn build_charts(
    raw: &DataFrame,
    cleaned: &DataFrame,
    config: &PipelineConfig,
    trends: &[TrendLine],
) -> Result<Vec<ChartSpec>> {
    let target = &config.target_column;
    let target_range = combined_range(raw, cleaned, target)?;

    let mut charts = Vec::new();
    for state in [DatasetState::Raw, DatasetState::Cleaned] {
        charts.push(ChartSpec {
            title: format!("Distribution of {} ({})", target, state.label()),
            kind: ChartKind::Histogram,
            dataset: state,
            x_column: target.clone(),
            y_column: None,
            x_range: target_range,
            y_range: None,
            trend_lines: Vec::new(),
        });
    }

    for predictor in &config.chart_predictors {
        let column = raw
            .column(predictor)
            .map_err(|_| AnalysisError::ColumnNotFound(predictor.clone()))?;

        let numeric = is_numeric_dtype(column.dtype());
        let kind = if numeric {
            ChartKind::Scatter
        } else {
            ChartKind::Box
        };
        let x_range = if numeric {
            combined_range(raw, cleaned, predictor)?
        } else {
            None
        };
        let overlay = if predictor == &config.trend_predictor {
            trends.to_vec()
        } else {
            Vec::new()
        };

        for state in [DatasetState::Raw, DatasetState::Cleaned] {
            charts.push(ChartSpec {
                title: format!("{} vs {} ({})", target, predictor, state.label()),
                kind,
                dataset: state,
                x_column: predictor.clone(),
                y_column: Some(target.clone()),
                x_range,
                y_range: target_range,
                trend_lines: overlay.clone(),
            });
        }
    }

    debug!("Built {} chart specifications", charts.len());
    Ok(charts)
}

/// Combined min/max of a numeric column over both dataset states, so that
/// raw and cleaned charts share one axis.
fn combined_range(raw: &DataFrame, cleaned: &DataFrame, column: &str) -> Result<Option<AxisRange>> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;

    for df in [raw, cleaned] {
        let series = df
            .column(column)
            .map_err(|_| AnalysisError::ColumnNotFound(column.to_string()))?
            .as_materialized_series()
            .cast(&DataType::Float64)?;
        for value in series.f64()?.into_iter().flatten() {
            min = min.min(value);
            max = max.max(value);
        }
    }

    if min.is_finite() && max.is_finite() {
        Ok(Some(AxisRange { min, max }))
    } else {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_frames() -> (DataFrame, DataFrame, PipelineConfig) {
        let raw = df![
            "age" => [30i64, 40, 50],
            "sex" => ["female", "male", "male"],
            "bmi" => [Some(20.0f64), Some(25.0), Some(1000.0)],
            "children" => [0i64, 1, 2],
            "smoker" => ["no", "yes", "no"],
            "region" => ["southwest", "northeast", "southeast"],
            "charges" => [1000.0f64, 2000.0, 3000.0],
        ]
        .unwrap();
        let mut cleaned = raw.clone();
        cleaned
            .replace(
                "bmi",
                Series::new("bmi".into(), vec![Some(20.0f64), Some(25.0), None]),
            )
            .unwrap();
        (raw, cleaned, PipelineConfig::default())
    }

    #[test]
    fn test_chart_set_covers_target_and_all_predictors() {
        let (raw, cleaned, config) = sample_frames();
        let charts = build_charts(&raw, &cleaned, &config, &[]).unwrap();

        // 2 target histograms + 2 per predictor
        assert_eq!(charts.len(), 2 + 2 * config.chart_predictors.len());
        assert!(
            charts
                .iter()
                .any(|c| c.kind == ChartKind::Histogram && c.dataset == DatasetState::Raw)
        );
    }

    #[test]
    fn test_raw_and_cleaned_charts_share_axis_ranges() {
        let (raw, cleaned, config) = sample_frames();
        let charts = build_charts(&raw, &cleaned, &config, &[]).unwrap();

        let bmi_charts: Vec<&ChartSpec> =
            charts.iter().filter(|c| c.x_column == "bmi").collect();
        assert_eq!(bmi_charts.len(), 2);
        // Range spans the raw outlier even on the cleaned chart.
        for chart in &bmi_charts {
            let range = chart.x_range.unwrap();
            assert_eq!(range.min, 20.0);
            assert_eq!(range.max, 1000.0);
        }
    }

    #[test]
    fn test_categorical_predictor_gets_box_chart_without_range() {
        let (raw, cleaned, config) = sample_frames();
        let charts = build_charts(&raw, &cleaned, &config, &[]).unwrap();

        let smoker = charts.iter().find(|c| c.x_column == "smoker").unwrap();
        assert_eq!(smoker.kind, ChartKind::Box);
        assert!(smoker.x_range.is_none());
        assert!(smoker.y_range.is_some());
    }

    #[test]
    fn test_trend_lines_attached_to_trend_predictor_only() {
        let (raw, cleaned, config) = sample_frames();
        let trends = vec![
            TrendLine {
                label: "raw".to_string(),
                intercept: 1.0,
                slope: 2.0,
                n: 3,
            },
            TrendLine {
                label: "cleaned".to_string(),
                intercept: 1.1,
                slope: 1.9,
                n: 2,
            },
        ];
        let charts = build_charts(&raw, &cleaned, &config, &trends).unwrap();

        for chart in &charts {
            if chart.x_column == config.trend_predictor && chart.y_column.is_some() {
                assert_eq!(chart.trend_lines.len(), 2);
            } else {
                assert!(chart.trend_lines.is_empty());
            }
        }
    }

    #[test]
    fn test_unknown_predictor_is_an_error() {
        let (raw, cleaned, _) = sample_frames();
        let config = PipelineConfig::builder()
            .chart_predictors(["no_such_column"])
            .build()
            .unwrap();

        let err = build_charts(&raw, &cleaned, &config, &[]).unwrap_err();
        assert!(matches!(err, AnalysisError::ColumnNotFound(_)));
    }
}
