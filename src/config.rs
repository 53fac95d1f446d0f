//! Configuration for the analysis pipeline.
//!
//! Uses the builder pattern for flexible setup. Defaults match the
//! insurance dataset this pipeline was written for; every knob can be
//! overridden for other schemas.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Scaling convention for the median absolute deviation.
///
/// The MAD is sometimes multiplied by 1.4826 so it estimates the standard
/// deviation under normality. Both conventions appear in the wild; the
/// convention in use changes the effective outlier bound, so it is fixed
/// here explicitly rather than left implicit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MadScaling {
    /// Raw MAD: median of absolute deviations, no consistency factor.
    #[default]
    Raw,
    /// MAD scaled by 1.4826 (consistent with the normal standard deviation).
    Normal,
}

impl MadScaling {
    /// The multiplicative factor applied to the raw MAD.
    pub fn factor(self) -> f64 {
        match self {
            MadScaling::Raw => 1.0,
            MadScaling::Normal => 1.4826,
        }
    }
}

/// Configuration for the analysis pipeline.
///
/// Use [`PipelineConfig::builder()`] for fluent construction.
///
/// # Example
///
/// ```rust,ignore
/// use claimscope::config::{MadScaling, PipelineConfig};
///
/// let config = PipelineConfig::builder()
///     .mad_multiplier(5.0)
///     .mad_scaling(MadScaling::Raw)
///     .output_dir("./outputs")
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Table holding one row of beneficiary attributes per identifier.
    /// Default: "insurance_feats"
    pub features_table: String,

    /// Table mapping the feature identifier namespace to the target one.
    /// Default: "id_table"
    pub links_table: String,

    /// Table holding the target variable per identifier.
    /// Default: "insurance_targets"
    pub targets_table: String,

    /// Numeric column whose sentinel-coded values are recoded to missing.
    /// Default: "age"
    pub sentinel_column: String,

    /// The sentinel constant representing "missing" in the source data.
    /// Matched by exact equality, never by proximity.
    /// Default: -999.0
    pub sentinel_value: f64,

    /// Numeric column screened for statistical outliers.
    /// Default: "bmi"
    pub outlier_column: String,

    /// Half-width of the inlier bound, in MADs around the median.
    /// Default: 5.0
    pub mad_multiplier: f64,

    /// MAD scaling convention. Default: raw (unscaled).
    pub mad_scaling: MadScaling,

    /// The target variable analyzed against the predictors.
    /// Default: "charges"
    pub target_column: String,

    /// Predictor used for the raw-vs-cleaned trend comparison.
    /// Default: "bmi"
    pub trend_predictor: String,

    /// Fixed list of predictors to chart the target against.
    pub chart_predictors: Vec<String>,

    /// Output directory for the report and cleaned dataset.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// Custom output file name (without extension).
    /// If None, uses "cleaned_insurance".
    pub output_name: Option<String>,

    /// Whether to write the JSON report and cleaned CSV to disk.
    /// When false, results are kept in memory only.
    /// Default: true
    pub save_to_disk: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            features_table: "insurance_feats".to_string(),
            links_table: "id_table".to_string(),
            targets_table: "insurance_targets".to_string(),
            sentinel_column: "age".to_string(),
            sentinel_value: -999.0,
            outlier_column: "bmi".to_string(),
            mad_multiplier: 5.0,
            mad_scaling: MadScaling::default(),
            target_column: "charges".to_string(),
            trend_predictor: "bmi".to_string(),
            chart_predictors: ["age", "sex", "bmi", "children", "smoker", "region"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_dir: PathBuf::from("outputs"),
            output_name: None,
            save_to_disk: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new configuration builder.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if !(self.mad_multiplier > 0.0) {
            return Err(ConfigValidationError::InvalidMadMultiplier(
                self.mad_multiplier,
            ));
        }

        for (field, value) in [
            ("features_table", &self.features_table),
            ("links_table", &self.links_table),
            ("targets_table", &self.targets_table),
            ("sentinel_column", &self.sentinel_column),
            ("outlier_column", &self.outlier_column),
            ("target_column", &self.target_column),
            ("trend_predictor", &self.trend_predictor),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigValidationError::EmptyField(field.to_string()));
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid MAD multiplier: {0} (must be positive)")]
    InvalidMadMultiplier(f64),

    #[error("Configuration field '{0}' must not be empty")]
    EmptyField(String),
}

/// Builder for [`PipelineConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
    features_table: Option<String>,
    links_table: Option<String>,
    targets_table: Option<String>,
    sentinel_column: Option<String>,
    sentinel_value: Option<f64>,
    outlier_column: Option<String>,
    mad_multiplier: Option<f64>,
    mad_scaling: Option<MadScaling>,
    target_column: Option<String>,
    trend_predictor: Option<String>,
    chart_predictors: Option<Vec<String>>,
    output_dir: Option<PathBuf>,
    output_name: Option<String>,
    save_to_disk: Option<bool>,
}

impl PipelineConfigBuilder {
    /// Set the three source table names.
    pub fn tables(
        mut self,
        features: impl Into<String>,
        links: impl Into<String>,
        targets: impl Into<String>,
    ) -> Self {
        self.features_table = Some(features.into());
        self.links_table = Some(links.into());
        self.targets_table = Some(targets.into());
        self
    }

    /// Set the column subject to sentinel recoding.
    pub fn sentinel_column(mut self, column: impl Into<String>) -> Self {
        self.sentinel_column = Some(column.into());
        self
    }

    /// Set the sentinel constant recoded to missing.
    pub fn sentinel_value(mut self, value: f64) -> Self {
        self.sentinel_value = Some(value);
        self
    }

    /// Set the column screened for outliers.
    pub fn outlier_column(mut self, column: impl Into<String>) -> Self {
        self.outlier_column = Some(column.into());
        self
    }

    /// Set the inlier half-width in MADs.
    pub fn mad_multiplier(mut self, k: f64) -> Self {
        self.mad_multiplier = Some(k);
        self
    }

    /// Set the MAD scaling convention.
    pub fn mad_scaling(mut self, scaling: MadScaling) -> Self {
        self.mad_scaling = Some(scaling);
        self
    }

    /// Set the target variable.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.target_column = Some(column.into());
        self
    }

    /// Set the predictor used for the trend comparison.
    pub fn trend_predictor(mut self, column: impl Into<String>) -> Self {
        self.trend_predictor = Some(column.into());
        self
    }

    /// Set the fixed list of predictors to chart against the target.
    pub fn chart_predictors<I, S>(mut self, predictors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chart_predictors = Some(predictors.into_iter().map(Into::into).collect());
        self
    }

    /// Set the output directory for reports and the cleaned dataset.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set a custom output file name (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    /// Enable or disable writing outputs to disk.
    pub fn save_to_disk(mut self, save: bool) -> Self {
        self.save_to_disk = Some(save);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `PipelineConfig` or an error if validation fails.
    pub fn build(self) -> Result<PipelineConfig, ConfigValidationError> {
        let defaults = PipelineConfig::default();
        let config = PipelineConfig {
            features_table: self.features_table.unwrap_or(defaults.features_table),
            links_table: self.links_table.unwrap_or(defaults.links_table),
            targets_table: self.targets_table.unwrap_or(defaults.targets_table),
            sentinel_column: self.sentinel_column.unwrap_or(defaults.sentinel_column),
            sentinel_value: self.sentinel_value.unwrap_or(defaults.sentinel_value),
            outlier_column: self.outlier_column.unwrap_or(defaults.outlier_column),
            mad_multiplier: self.mad_multiplier.unwrap_or(defaults.mad_multiplier),
            mad_scaling: self.mad_scaling.unwrap_or_default(),
            target_column: self.target_column.unwrap_or(defaults.target_column),
            trend_predictor: self.trend_predictor.unwrap_or(defaults.trend_predictor),
            chart_predictors: self.chart_predictors.unwrap_or(defaults.chart_predictors),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            output_name: self.output_name,
            save_to_disk: self.save_to_disk.unwrap_or(true),
        };

        config.validate()?;
        Ok(config)
    }
}
