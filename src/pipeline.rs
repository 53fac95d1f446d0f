//! The analysis pipeline.
//!
//! Orchestrates the four stages in order: load the source tables, assemble
//! them into one dataset, sanitize, and report. Stages run sequentially on
//! the calling thread and each stage receives the previous stage's output
//! by value; any stage error propagates immediately.

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::joiner::TableJoiner;
use crate::loader::{SourceTables, SqliteLoader};
use crate::reporter::{AnalysisReport, ReportGenerator};
use crate::sanitizer::{SanitizedData, Sanitizer};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Everything a pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// Raw and cleaned datasets plus the sanitization summary.
    pub data: SanitizedData,
    /// The assembled analysis report.
    pub report: AnalysisReport,
    /// Paths written to disk, empty when saving is disabled.
    pub written: Vec<PathBuf>,
    /// Wall-clock duration of the run in milliseconds.
    pub duration_ms: u64,
}

/// The insurance analysis pipeline.
///
/// Use [`Pipeline::builder()`] to create a pipeline with custom
/// configuration.
///
/// # Example
///
/// ```rust,ignore
/// use claimscope::{Pipeline, PipelineConfig};
///
/// let run = Pipeline::builder()
///     .config(PipelineConfig::builder().mad_multiplier(5.0).build()?)
///     .build()?
///     .process_file("insurance.db")?;
///
/// println!("{} rows cleaned", run.data.cleaned.height());
/// ```
pub struct Pipeline {
    config: PipelineConfig,
    generator: ReportGenerator,
}

// Pipeline may be handed to a worker thread by callers.
static_assertions::assert_impl_all!(Pipeline: Send);

impl Pipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Run the full pipeline against a database file.
    pub fn process_file(&self, path: impl AsRef<Path>) -> Result<PipelineRun> {
        let path = path.as_ref();
        info!("Step 1: Loading tables from {}", path.display());
        let loader = SqliteLoader::open(path)?;
        let tables = loader.load_all(&self.config)?;
        self.process_tables(tables, &path.display().to_string())
    }

    /// Run the join, sanitize, and report stages on already-loaded tables.
    pub fn process_tables(&self, tables: SourceTables, source: &str) -> Result<PipelineRun> {
        let start = Instant::now();

        info!("Step 2: Assembling dataset...");
        let assembled = TableJoiner::assemble(tables)?;
        debug!(
            "Assembled shape: {:?}",
            (assembled.height(), assembled.width())
        );

        info!("Step 3: Sanitizing...");
        let data = Sanitizer::sanitize(assembled, &self.config)?;
        debug!(
            "Sentinels recoded: {}, outliers flagged: {}",
            data.summary.sentinel_recoded, data.summary.outliers_flagged
        );

        info!("Step 4: Generating report...");
        let report = self.generator.build_report(source, &data, &self.config)?;

        let mut written = Vec::new();
        if self.config.save_to_disk {
            written.push(self.generator.write_report(&report)?);
            written.push(self.generator.write_cleaned_csv(&data.cleaned)?);
        } else {
            debug!("Saving disabled, keeping outputs in memory");
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        info!("Pipeline completed in {} ms", duration_ms);

        Ok(PipelineRun {
            data,
            report,
            written,
            duration_ms,
        })
    }

    /// The configuration the pipeline was built with.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}

/// Builder for creating a [`Pipeline`] instance.
#[derive(Default)]
pub struct PipelineBuilder {
    config: Option<PipelineConfig>,
}

static_assertions::assert_impl_all!(PipelineBuilder: Send);

impl PipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<Pipeline, crate::config::ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let generator = ReportGenerator::new(config.output_dir.clone(), config.output_name.clone());

        Ok(Pipeline { config, generator })
    }
}
