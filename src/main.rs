//! CLI entry point for the insurance analysis pipeline.

use anyhow::{Result, anyhow};
use claimscope::{AnalysisReport, MadScaling, Pipeline, PipelineConfig, PipelineRun};
use clap::Parser;
use std::path::Path;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Exploratory analysis of relational insurance data",
    long_about = "Loads the insurance feature, link, and target tables from a SQLite\n\
                  database, joins them into one dataset, cleans sentinel and outlier\n\
                  values, and writes a JSON analysis report plus the cleaned CSV.\n\n\
                  EXAMPLES:\n  \
                  # Basic usage\n  \
                  claimscope -i insurance.db\n\n  \
                  # Custom output location and outlier sensitivity\n  \
                  claimscope -i insurance.db -o results/ --mad-multiplier 3.5\n\n  \
                  # Machine-readable output\n  \
                  claimscope -i insurance.db --json | jq .trend_cleaned.slope"
)]
struct Args {
    /// Path to the SQLite database to analyze
    #[arg(short, long)]
    input: String,

    /// Output directory for results
    #[arg(short, long, default_value = "./outputs")]
    output: String,

    /// Custom name for the cleaned CSV (without extension)
    ///
    /// If not specified, uses "cleaned_insurance"
    #[arg(long)]
    output_name: Option<String>,

    /// Column carrying the sentinel code for unknown values
    #[arg(long, default_value = "age")]
    sentinel_column: String,

    /// Sentinel value recoded to missing (exact match)
    #[arg(long, default_value = "-999", allow_hyphen_values = true)]
    sentinel: f64,

    /// Column screened for outliers
    #[arg(long, default_value = "bmi")]
    outlier_column: String,

    /// Width of the outlier interval in MAD units around the median
    #[arg(long, default_value = "5.0")]
    mad_multiplier: f64,

    /// Scale the MAD by 1.4826 for consistency with the standard deviation
    #[arg(long)]
    scaled_mad: bool,

    /// Predictor column for the charges trend fit
    #[arg(long, default_value = "bmi")]
    trend_predictor: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Suppress progress output (only show errors and final result)
    #[arg(short, long)]
    quiet: bool,

    /// Output the JSON report to stdout instead of a human-readable summary
    ///
    /// Disables all progress logs; only the report is written to stdout.
    #[arg(long)]
    json: bool,

    /// Skip writing the report and cleaned CSV to disk
    #[arg(long)]
    no_save: bool,
}

/// Initialize the tracing subscriber for logging.
///
/// When `json_output` is true, logging is completely disabled so stdout
/// only carries the JSON report.
fn init_logging(level: &str, quiet: bool, json_output: bool) {
    if json_output {
        return;
    }

    use tracing_subscriber::EnvFilter;

    let effective_level = if quiet { "warn" } else { level };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(effective_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level, args.quiet, args.json);

    if !Path::new(&args.input).exists() {
        return Err(anyhow!("Input file not found: {}", args.input));
    }

    let mut config_builder = PipelineConfig::builder()
        .sentinel_column(&args.sentinel_column)
        .sentinel_value(args.sentinel)
        .outlier_column(&args.outlier_column)
        .mad_multiplier(args.mad_multiplier)
        .trend_predictor(&args.trend_predictor)
        .output_dir(&args.output)
        .save_to_disk(!args.no_save);

    if args.scaled_mad {
        config_builder = config_builder.mad_scaling(MadScaling::Normal);
    }

    if let Some(ref name) = args.output_name {
        config_builder = config_builder.output_name(name);
    }

    let config = config_builder.build()?;
    let pipeline = Pipeline::builder().config(config).build()?;

    info!("{}", "=".repeat(80));
    info!("Starting insurance analysis pipeline...");
    info!("{}", "=".repeat(80));

    match pipeline.process_file(&args.input) {
        Ok(run) => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&run.report)?);
            } else {
                print_human_readable_summary(&run, &args);
            }
            Ok(())
        }
        Err(e) => {
            error!("Pipeline failed: {}", e);
            Err(anyhow!("Pipeline failed: {}", e))
        }
    }
}

/// Print a human-readable summary of the analysis.
///
/// Uses `println!` intentionally: this is the primary CLI output and should
/// be visible regardless of log level settings.
fn print_human_readable_summary(run: &PipelineRun, args: &Args) {
    let report: &AnalysisReport = &run.report;
    let summary = &run.data.summary;

    println!();
    println!("{}", "=".repeat(80));
    println!("ANALYSIS COMPLETE");
    println!("{}", "=".repeat(80));
    println!();

    println!(
        "Input:  {} ({} rows x {} columns)",
        report.source, report.shape.0, report.shape.1
    );
    if run.written.is_empty() {
        println!("Output: (not saved, --no-save)");
    } else {
        for path in &run.written {
            println!("Output: {}", path.display());
        }
    }
    println!();

    println!("Sanitization:");
    println!(
        "  Sentinel '{}' = {}: {} values recoded to missing",
        summary.sentinel_column, summary.sentinel_value, summary.sentinel_recoded
    );
    println!(
        "  Outliers in '{}' outside [{:.2}, {:.2}]: {} flagged",
        summary.outlier_column, summary.inlier_low, summary.inlier_high, summary.outliers_flagged
    );
    println!();

    println!("Charges trend vs '{}':", args.trend_predictor);
    for (name, trend) in [("raw", &report.trend_raw), ("cleaned", &report.trend_cleaned)] {
        match trend {
            Some(t) => println!(
                "  {:<8} slope {:>10.4}  intercept {:>10.2}  (n={})",
                format!("{}:", name),
                t.slope,
                t.intercept,
                t.n
            ),
            None => println!(
                "  {:<8} not fitted (too few paired observations)",
                format!("{}:", name)
            ),
        }
    }
    println!();

    println!("Charts specified: {}", report.charts.len());
    println!("Duration: {}ms", run.duration_ms);
    println!();

    println!("Use --json for machine-readable output");
    println!("{}", "=".repeat(80));
}
