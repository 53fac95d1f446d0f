//! Integration tests for the insurance analysis pipeline.
//!
//! These tests run the pipeline end-to-end against SQLite fixtures built
//! on the fly in a temporary directory.

use claimscope::{AnalysisError, Pipeline, PipelineConfig, PipelineRun};
use polars::prelude::*;
use rusqlite::Connection;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

const SCHEMA: &str = "
    CREATE TABLE insurance_feats (
        id INTEGER, age INTEGER, sex TEXT, bmi REAL,
        children INTEGER, smoker TEXT, region TEXT
    );
    CREATE TABLE id_table (id1 INTEGER, id2 INTEGER);
    CREATE TABLE insurance_targets (id INTEGER, charges REAL);
";

fn write_db(dir: &TempDir, name: &str, inserts: &str) -> PathBuf {
    let path = dir.path().join(name);
    let conn = Connection::open(&path).expect("Failed to create fixture database");
    conn.execute_batch(&format!("{SCHEMA}{inserts}"))
        .expect("Failed to populate fixture database");
    path
}

/// Six beneficiaries with one sentinel age and one extreme bmi, all linked.
fn reference_db(dir: &TempDir) -> PathBuf {
    write_db(
        dir,
        "reference.db",
        "INSERT INTO insurance_feats VALUES
             (1, 25,   'female', 20.0,   0, 'no',  'southwest'),
             (2, -999, 'male',   22.0,   1, 'no',  'southeast'),
             (3, 31,   'male',   21.0,   2, 'yes', 'northwest'),
             (4, 47,   'female', 19.0,   0, 'no',  'northeast'),
             (5, 52,   'female', 23.0,   3, 'no',  'southwest'),
             (6, 38,   'male',   1000.0, 1, 'yes', 'southeast');
         INSERT INTO id_table VALUES
             (1, 101), (2, 102), (3, 103), (4, 104), (5, 105), (6, 106);
         INSERT INTO insurance_targets VALUES
             (101, 2400.0), (102, 3100.0), (103, 15800.0),
             (104, 8900.0), (105, 11200.0), (106, 41000.0);",
    )
}

fn run_in_memory(path: &PathBuf) -> claimscope::Result<PipelineRun> {
    let config = PipelineConfig::builder()
        .save_to_disk(false)
        .build()
        .unwrap();
    Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process_file(path)
}

fn f64_values(df: &DataFrame, column: &str) -> Vec<Option<f64>> {
    df.column(column)
        .unwrap()
        .as_materialized_series()
        .cast(&DataType::Float64)
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect()
}

// ============================================================================
// Full Pipeline Tests
// ============================================================================

#[test]
fn test_full_pipeline_reference_database() {
    let dir = TempDir::new().unwrap();
    let path = reference_db(&dir);

    let run = run_in_memory(&path).expect("Pipeline should complete successfully");

    // one output row per feature row, identifier columns gone
    assert_eq!(run.data.raw.height(), 6);
    assert!(run.data.raw.column("id").is_err());
    assert!(run.data.raw.column("id1").is_err());
    assert!(run.data.raw.column("id2").is_err());

    // every linked charge landed on its beneficiary
    let charges = f64_values(&run.data.raw, "charges");
    assert_eq!(charges[0], Some(2400.0));
    assert_eq!(charges[5], Some(41000.0));

    assert_eq!(run.data.summary.sentinel_recoded, 1);
    assert_eq!(run.data.summary.outliers_flagged, 1);
}

#[test]
fn test_sentinel_recoded_by_exact_match_only() {
    let dir = TempDir::new().unwrap();
    let path = write_db(
        &dir,
        "sentinels.db",
        "INSERT INTO insurance_feats VALUES
             (1, -999,  'female', 24.0, 0, 'no', 'southwest'),
             (2, -998,  'male',   25.0, 1, 'no', 'southeast'),
             (3, -1000, 'male',   26.0, 0, 'no', 'northwest'),
             (4, 57,    'female', 23.0, 2, 'no', 'northeast');
         INSERT INTO id_table VALUES (1, 101), (2, 102), (3, 103), (4, 104);
         INSERT INTO insurance_targets VALUES
             (101, 1000.0), (102, 2000.0), (103, 3000.0), (104, 4000.0);",
    );

    let run = run_in_memory(&path).unwrap();

    // only the exact code is recoded; neighbouring negatives pass through
    let ages = f64_values(&run.data.cleaned, "age");
    assert_eq!(ages, vec![None, Some(-998.0), Some(-1000.0), Some(57.0)]);
    assert_eq!(run.data.summary.sentinel_recoded, 1);

    // the raw copy keeps the code verbatim
    let raw_ages = f64_values(&run.data.raw, "age");
    assert_eq!(raw_ages[0], Some(-999.0));
}

#[test]
fn test_extreme_bmi_flagged_and_plausible_values_kept() {
    let dir = TempDir::new().unwrap();
    let path = reference_db(&dir);

    let run = run_in_memory(&path).unwrap();

    // bmi sample {20, 22, 21, 19, 23, 1000}: median 21.5, MAD 1.5,
    // so the inlier interval is [14, 29] and only 1000 falls outside
    assert_eq!(run.data.summary.inlier_low, 14.0);
    assert_eq!(run.data.summary.inlier_high, 29.0);

    let cleaned_bmi = f64_values(&run.data.cleaned, "bmi");
    assert_eq!(
        cleaned_bmi,
        vec![
            Some(20.0),
            Some(22.0),
            Some(21.0),
            Some(19.0),
            Some(23.0),
            None
        ]
    );

    // the raw copy still carries the extreme value
    let raw_bmi = f64_values(&run.data.raw, "bmi");
    assert_eq!(raw_bmi[5], Some(1000.0));
}

#[test]
fn test_all_missing_outlier_column_is_insufficient_data() {
    let dir = TempDir::new().unwrap();
    let path = write_db(
        &dir,
        "empty_bmi.db",
        "INSERT INTO insurance_feats VALUES
             (1, 25, 'female', NULL, 0, 'no', 'southwest'),
             (2, 31, 'male',   NULL, 1, 'no', 'southeast');
         INSERT INTO id_table VALUES (1, 101), (2, 102);
         INSERT INTO insurance_targets VALUES (101, 1000.0), (102, 2000.0);",
    );

    let err = run_in_memory(&path).unwrap_err();
    assert!(matches!(err, AnalysisError::InsufficientData { ref column } if column == "bmi"));
    assert_eq!(err.error_code(), "INSUFFICIENT_DATA");
}

#[test]
fn test_sanitization_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let path = reference_db(&dir);

    let config = PipelineConfig::builder()
        .save_to_disk(false)
        .build()
        .unwrap();
    let first = run_in_memory(&path).unwrap();

    // a second pass over already-clean data changes nothing
    let second = claimscope::Sanitizer::sanitize(first.data.cleaned.clone(), &config).unwrap();
    assert_eq!(second.summary.sentinel_recoded, 0);
    assert_eq!(second.summary.outliers_flagged, 0);
    assert!(second.cleaned.equals_missing(&first.data.cleaned));
}

#[test]
fn test_two_row_database() {
    let dir = TempDir::new().unwrap();
    let path = write_db(
        &dir,
        "two_rows.db",
        "INSERT INTO insurance_feats VALUES
             (1, -999, 'female', 27.5, 1, 'no',  'southwest'),
             (2, 44,   'male',   31.2, 0, 'yes', 'southeast');
         INSERT INTO id_table VALUES (1, 101), (2, 102);
         INSERT INTO insurance_targets VALUES (101, 4500.0), (102, 38700.0);",
    );

    let run = run_in_memory(&path).unwrap();

    assert_eq!(run.data.raw.height(), 2);
    assert_eq!(run.data.summary.sentinel_recoded, 1);
    // with two bmi values each deviation equals the MAD itself,
    // so neither can fall outside a 5-MAD interval
    assert_eq!(run.data.summary.outliers_flagged, 0);

    let ages = f64_values(&run.data.cleaned, "age");
    assert_eq!(ages, vec![None, Some(44.0)]);
}

// ============================================================================
// Join Behavior
// ============================================================================

#[test]
fn test_unmatched_rows_preserved_with_missing_charges() {
    let dir = TempDir::new().unwrap();
    let path = write_db(
        &dir,
        "unmatched.db",
        "INSERT INTO insurance_feats VALUES
             (1, 25, 'female', 20.0, 0, 'no', 'southwest'),
             (2, 31, 'male',   22.0, 1, 'no', 'southeast'),
             (3, 47, 'male',   21.0, 0, 'no', 'northwest');
         INSERT INTO id_table VALUES (1, 101), (3, 999);
         INSERT INTO insurance_targets VALUES (101, 2400.0);",
    );

    let run = run_in_memory(&path).unwrap();

    // row 2 has no link, row 3 links to a missing target; both survive
    assert_eq!(run.data.raw.height(), 3);
    let charges = f64_values(&run.data.raw, "charges");
    assert_eq!(charges, vec![Some(2400.0), None, None]);

    // a single matched pair cannot pin down a trend line; the run still
    // completes with the fits recorded as absent and no overlay anywhere
    assert!(run.report.trend_raw.is_none());
    assert!(run.report.trend_cleaned.is_none());
    assert!(run.report.charts.iter().all(|c| c.trend_lines.is_empty()));
}

#[test]
fn test_duplicate_links_rejected() {
    let dir = TempDir::new().unwrap();
    let path = write_db(
        &dir,
        "duplicates.db",
        "INSERT INTO insurance_feats VALUES
             (1, 25, 'female', 20.0, 0, 'no', 'southwest');
         INSERT INTO id_table VALUES (1, 101), (1, 102);
         INSERT INTO insurance_targets VALUES (101, 2400.0), (102, 2500.0);",
    );

    let err = run_in_memory(&path).unwrap_err();
    assert!(matches!(err, AnalysisError::DuplicateLinks { count: 1 }));
}

// ============================================================================
// Error Propagation
// ============================================================================

#[test]
fn test_missing_database_is_connection_error() {
    let dir = TempDir::new().unwrap();
    let err = run_in_memory(&dir.path().join("absent.db")).unwrap_err();
    assert!(matches!(err, AnalysisError::Connection { .. }));
    assert_eq!(err.error_code(), "CONNECTION_ERROR");
}

#[test]
fn test_missing_table_is_schema_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.db");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE insurance_feats (
             id INTEGER, age INTEGER, sex TEXT, bmi REAL,
             children INTEGER, smoker TEXT, region TEXT
         );",
    )
    .unwrap();
    drop(conn);

    let err = run_in_memory(&path).unwrap_err();
    assert!(matches!(err, AnalysisError::MissingTable(ref t) if t == "id_table"));
    assert_eq!(err.error_code(), "SCHEMA_ERROR");
}

// ============================================================================
// Report and Outputs
// ============================================================================

#[test]
fn test_report_trends_and_charts() {
    let dir = TempDir::new().unwrap();
    let path = reference_db(&dir);

    let run = run_in_memory(&path).unwrap();
    let report = &run.report;

    assert_eq!(report.shape, (6, 7));
    let trend_raw = report.trend_raw.as_ref().unwrap();
    let trend_cleaned = report.trend_cleaned.as_ref().unwrap();
    assert_eq!(trend_raw.label, "raw");
    assert_eq!(trend_cleaned.label, "cleaned");
    assert_eq!(trend_raw.n, 6);
    assert_eq!(trend_cleaned.n, 5);

    // dropping the extreme point moves the fitted slope
    assert_ne!(trend_raw.slope, trend_cleaned.slope);

    // the trend predictor's charts carry both fits for overlay
    let overlaid: Vec<_> = report
        .charts
        .iter()
        .filter(|c| !c.trend_lines.is_empty())
        .collect();
    assert!(!overlaid.is_empty());
    for chart in overlaid {
        assert_eq!(chart.x_column, "bmi");
        assert_eq!(chart.trend_lines.len(), 2);
    }

    // paired charts share the same axis range across raw and cleaned
    let histograms: Vec<_> = report
        .charts
        .iter()
        .filter(|c| c.x_column == "charges")
        .collect();
    assert_eq!(histograms.len(), 2);
    assert_eq!(histograms[0].x_range, histograms[1].x_range);
}

#[test]
fn test_outputs_written_to_disk() {
    let dir = TempDir::new().unwrap();
    let out = TempDir::new().unwrap();
    let path = reference_db(&dir);

    let config = PipelineConfig::builder()
        .output_dir(out.path())
        .output_name("cleaned_test")
        .build()
        .unwrap();
    let run = Pipeline::builder()
        .config(config)
        .build()
        .unwrap()
        .process_file(&path)
        .unwrap();

    assert_eq!(run.written.len(), 2);
    assert!(out.path().join("analysis_report.json").exists());
    assert!(out.path().join("cleaned_test.csv").exists());

    let json = std::fs::read_to_string(out.path().join("analysis_report.json")).unwrap();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed["sanitization"]["sentinel_recoded"], 1);
    assert!(parsed["charts"].as_array().unwrap().len() >= 2);

    let csv = std::fs::read_to_string(out.path().join("cleaned_test.csv")).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.contains("bmi"));
    assert!(!header.contains("id"));
}
