//! Source table loading from a SQLite database file.
//!
//! The connection is opened read-only, scoped to the load phase, and
//! released as soon as the three tables have been materialized into
//! DataFrames. Nothing is ever written back to the source.

use crate::config::PipelineConfig;
use crate::error::{AnalysisError, Result};
use polars::prelude::*;
use rusqlite::{Connection, OpenFlags};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// Declared type of a source column, used to pick the polars dtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// SQLite INTEGER, loaded as Int64.
    Int,
    /// SQLite REAL (INTEGER values are widened), loaded as Float64.
    Float,
    /// SQLite TEXT, loaded as String.
    Text,
}

/// Expected column of a source table.
#[derive(Debug, Clone)]
pub struct ColumnSpec {
    pub name: &'static str,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self { name, kind }
    }
}

/// Expected schema of the beneficiary feature table.
pub const FEATURE_COLUMNS: [ColumnSpec; 7] = [
    ColumnSpec::new("id", ColumnKind::Int),
    ColumnSpec::new("age", ColumnKind::Int),
    ColumnSpec::new("sex", ColumnKind::Text),
    ColumnSpec::new("bmi", ColumnKind::Float),
    ColumnSpec::new("children", ColumnKind::Int),
    ColumnSpec::new("smoker", ColumnKind::Text),
    ColumnSpec::new("region", ColumnKind::Text),
];

/// Expected schema of the identifier link table.
pub const LINK_COLUMNS: [ColumnSpec; 2] = [
    ColumnSpec::new("id1", ColumnKind::Int),
    ColumnSpec::new("id2", ColumnKind::Int),
];

/// Expected schema of the target table.
pub const TARGET_COLUMNS: [ColumnSpec; 2] = [
    ColumnSpec::new("id", ColumnKind::Int),
    ColumnSpec::new("charges", ColumnKind::Float),
];

/// The three record collections produced by the load phase.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub features: DataFrame,
    pub links: DataFrame,
    pub targets: DataFrame,
}

/// Read-only loader over a SQLite database file.
#[derive(Debug)]
pub struct SqliteLoader {
    conn: Connection,
}

impl SqliteLoader {
    /// Open the database read-only.
    ///
    /// Fails with a connection error if the file is missing or unreadable.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| AnalysisError::Connection {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        debug!("Opened database read-only: {}", path.display());
        Ok(Self { conn })
    }

    /// Load the three source tables named in the configuration.
    ///
    /// The loader (and its connection) can be dropped once this returns.
    pub fn load_all(&self, config: &PipelineConfig) -> Result<SourceTables> {
        let features = self.load_table(&config.features_table, &FEATURE_COLUMNS)?;
        let links = self.load_table(&config.links_table, &LINK_COLUMNS)?;
        let targets = self.load_table(&config.targets_table, &TARGET_COLUMNS)?;

        info!(
            "Loaded tables: {} ({} rows), {} ({} rows), {} ({} rows)",
            config.features_table,
            features.height(),
            config.links_table,
            links.height(),
            config.targets_table,
            targets.height()
        );

        Ok(SourceTables {
            features,
            links,
            targets,
        })
    }

    /// Load one table into a DataFrame, verifying the expected columns first.
    pub fn load_table(&self, table: &str, columns: &[ColumnSpec]) -> Result<DataFrame> {
        self.verify_schema(table, columns)?;

        let column_list = columns
            .iter()
            .map(|c| format!("\"{}\"", c.name))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM \"{}\"", column_list, table);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut buffers: Vec<ColumnBuffer> =
            columns.iter().map(|c| ColumnBuffer::new(c.kind)).collect();

        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            for (idx, buffer) in buffers.iter_mut().enumerate() {
                buffer.push(row, idx)?;
            }
        }

        let series: Vec<Column> = columns
            .iter()
            .zip(buffers)
            .map(|(spec, buffer)| buffer.into_series(spec.name).into_column())
            .collect();

        let df = DataFrame::new(series)?;
        debug!("Loaded table '{}': {:?}", table, df.shape());
        Ok(df)
    }

    /// Check the table exists and carries every expected column.
    fn verify_schema(&self, table: &str, columns: &[ColumnSpec]) -> Result<()> {
        let table_exists: bool = self
            .conn
            .prepare("SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1")?
            .exists([table])?;
        if !table_exists {
            return Err(AnalysisError::MissingTable(table.to_string()));
        }

        let mut stmt = self
            .conn
            .prepare("SELECT name FROM pragma_table_info(?1)")?;
        let present: HashSet<String> = stmt
            .query_map([table], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<_, _>>()?;

        for spec in columns {
            if !present.contains(spec.name) {
                return Err(AnalysisError::MissingColumn {
                    table: table.to_string(),
                    column: spec.name.to_string(),
                });
            }
        }

        Ok(())
    }
}

/// Typed accumulator for one column while iterating rows.
enum ColumnBuffer {
    Int(Vec<Option<i64>>),
    Float(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnBuffer {
    fn new(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Int => ColumnBuffer::Int(Vec::new()),
            ColumnKind::Float => ColumnBuffer::Float(Vec::new()),
            ColumnKind::Text => ColumnBuffer::Text(Vec::new()),
        }
    }

    fn push(&mut self, row: &rusqlite::Row<'_>, idx: usize) -> Result<()> {
        match self {
            ColumnBuffer::Int(values) => values.push(row.get(idx)?),
            ColumnBuffer::Float(values) => values.push(row.get(idx)?),
            ColumnBuffer::Text(values) => values.push(row.get(idx)?),
        }
        Ok(())
    }

    fn into_series(self, name: &str) -> Series {
        match self {
            ColumnBuffer::Int(values) => Series::new(name.into(), values),
            ColumnBuffer::Float(values) => Series::new(name.into(), values),
            ColumnBuffer::Text(values) => Series::new(name.into(), values),
        }
    }
}
