//! Dataset assembly: two left joins over the identifier columns.
//!
//! The feature table is the left side of both joins, so its row count is
//! preserved end to end. Identifier columns carry no analytical meaning
//! once the merge is done and are dropped from the result.

use crate::error::{AnalysisError, Result};
use crate::loader::SourceTables;
use polars::prelude::*;
use tracing::{debug, info};

/// Assembles the flat analysis dataset from the three source tables.
pub struct TableJoiner;

impl TableJoiner {
    /// Join features → links on (id = id1), then → targets on (id2 = id),
    /// and drop the identifier columns from the result.
    ///
    /// Duplicate `id1` values in the link table are rejected up front:
    /// each duplicate would silently multiply feature rows through the
    /// left join and break the cardinality invariant.
    pub fn assemble(tables: SourceTables) -> Result<DataFrame> {
        Self::reject_duplicate_links(&tables.links)?;

        let expected_rows = tables.features.height();

        // Keep feature-row order through both joins.
        let join_args = JoinArgs {
            how: JoinType::Left,
            maintain_order: MaintainOrderJoin::Left,
            ..Default::default()
        };

        let joined = tables
            .features
            .lazy()
            .join(
                tables.links.lazy(),
                [col("id")],
                [col("id1")],
                join_args.clone(),
            )
            .join(
                tables.targets.lazy(),
                [col("id2")],
                [col("id")],
                join_args,
            )
            .collect()?;

        let joined = joined.drop("id")?.drop("id2")?;
        debug!("Assembled dataset: {:?}", joined.shape());

        if joined.height() != expected_rows {
            return Err(AnalysisError::Internal(format!(
                "left join changed cardinality: {} feature rows became {} joined rows",
                expected_rows,
                joined.height()
            )));
        }

        info!(
            "Assembled {} rows x {} columns",
            joined.height(),
            joined.width()
        );
        Ok(joined)
    }

    fn reject_duplicate_links(links: &DataFrame) -> Result<()> {
        let id1 = links
            .column("id1")
            .map_err(|_| AnalysisError::ColumnNotFound("id1".to_string()))?;
        let unique = id1.as_materialized_series().n_unique()?;
        let duplicates = links.height().saturating_sub(unique);
        if duplicates > 0 {
            return Err(AnalysisError::DuplicateLinks { count: duplicates });
        }
        Ok(())
    }
}
