//! Replicate aggregation: many null draws reduced to a statistic matrix.
//!
//! [`build_null_distribution`] pairs a [`NullGenerator`] with a statistic
//! function and collects one statistic vector per replicate into a
//! replicates × columns matrix whose columns keep the caller's identifiers.

pub mod pool;
pub mod runner;

pub use pool::{CancelToken, Execution, WorkerPool};
pub use runner::{replicate_rng, ReplicateRunner, Runtime};

use crate::error::{NullError, Result};
use crate::null::NullGenerator;
use nalgebra::DMatrix;
use tracing::debug;

/// Null statistics: one row per replicate, one column per taxon, window or pair.
#[derive(Debug, Clone)]
pub struct NullReplicateSet {
    column_ids: Vec<String>,
    values: DMatrix<f64>,
}

impl NullReplicateSet {
    /// Assemble from per-replicate rows; every row must have one value per column.
    pub fn from_replicates(column_ids: Vec<String>, replicates: Vec<Vec<f64>>) -> Result<Self> {
        let n_cols = column_ids.len();
        for row in &replicates {
            if row.len() != n_cols {
                return Err(NullError::dimension("replicate statistic", n_cols, row.len()));
            }
        }
        let values = DMatrix::from_row_iterator(
            replicates.len(),
            n_cols,
            replicates.into_iter().flatten(),
        );
        Ok(Self { column_ids, values })
    }

    pub fn column_ids(&self) -> &[String] {
        &self.column_ids
    }

    pub fn n_replicates(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_columns(&self) -> usize {
        self.values.ncols()
    }

    /// All replicate values for one column.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.values.column(col).iter().copied().collect()
    }

    pub fn values(&self) -> &DMatrix<f64> {
        &self.values
    }
}

/// Draw `runner.n_replicates()` randomized datasets and reduce each with
/// `statistic`.
///
/// A generator failure on replicate `i` is reported as
/// [`NullError::ReplicateGeneration`]; statistic errors propagate unchanged.
/// Either way the whole run is discarded.
pub fn build_null_distribution<G, F>(
    generator: &G,
    statistic: F,
    column_ids: &[String],
    runner: &ReplicateRunner<'_>,
) -> Result<NullReplicateSet>
where
    G: NullGenerator,
    F: Fn(&G::Output) -> Result<Vec<f64>> + Sync,
{
    debug!(
        replicates = runner.n_replicates(),
        columns = column_ids.len(),
        "building null distribution"
    );
    let rows = runner.run(|i, rng| {
        let draw = generator
            .generate(rng)
            .map_err(|e| NullError::ReplicateGeneration {
                replicate: i,
                reason: e.to_string(),
            })?;
        statistic(&draw)
    })?;
    NullReplicateSet::from_replicates(column_ids.to_vec(), rows)
}
