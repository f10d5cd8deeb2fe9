//! Temporal seasonality classification.
//!
//! Rows of the matrix are read as consecutive time points. A taxon's
//! seasonality index is the summed absolute autocorrelation over lags
//! `1..=lag_max`; shuffling the time order destroys any autocorrelation
//! structure, giving the null distribution.

use super::{check_null_settings, classify_taxa};
use crate::data::{ClassificationTable, CommunityMatrix, LabelScheme};
use crate::error::{NullError, Result};
use crate::null::RowShuffle;
use crate::replicate::Runtime;
use crate::statistic::{ColumnStatistic, StatisticEngine};
use serde::{Deserialize, Serialize};

/// Configuration for seasonality classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeasonalityConfig {
    /// Largest autocorrelation lag; `floor(10 log10(n))` when unset.
    pub lag_max: Option<usize>,
    /// Number of time-shuffled matrices.
    pub n_replicates: usize,
    /// Quantile probabilities of the null interval.
    pub probs: (f64, f64),
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for SeasonalityConfig {
    fn default() -> Self {
        Self {
            lag_max: None,
            n_replicates: 1000,
            probs: (0.025, 0.975),
            seed: 42,
        }
    }
}

impl SeasonalityConfig {
    /// Create a quick configuration for testing (fewer replicates).
    pub fn quick() -> Self {
        Self {
            n_replicates: 100,
            ..Default::default()
        }
    }
}

/// Classify every taxon's time series as more or less seasonal than chance.
pub fn seasonality(
    matrix: &CommunityMatrix,
    config: &SeasonalityConfig,
    runtime: &Runtime<'_>,
) -> Result<ClassificationTable> {
    check_null_settings(config.n_replicates, config.probs)?;
    if matrix.n_samples() < 2 {
        return Err(NullError::EmptyData(
            "seasonality needs a time series of at least 2 samples".to_string(),
        ));
    }
    if config.lag_max == Some(0) {
        return Err(NullError::InvalidParameter("lag_max must be at least 1".to_string()));
    }
    let statistic = ColumnStatistic::Seasonality {
        lag_max: config.lag_max,
    };
    let engine = StatisticEngine::new(statistic, matrix, None)?;
    let generator = RowShuffle::new(matrix);
    classify_taxa(
        "seasonality",
        matrix,
        &generator,
        &engine,
        config.n_replicates,
        config.seed,
        config.probs,
        LabelScheme::Seasonality,
        runtime,
    )
}
