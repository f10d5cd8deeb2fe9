//! Niche value classification along an environmental variable.
//!
//! The abundance-weighted mean (or the occupied range) of the environment
//! for each taxon is compared with values obtained after shuffling whole
//! sample rows against the environment. Taxa whose observed value lies above
//! the null interval are labelled `HIGHER`, below it `LOWER`.

use super::{check_null_settings, classify_taxa};
use crate::data::{ClassificationTable, CommunityMatrix, EnvironmentVector, LabelScheme};
use crate::error::Result;
use crate::null::RowShuffle;
use crate::replicate::Runtime;
use crate::statistic::{ColumnStatistic, StatisticEngine};
use serde::{Deserialize, Serialize};

/// Per-taxon summary of the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NicheValueStatistic {
    /// Abundance-weighted mean.
    #[default]
    WeightedMean,
    /// Range over samples where the taxon is present.
    NicheRange,
}

impl NicheValueStatistic {
    pub fn statistic(&self) -> ColumnStatistic {
        match self {
            Self::WeightedMean => ColumnStatistic::WeightedMean,
            Self::NicheRange => ColumnStatistic::NicheRange,
        }
    }
}

/// Configuration for niche value classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NicheValueConfig {
    pub statistic: NicheValueStatistic,
    /// Number of row-shuffled matrices.
    pub n_replicates: usize,
    /// Quantile probabilities of the null interval.
    pub probs: (f64, f64),
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for NicheValueConfig {
    fn default() -> Self {
        Self {
            statistic: NicheValueStatistic::WeightedMean,
            n_replicates: 1000,
            probs: (0.025, 0.975),
            seed: 42,
        }
    }
}

impl NicheValueConfig {
    /// Create a quick configuration for testing (fewer replicates).
    pub fn quick() -> Self {
        Self {
            n_replicates: 100,
            ..Default::default()
        }
    }
}

/// Classify every taxon's environmental niche value.
///
/// `environment` is matched to the matrix samples by identifier. Missing
/// environment values are skipped by the weighted mean and make the range
/// undefined for taxa present at those samples.
pub fn niche_value(
    matrix: &CommunityMatrix,
    environment: &EnvironmentVector,
    config: &NicheValueConfig,
    runtime: &Runtime<'_>,
) -> Result<ClassificationTable> {
    check_null_settings(config.n_replicates, config.probs)?;
    let engine = StatisticEngine::new(config.statistic.statistic(), matrix, Some(environment))?;
    let generator = RowShuffle::new(matrix);
    classify_taxa(
        "niche_value",
        matrix,
        &generator,
        &engine,
        config.n_replicates,
        config.seed,
        config.probs,
        LabelScheme::NicheValue,
        runtime,
    )
}
