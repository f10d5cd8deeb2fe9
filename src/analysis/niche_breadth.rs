//! Generalist / specialist classification.
//!
//! Each taxon's niche breadth on the observed matrix is compared with its
//! breadth across matrices randomized under fixed margins. Taxa broader than
//! the null interval are generalists, narrower ones specialists.

use super::{check_null_settings, classify_taxa};
use crate::data::{ClassificationTable, CommunityMatrix, LabelScheme};
use crate::error::Result;
use crate::null::{NullMethod, SwapGenerator};
use crate::replicate::Runtime;
use crate::statistic::{ColumnStatistic, StatisticEngine};
use serde::{Deserialize, Serialize};

/// Niche breadth index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreadthIndex {
    #[default]
    Levins,
    Shannon,
    /// Number of samples where the taxon occurs.
    Occurrence,
}

impl BreadthIndex {
    pub fn statistic(&self) -> ColumnStatistic {
        match self {
            Self::Levins => ColumnStatistic::Levins,
            Self::Shannon => ColumnStatistic::Shannon,
            Self::Occurrence => ColumnStatistic::Occurrence,
        }
    }
}

/// Configuration for niche breadth classification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NicheBreadthConfig {
    /// Breadth index computed per taxon.
    pub index: BreadthIndex,
    /// Randomization of the community matrix.
    pub null_method: NullMethod,
    /// Number of null matrices.
    pub n_replicates: usize,
    /// Quantile probabilities of the null interval.
    pub probs: (f64, f64),
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for NicheBreadthConfig {
    fn default() -> Self {
        Self {
            index: BreadthIndex::Levins,
            null_method: NullMethod::Quasiswap,
            n_replicates: 1000,
            probs: (0.025, 0.975),
            seed: 42,
        }
    }
}

impl NicheBreadthConfig {
    /// Create a quick configuration for testing (fewer replicates).
    pub fn quick() -> Self {
        Self {
            n_replicates: 100,
            ..Default::default()
        }
    }
}

/// Classify every taxon as generalist, specialist or non-significant.
///
/// The matrix must hold whole-number counts.
pub fn niche_breadth(
    matrix: &CommunityMatrix,
    config: &NicheBreadthConfig,
    runtime: &Runtime<'_>,
) -> Result<ClassificationTable> {
    check_null_settings(config.n_replicates, config.probs)?;
    let generator = SwapGenerator::new(matrix, config.null_method)?;
    let engine = StatisticEngine::new(config.index.statistic(), matrix, None)?;
    classify_taxa(
        "niche_breadth",
        matrix,
        &generator,
        &engine,
        config.n_replicates,
        config.seed,
        config.probs,
        LabelScheme::NicheBreadth,
        runtime,
    )
}
