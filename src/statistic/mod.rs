//! Per-column statistics over a community matrix.
//!
//! Each statistic reduces one taxon column (plus, for niche values, the
//! environment vector aligned to the samples) to a single number. Output is
//! always one value per taxon in the matrix's column order.

use crate::data::{CommunityMatrix, EnvironmentVector};
use crate::error::{NullError, Result};
use crate::stats::{default_lag_max, levins, seasonality_index, shannon};
use serde::{Deserialize, Serialize};

/// Statistic computed for every taxon column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnStatistic {
    /// Levins' niche breadth over sample proportions.
    Levins,
    /// Shannon niche breadth over sample proportions.
    Shannon,
    /// Number of samples where the taxon is present.
    Occurrence,
    /// Abundance-weighted mean of the environment vector.
    WeightedMean,
    /// Span of the environment vector over samples where the taxon is present.
    NicheRange,
    /// Sum of absolute autocorrelations of the column read in sample order.
    Seasonality {
        /// Largest lag; `floor(10 log10(n))` when unset.
        lag_max: Option<usize>,
    },
}

impl ColumnStatistic {
    /// Whether the statistic reads an environment vector.
    pub fn needs_environment(&self) -> bool {
        matches!(self, Self::WeightedMean | Self::NicheRange)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Levins => "levins",
            Self::Shannon => "shannon",
            Self::Occurrence => "occurrence",
            Self::WeightedMean => "weighted_mean",
            Self::NicheRange => "niche_range",
            Self::Seasonality { .. } => "seasonality",
        }
    }
}

/// A statistic bound to its auxiliary data, reusable across many matrices
/// with the same samples.
#[derive(Debug, Clone)]
pub struct StatisticEngine {
    statistic: ColumnStatistic,
    sample_ids: Vec<String>,
    environment: Option<Vec<f64>>,
}

impl StatisticEngine {
    /// Bind `statistic` to the samples of `matrix`.
    ///
    /// Environment-based statistics require `environment`, which is aligned to
    /// the matrix sample order by identifier.
    pub fn new(
        statistic: ColumnStatistic,
        matrix: &CommunityMatrix,
        environment: Option<&EnvironmentVector>,
    ) -> Result<Self> {
        let environment = if statistic.needs_environment() {
            let env = environment.ok_or_else(|| {
                NullError::InvalidParameter(format!(
                    "Statistic '{}' needs an environment vector",
                    statistic.name()
                ))
            })?;
            Some(env.align_to(matrix.sample_ids())?.values().to_vec())
        } else {
            None
        };
        Ok(Self {
            statistic,
            sample_ids: matrix.sample_ids().to_vec(),
            environment,
        })
    }

    pub fn statistic(&self) -> ColumnStatistic {
        self.statistic
    }

    /// One value per taxon of `matrix`, in column order.
    ///
    /// `matrix` must have the samples the engine was built for, in the same
    /// positions (row-shuffled null matrices keep their sample identifiers).
    pub fn compute(&self, matrix: &CommunityMatrix) -> Result<Vec<f64>> {
        if matrix.sample_ids() != self.sample_ids.as_slice() {
            return Err(NullError::SampleMismatch(
                "matrix samples differ from those the statistic was prepared for".to_string(),
            ));
        }
        let columns = (0..matrix.n_taxa()).map(|j| matrix.column(j));
        let values = match self.statistic {
            ColumnStatistic::Levins => columns.map(|c| levins(&c)).collect(),
            ColumnStatistic::Shannon => columns.map(|c| shannon(&c)).collect(),
            ColumnStatistic::Occurrence => {
                let max = matrix.max_value();
                columns.map(|c| occurrence(&c, max)).collect()
            }
            ColumnStatistic::WeightedMean => {
                let env = self.env()?;
                columns.map(|c| weighted_mean(env, &c)).collect()
            }
            ColumnStatistic::NicheRange => {
                let env = self.env()?;
                columns.map(|c| niche_range(env, &c)).collect()
            }
            ColumnStatistic::Seasonality { lag_max } => {
                let lag = lag_max.unwrap_or_else(|| default_lag_max(matrix.n_samples()));
                columns.map(|c| seasonality_index(&c, lag)).collect()
            }
        };
        Ok(values)
    }

    fn env(&self) -> Result<&[f64]> {
        self.environment
            .as_deref()
            .ok_or_else(|| NullError::InvalidParameter("environment vector not bound".to_string()))
    }
}

/// Compute `statistic` for every column of `matrix`.
pub fn compute_column_stat(
    matrix: &CommunityMatrix,
    statistic: ColumnStatistic,
    environment: Option<&EnvironmentVector>,
) -> Result<Vec<f64>> {
    StatisticEngine::new(statistic, matrix, environment)?.compute(matrix)
}

/// `Σ ceil(x / global_max)`: each present cell counts once.
///
/// The divisor is the maximum of the whole matrix, not of the column. An
/// all-zero matrix has no occurrences.
pub fn occurrence(column: &[f64], global_max: f64) -> f64 {
    if global_max <= 0.0 {
        return 0.0;
    }
    column.iter().map(|&x| (x / global_max).ceil()).sum()
}

/// Abundance-weighted mean of `env`, dropping samples where `env` is missing.
/// NaN when the remaining weights sum to zero.
pub fn weighted_mean(env: &[f64], weights: &[f64]) -> f64 {
    let (num, den) = env
        .iter()
        .zip(weights)
        .filter(|(x, _)| !x.is_nan())
        .fold((0.0, 0.0), |(n, d), (&x, &w)| (n + w * x, d + w));
    if den == 0.0 {
        f64::NAN
    } else {
        num / den
    }
}

/// `max - min` of `env` over samples with positive abundance.
///
/// NaN when the taxon is absent everywhere or an environment value is
/// missing at any sample where it is present.
pub fn niche_range(env: &[f64], abundances: &[f64]) -> f64 {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut any = false;
    for (&x, &a) in env.iter().zip(abundances) {
        if a > 0.0 {
            if x.is_nan() {
                return f64::NAN;
            }
            min = min.min(x);
            max = max.max(x);
            any = true;
        }
    }
    if any {
        (max - min).abs()
    } else {
        f64::NAN
    }
}
