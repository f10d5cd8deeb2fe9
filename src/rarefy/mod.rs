//! Rarefaction: subsampling every sample to a common depth.
//!
//! A single draw picks `depth` individuals from each row without
//! replacement, so row totals become exactly `depth`. Averaging repeats the
//! draw and takes the cell-wise mean, optionally rounded half to even.

use crate::data::CommunityMatrix;
use crate::error::{NullError, Result};
use crate::null::NullGenerator;
use crate::replicate::Runtime;
use nalgebra::DMatrix;
use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Configuration for averaged rarefaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RarefyConfig {
    /// Target depth; the smallest sample total when `None`.
    pub depth: Option<u64>,
    /// Number of rarefied matrices to average.
    pub repetitions: usize,
    /// Round averaged cells to whole numbers.
    pub round: bool,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for RarefyConfig {
    fn default() -> Self {
        Self {
            depth: None,
            repetitions: 100,
            round: true,
            seed: 42,
        }
    }
}

impl RarefyConfig {
    /// Create a quick configuration (fewer repetitions).
    pub fn quick() -> Self {
        Self {
            repetitions: 10,
            ..Default::default()
        }
    }
}

fn sample_totals(matrix: &CommunityMatrix) -> Vec<u64> {
    matrix.row_totals().iter().map(|&t| t as u64).collect()
}

/// Smallest sample total; the default rarefaction depth.
pub fn min_depth(matrix: &CommunityMatrix) -> Result<u64> {
    matrix.require_integral()?;
    sample_totals(matrix)
        .into_iter()
        .min()
        .ok_or_else(|| NullError::EmptyData("community matrix has no samples".to_string()))
}

fn check_depth(matrix: &CommunityMatrix, depth: u64) -> Result<Vec<u64>> {
    matrix.require_integral()?;
    let totals = sample_totals(matrix);
    for (sample, &total) in matrix.sample_ids().iter().zip(&totals) {
        if depth > total {
            return Err(NullError::InvalidDepth {
                sample: sample.clone(),
                total,
                depth,
            });
        }
    }
    Ok(totals)
}

/// One rarefied copy of `matrix` with every row total equal to `depth`.
pub fn rarefy_once<R: Rng + ?Sized>(
    matrix: &CommunityMatrix,
    depth: u64,
    rng: &mut R,
) -> Result<CommunityMatrix> {
    let totals = check_depth(matrix, depth)?;
    Ok(draw(matrix, &totals, depth, rng))
}

fn draw<R: Rng + ?Sized>(
    matrix: &CommunityMatrix,
    totals: &[u64],
    depth: u64,
    rng: &mut R,
) -> CommunityMatrix {
    let n_taxa = matrix.n_taxa();
    let mut out = DMatrix::zeros(matrix.n_samples(), n_taxa);
    let mut cumulative = vec![0u64; n_taxa];
    for (i, &total) in totals.iter().enumerate() {
        let mut acc = 0u64;
        for (j, slot) in cumulative.iter_mut().enumerate() {
            acc += matrix.get(i, j) as u64;
            *slot = acc;
        }
        // Individual k belongs to the first taxon whose cumulative count exceeds k.
        for k in index::sample(rng, total as usize, depth as usize).into_iter() {
            let taxon = cumulative.partition_point(|&c| c <= k as u64);
            out[(i, taxon)] += 1.0;
        }
    }
    matrix.with_data(out)
}

/// Average of `config.repetitions` independent rarefactions.
///
/// Repetition `r` uses the stream `replicate_rng(config.seed, r)`, so one
/// unrounded repetition reproduces a single [`rarefy_once`] draw exactly.
pub fn rarefy_averaged(
    matrix: &CommunityMatrix,
    config: &RarefyConfig,
    runtime: &Runtime<'_>,
) -> Result<CommunityMatrix> {
    if config.repetitions == 0 {
        return Err(NullError::InvalidParameter(
            "Rarefaction needs at least one repetition".to_string(),
        ));
    }
    let depth = match config.depth {
        Some(d) => d,
        None => min_depth(matrix)?,
    };
    let rarefier = Rarefier::new(matrix, depth)?;

    info!(
        samples = matrix.n_samples(),
        taxa = matrix.n_taxa(),
        depth,
        repetitions = config.repetitions,
        "rarefying"
    );

    let draws = runtime
        .runner(config.repetitions, config.seed)
        .run(|_, rng| rarefier.generate(rng))?;

    let mut sum = DMatrix::zeros(matrix.n_samples(), matrix.n_taxa());
    for d in &draws {
        sum += d.data();
    }
    let n = config.repetitions as f64;
    let averaged = sum.map(|v| {
        let mean = v / n;
        if config.round {
            mean.round_ties_even()
        } else {
            mean
        }
    });
    Ok(matrix.with_data(averaged))
}

/// Rarefaction as a null generator: each draw is one rarefied matrix.
#[derive(Debug, Clone)]
pub struct Rarefier<'a> {
    matrix: &'a CommunityMatrix,
    depth: u64,
    totals: Vec<u64>,
}

impl<'a> Rarefier<'a> {
    /// Validates counts and depth up front.
    pub fn new(matrix: &'a CommunityMatrix, depth: u64) -> Result<Self> {
        let totals = check_depth(matrix, depth)?;
        Ok(Self {
            matrix,
            depth,
            totals,
        })
    }

    pub fn depth(&self) -> u64 {
        self.depth
    }
}

impl NullGenerator for Rarefier<'_> {
    type Output = CommunityMatrix;

    fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CommunityMatrix> {
        Ok(draw(self.matrix, &self.totals, self.depth, rng))
    }
}
