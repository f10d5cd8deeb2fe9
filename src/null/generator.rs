//! Null-model generators.
//!
//! A generator produces one randomized dataset per call from an RNG it is
//! handed. Replicate engines own the RNG streams; generators are stateless
//! and shared across worker threads.

use super::swap::{null_swap, NullMethod};
use crate::data::CommunityMatrix;
use crate::error::Result;
use rand::seq::SliceRandom;
use rand::Rng;

/// Source of randomized datasets for a null distribution.
pub trait NullGenerator: Sync {
    /// Dataset produced by one draw.
    type Output: Send;

    /// Draw one randomized dataset.
    fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Self::Output>;
}

/// Uniform random permutation of `0..n`.
pub fn random_permutation<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    order.shuffle(rng);
    order
}

/// Margin-constrained randomization of a community matrix.
#[derive(Debug, Clone)]
pub struct SwapGenerator<'a> {
    matrix: &'a CommunityMatrix,
    method: NullMethod,
}

impl<'a> SwapGenerator<'a> {
    /// Create a generator; the matrix must hold whole-number counts.
    pub fn new(matrix: &'a CommunityMatrix, method: NullMethod) -> Result<Self> {
        matrix.require_integral()?;
        Ok(Self { matrix, method })
    }

    pub fn method(&self) -> NullMethod {
        self.method
    }
}

impl NullGenerator for SwapGenerator<'_> {
    type Output = CommunityMatrix;

    fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CommunityMatrix> {
        null_swap(self.matrix, self.method, rng)
    }
}

/// Rows of abundances permuted against fixed sample positions.
///
/// Breaks the link between each sample's community and anything aligned to
/// the sample position (environment values, time order) while keeping
/// every taxon's set of values intact.
#[derive(Debug, Clone)]
pub struct RowShuffle<'a> {
    matrix: &'a CommunityMatrix,
}

impl<'a> RowShuffle<'a> {
    pub fn new(matrix: &'a CommunityMatrix) -> Self {
        Self { matrix }
    }
}

impl NullGenerator for RowShuffle<'_> {
    type Output = CommunityMatrix;

    fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<CommunityMatrix> {
        let order = random_permutation(self.matrix.n_samples(), rng);
        Ok(self.matrix.shuffled_rows(&order))
    }
}

/// Random sample order, used to permute both axes of a dissimilarity matrix
/// jointly (entry `(i, j)` of the permuted matrix is `(order[i], order[j])`).
#[derive(Debug, Clone, Copy)]
pub struct SampleOrderShuffle {
    n_samples: usize,
}

impl SampleOrderShuffle {
    pub fn new(n_samples: usize) -> Self {
        Self { n_samples }
    }
}

impl NullGenerator for SampleOrderShuffle {
    type Output = Vec<usize>;

    fn generate<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<usize>> {
        Ok(random_permutation(self.n_samples, rng))
    }
}
