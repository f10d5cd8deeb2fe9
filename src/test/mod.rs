//! Permutation tests on dissimilarity matrices.

pub mod pairwise;

pub use pairwise::{pairwise_test, PairwiseConfig, PairwiseResult, PairwiseTable};
pub use permanova::{permanova, PermanovaConfig, PermanovaResult};
