//! Null-model randomization of community data.
//!
//! - [`SwapGenerator`]: fixed-margin matrices (quasiswap, binary quasiswap, r2dtable)
//! - [`RowShuffle`]: abundance rows permuted against fixed sample positions
//! - [`SampleOrderShuffle`]: random sample order for dissimilarity matrices
//!
//! Rarefaction draws live in [`crate::rarefy`] and implement the same trait.

pub mod generator;
pub mod swap;

pub use generator::{random_permutation, NullGenerator, RowShuffle, SampleOrderShuffle, SwapGenerator};
pub use swap::{null_swap, NullMethod};
