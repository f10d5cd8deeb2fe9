//! Multiple testing correction.

pub mod adjust;

pub use adjust::{p_adjust, CorrectionMethod};
