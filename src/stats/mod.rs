//! Numerical building blocks: quantiles, autocorrelation and niche indices.

pub mod acf;
pub mod niche;
pub mod quantile;

pub use acf::{autocorrelation, default_lag_max, seasonality_index};
pub use niche::{levins, shannon};
pub use quantile::{mean, quantile, quantile_pair, std_dev, validate_probs};
