//! Empirical quantiles and moments that skip missing values.
//!
//! Quantiles use linear interpolation between order statistics
//! (Hyndman & Fan Type 7): for the `n` sorted non-missing values and
//! probability `p`, `h = (n - 1) p` and
//! `q = x[floor(h)] + (h - floor(h)) (x[floor(h) + 1] - x[floor(h)])`.

use crate::error::{NullError, Result};

/// Check that `probs` is an ordered pair inside [0, 1].
pub fn validate_probs(probs: (f64, f64)) -> Result<()> {
    let (lo, hi) = probs;
    if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) {
        return Err(NullError::InvalidParameter(format!(
            "Quantile probabilities must be in [0, 1], got ({}, {})",
            lo, hi
        )));
    }
    if lo > hi {
        return Err(NullError::InvalidParameter(format!(
            "Lower probability {} exceeds upper probability {}",
            lo, hi
        )));
    }
    Ok(())
}

/// Non-missing values in ascending order.
pub fn sorted_finite(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

/// Type 7 quantile of already-sorted, NaN-free data. NaN when empty.
pub fn quantile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 0 {
        return f64::NAN;
    }
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * p;
    let lo = (h.floor() as usize).min(n - 1);
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    let (a, b) = (sorted[lo], sorted[hi]);
    // Exact order statistic; interpolating would turn an infinite tail into NaN.
    if frac == 0.0 || a == b {
        return a;
    }
    ((1.0 - frac) * a + frac * b).clamp(a, b)
}

/// Type 7 quantile ignoring missing values.
pub fn quantile(values: &[f64], p: f64) -> f64 {
    quantile_sorted(&sorted_finite(values), p)
}

/// Lower and upper Type 7 quantiles from a single sort.
pub fn quantile_pair(values: &[f64], probs: (f64, f64)) -> (f64, f64) {
    let sorted = sorted_finite(values);
    (quantile_sorted(&sorted, probs.0), quantile_sorted(&sorted, probs.1))
}

/// Arithmetic mean ignoring missing values. NaN when nothing remains.
pub fn mean(values: &[f64]) -> f64 {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if n == 0 {
        f64::NAN
    } else {
        sum / n as f64
    }
}

/// Sample standard deviation (n - 1 denominator) ignoring missing values.
/// NaN with fewer than two values.
pub fn std_dev(values: &[f64]) -> f64 {
    let m = mean(values);
    let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if finite.len() < 2 {
        return f64::NAN;
    }
    let ss: f64 = finite.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (finite.len() - 1) as f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_type7_known_values() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0];
        // R: quantile(1:10, c(0.025, 0.975)) = 1.225, 9.775
        assert_relative_eq!(quantile(&data, 0.025), 1.225, epsilon = 1e-12);
        assert_relative_eq!(quantile(&data, 0.975), 9.775, epsilon = 1e-12);
        assert_relative_eq!(quantile(&data, 0.5), 5.5, epsilon = 1e-12);
        assert_eq!(quantile(&data, 0.0), 1.0);
        assert_eq!(quantile(&data, 1.0), 10.0);
    }

    #[test]
    fn test_quantile_ignores_missing() {
        let data = [f64::NAN, 3.0, 1.0, f64::NAN, 2.0];
        assert_relative_eq!(quantile(&data, 0.5), 2.0, epsilon = 1e-12);
        assert!(quantile(&[f64::NAN], 0.5).is_nan());
        assert!(quantile(&[], 0.5).is_nan());
    }

    #[test]
    fn test_quantile_pair_ordered() {
        let data = [0.3, 0.1, 0.7, 0.7, 0.2, 0.9, 0.4];
        let (lo, hi) = quantile_pair(&data, (0.025, 0.975));
        assert!(lo <= hi);
        let (lo, hi) = quantile_pair(&[2.0; 5], (0.1, 0.9));
        assert_eq!(lo, 2.0);
        assert_eq!(hi, 2.0);
    }

    #[test]
    fn test_quantile_infinite_tail() {
        // R: quantile(c(1, 2, Inf), 0.5) = 2; quantile(c(1, Inf, Inf), 1) = Inf
        assert_eq!(quantile_sorted(&[1.0, 2.0, f64::INFINITY], 0.5), 2.0);
        assert_eq!(quantile_sorted(&[1.0, f64::INFINITY, f64::INFINITY], 1.0), f64::INFINITY);
        assert_eq!(quantile_sorted(&[1.0, f64::INFINITY, f64::INFINITY], 0.75), f64::INFINITY);
        assert_eq!(quantile_sorted(&[1.0, 2.0, f64::INFINITY], 0.75), f64::INFINITY);
        assert_eq!(quantile_sorted(&[f64::NEG_INFINITY, 0.0, 1.0], 0.25), f64::NEG_INFINITY);

        let (lo, hi) = quantile_pair(&[f64::INFINITY; 4], (0.025, 0.975));
        assert_eq!(lo, f64::INFINITY);
        assert_eq!(hi, f64::INFINITY);
    }

    #[test]
    fn test_mean_and_sd() {
        assert_relative_eq!(mean(&[1.0, f64::NAN, 3.0]), 2.0);
        assert!(mean(&[f64::NAN]).is_nan());
        assert_relative_eq!(std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 2.138089935, epsilon = 1e-8);
        assert!(std_dev(&[1.0]).is_nan());
    }

    #[test]
    fn test_validate_probs() {
        assert!(validate_probs((0.025, 0.975)).is_ok());
        assert!(validate_probs((0.9, 0.1)).is_err());
        assert!(validate_probs((-0.1, 0.5)).is_err());
    }
}
