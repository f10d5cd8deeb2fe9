//! Sample autocorrelation with a pass-through missing-value policy.
//!
//! The series is centred on the mean of its non-missing values. For each
//! lag `k`, products are summed over the pairs `(x[t], x[t + k])` where both
//! values are present and divided by `pairs + k`. Coefficients are the lag
//! autocovariances divided by the lag-0 autocovariance, clamped to [-1, 1].
//! A constant or entirely missing series yields NaN coefficients.

/// Default maximum lag for a series of length `n`: `floor(10 log10(n))`,
/// capped at `n - 1`.
pub fn default_lag_max(n: usize) -> usize {
    if n < 2 {
        return 0;
    }
    let lag = (10.0 * (n as f64).log10()).floor() as usize;
    lag.min(n - 1)
}

/// Autocorrelation coefficients for lags `0..=lag_max` (lag 0 is 1 unless
/// the series is degenerate). `lag_max` is capped at `n - 1`.
pub fn autocorrelation(series: &[f64], lag_max: usize) -> Vec<f64> {
    let n = series.len();
    if n == 0 {
        return Vec::new();
    }
    let lag_max = lag_max.min(n - 1);

    let (sum, count) = series
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), &v| (s + v, c + 1));
    if count == 0 {
        return vec![f64::NAN; lag_max + 1];
    }
    let centre = sum / count as f64;
    let centred: Vec<f64> = series.iter().map(|v| v - centre).collect();

    let mut acov = Vec::with_capacity(lag_max + 1);
    for lag in 0..=lag_max {
        let mut s = 0.0;
        let mut pairs = 0usize;
        for t in 0..(n - lag) {
            let (a, b) = (centred[t + lag], centred[t]);
            if !a.is_nan() && !b.is_nan() {
                s += a * b;
                pairs += 1;
            }
        }
        acov.push(if pairs > 0 {
            s / (pairs + lag) as f64
        } else {
            f64::NAN
        });
    }

    let var = acov[0];
    acov.iter()
        .map(|&c| {
            let r = c / var;
            if r.is_nan() {
                r
            } else {
                r.clamp(-1.0, 1.0)
            }
        })
        .collect()
}

/// Seasonality index: sum of absolute autocorrelations at lags `1..=lag_max`.
///
/// Missing coefficients propagate, so the index is NaN whenever any lag
/// cannot be estimated.
pub fn seasonality_index(series: &[f64], lag_max: usize) -> f64 {
    let acf = autocorrelation(series, lag_max);
    if acf.len() < 2 {
        return f64::NAN;
    }
    acf[1..].iter().map(|r| r.abs()).sum()
}
