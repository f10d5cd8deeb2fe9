//! Split moving-window analysis of community turnover along a gradient.
//!
//! Samples are sorted by an environmental variable (missing values last, ties
//! in input order). A window of `W` consecutive sorted samples is split into
//! a lower and an upper half of `W / 2` samples, and the window statistic is
//!
//! ```text
//! ratio = mean(d between halves) / mean(d within halves)
//! ```
//!
//! where the within-half pairs of both halves are pooled and each pair is
//! counted once. Windows start at every position `0..S - W`, giving `S - W`
//! windows for `S` samples.
//!
//! The null distribution has one value per replicate: the ratio of the first
//! `W` samples of a random global sample order. Each window's ratio is
//! `SIGNIFICANT` when it falls outside the null quantile interval.

use super::check_null_settings;
use crate::classify::classify_value;
use crate::data::{DissimilarityMatrix, EnvironmentVector, Label, LabelScheme};
use crate::error::{NullError, Result};
use crate::null::SampleOrderShuffle;
use crate::replicate::{build_null_distribution, Runtime};
use crate::stats::{mean, quantile_pair, std_dev};
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Configuration for split moving-window analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitWindowConfig {
    /// Samples per window; even, at least 4 and below the sample count.
    pub window_size: usize,
    /// Number of random sample orders in the null distribution.
    pub n_replicates: usize,
    /// Quantile probabilities of the null interval.
    pub probs: (f64, f64),
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for SplitWindowConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            n_replicates: 1000,
            probs: (0.025, 0.975),
            seed: 42,
        }
    }
}

impl SplitWindowConfig {
    /// Create a quick configuration for testing (fewer replicates).
    pub fn quick() -> Self {
        Self {
            n_replicates: 100,
            ..Default::default()
        }
    }
}

/// One window position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowRecord {
    /// Start position in sorted order (0-based).
    pub start: usize,
    /// Mean environment value of the two central samples.
    pub env_center: f64,
    pub env_min: f64,
    pub env_max: f64,
    /// Between/within dissimilarity ratio.
    pub ratio: f64,
    /// Ratio standardized across all windows.
    pub z_score: f64,
    /// `None` when the ratio or the null interval is missing.
    pub label: Option<Label>,
}

/// Summary of the pooled null distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitWindowNull {
    pub low_ci: f64,
    pub upp_ci: f64,
    pub mean: f64,
    /// One ratio per replicate, in replicate order.
    pub values: Vec<f64>,
}

/// Full output of a split moving-window run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitWindowResult {
    pub window_size: usize,
    pub probs: (f64, f64),
    pub windows: Vec<WindowRecord>,
    pub null: SplitWindowNull,
    /// Sample identifiers in sorted environment order.
    pub sample_order: Vec<String>,
    /// `membership[w][j]`: sample `sample_order[j]` lies in window `w`.
    pub membership: Vec<Vec<bool>>,
}

impl SplitWindowResult {
    pub fn n_windows(&self) -> usize {
        self.windows.len()
    }

    /// Windows labelled significant.
    pub fn significant(&self) -> Vec<&WindowRecord> {
        self.windows
            .iter()
            .filter(|w| w.label == Some(Label::Significant))
            .collect()
    }

    /// Write the per-window table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "window\tenv_center\tenv_min\tenv_max\tratio\tz_score\tsign")?;
        for w in &self.windows {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}",
                w.start + 1,
                w.env_center,
                w.env_min,
                w.env_max,
                w.ratio,
                w.z_score,
                w.label.map(|l| l.name()).unwrap_or("NA")
            )?;
        }
        Ok(())
    }

    /// Write the whole result, null values and membership included, as JSON.
    pub fn to_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

impl std::fmt::Display for SplitWindowResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Split moving window (W = {}, {} windows, {} replicates)",
            self.window_size,
            self.n_windows(),
            self.null.values.len()
        )?;
        writeln!(
            f,
            "  Null interval: [{:.4}, {:.4}], mean {:.4}",
            self.null.low_ci, self.null.upp_ci, self.null.mean
        )?;
        writeln!(f, "  Significant windows: {}", self.significant().len())
    }
}

fn check_window(window_size: usize, n_samples: usize) -> Result<()> {
    let reason = if window_size % 2 != 0 {
        Some("window size must be even")
    } else if window_size < 4 {
        Some("window size must be at least 4")
    } else if window_size >= n_samples {
        Some("window size must be smaller than the number of samples")
    } else {
        None
    };
    match reason {
        Some(reason) => Err(NullError::InvalidWindowSize {
            size: window_size,
            n_samples,
            reason: reason.to_string(),
        }),
        None => Ok(()),
    }
}

/// Between/within ratio for the window made of samples `idx` (first half,
/// then second half).
pub fn window_ratio(d: &DMatrix<f64>, idx: &[usize]) -> f64 {
    let (first, second) = idx.split_at(idx.len() / 2);
    let mut within = (0.0, 0usize);
    for half in [first, second] {
        for (a, &i) in half.iter().enumerate() {
            for &j in &half[..a] {
                within.0 += d[(i, j)];
                within.1 += 1;
            }
        }
    }
    let mut between = (0.0, 0usize);
    for &i in first {
        for &j in second {
            between.0 += d[(i, j)];
            between.1 += 1;
        }
    }
    (between.0 / between.1 as f64) / (within.0 / within.1 as f64)
}

/// Ascending by value, missing values last, ties in input order.
fn gradient_order(values: &[f64]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| match (values[a].is_nan(), values[b].is_nan()) {
        (false, false) => values[a].total_cmp(&values[b]),
        (x, y) => x.cmp(&y),
    });
    order
}

fn span(values: &[f64]) -> (f64, f64) {
    if values.iter().any(|v| v.is_nan()) {
        return (f64::NAN, f64::NAN);
    }
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)))
}

/// Run the split moving-window analysis of `dist` along `environment`.
///
/// All preconditions (matrix symmetry, window size, sample alignment) are
/// checked before the null distribution is drawn.
pub fn split_window(
    dist: &DissimilarityMatrix,
    environment: &EnvironmentVector,
    config: &SplitWindowConfig,
    runtime: &Runtime<'_>,
) -> Result<SplitWindowResult> {
    dist.validate()?;
    let n = dist.n_samples();
    check_window(config.window_size, n)?;
    check_null_settings(config.n_replicates, config.probs)?;
    let env = environment.align_to(dist.sample_ids())?;

    let w = config.window_size;
    let h = w / 2;
    let n_windows = n - w;
    info!(
        samples = n,
        window_size = w,
        windows = n_windows,
        replicates = config.n_replicates,
        "starting split moving window"
    );

    let order = gradient_order(env.values());
    let sorted = dist.reorder(&order)?;
    let sorted_env: Vec<f64> = order.iter().map(|&i| env.values()[i]).collect();

    let positions: Vec<usize> = (0..n).collect();
    let ratios: Vec<f64> = (0..n_windows)
        .map(|s| window_ratio(sorted.data(), &positions[s..s + w]))
        .collect();

    let null_set = build_null_distribution(
        &SampleOrderShuffle::new(n),
        |perm: &Vec<usize>| Ok(vec![window_ratio(dist.data(), &perm[..w])]),
        &["ratio".to_string()],
        &runtime.runner(config.n_replicates, config.seed),
    )?;
    let null_values = null_set.column(0);
    let (low_ci, upp_ci) = quantile_pair(&null_values, config.probs);

    let ratio_mean = mean(&ratios);
    let ratio_sd = std_dev(&ratios);
    let windows: Vec<WindowRecord> = ratios
        .iter()
        .enumerate()
        .map(|(s, &ratio)| {
            let block = &sorted_env[s..s + w];
            let (env_min, env_max) = span(block);
            WindowRecord {
                start: s,
                env_center: (block[h - 1] + block[h]) / 2.0,
                env_min,
                env_max,
                ratio,
                z_score: (ratio - ratio_mean) / ratio_sd,
                label: classify_value(ratio, low_ci, upp_ci, LabelScheme::TwoSided),
            }
        })
        .collect();

    let membership = (0..n_windows)
        .map(|s| (0..n).map(|j| j >= s && j < s + w).collect())
        .collect();

    let result = SplitWindowResult {
        window_size: w,
        probs: config.probs,
        windows,
        null: SplitWindowNull {
            low_ci,
            upp_ci,
            mean: mean(&null_values),
            values: null_values,
        },
        sample_order: sorted.sample_ids().to_vec(),
        membership,
    };
    info!(
        significant = result.significant().len(),
        "split moving window finished"
    );
    Ok(result)
}
