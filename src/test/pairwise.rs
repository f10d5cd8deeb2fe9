//! Pairwise PERMANOVA between all pairs of factor levels.
//!
//! Levels are taken in sorted order and every unordered pair `(a, b)` with
//! `a < b` is tested once, in lexicographic order of the level indices. Each
//! test uses only the samples labelled `a` or `b`. Samples with a missing
//! label take part in no comparison. Raw p-values are adjusted across all
//! pairs at the end.

use super::permanova::{permanova, PermanovaConfig};
use crate::correct::{p_adjust, CorrectionMethod};
use crate::data::{DissimilarityMatrix, GroupFactor};
use crate::error::{NullError, Result};
use crate::replicate::{replicate_rng, Runtime};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, info};

/// Configuration for pairwise group testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PairwiseConfig {
    /// Permutations per pair.
    pub n_permutations: usize,
    /// Adjustment applied across pairs.
    pub correction: CorrectionMethod,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for PairwiseConfig {
    fn default() -> Self {
        Self {
            n_permutations: 999,
            correction: CorrectionMethod::Bh,
            seed: 42,
        }
    }
}

impl PairwiseConfig {
    /// Create a quick configuration for testing (fewer permutations).
    pub fn quick() -> Self {
        Self {
            n_permutations: 99,
            ..Default::default()
        }
    }
}

/// Outcome of one level-pair comparison.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseResult {
    /// Rendered as `"a <-> b"`.
    pub pair: String,
    pub level_a: String,
    pub level_b: String,
    /// Samples in the comparison.
    pub n_samples: usize,
    pub df: usize,
    pub sum_sq: f64,
    pub mean_sq: f64,
    pub f_statistic: f64,
    pub r_squared: f64,
    pub p_value: f64,
    pub p_adjusted: f64,
}

/// All pairwise comparisons of one factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairwiseTable {
    pub results: Vec<PairwiseResult>,
    pub correction: CorrectionMethod,
    pub n_permutations: usize,
}

impl PairwiseTable {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Look up a comparison by either level order.
    pub fn get(&self, a: &str, b: &str) -> Option<&PairwiseResult> {
        self.results
            .iter()
            .find(|r| (r.level_a == a && r.level_b == b) || (r.level_a == b && r.level_b == a))
    }

    /// Comparisons with adjusted p-value below `alpha`.
    pub fn significant(&self, alpha: f64) -> Vec<&PairwiseResult> {
        self.results.iter().filter(|r| r.p_adjusted < alpha).collect()
    }

    /// Write the table to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "pairs\tDf\tSumsOfSqs\tMeanSqs\tF.Model\tR2\tp.value\tp.adjusted")?;
        for r in &self.results {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
                r.pair, r.df, r.sum_sq, r.mean_sq, r.f_statistic, r.r_squared, r.p_value, r.p_adjusted
            )?;
        }
        Ok(())
    }
}

impl std::fmt::Display for PairwiseTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Pairwise PERMANOVA ({} permutations, {} adjustment)",
            self.n_permutations,
            self.correction.name()
        )?;
        for r in &self.results {
            writeln!(
                f,
                "  {:<24} F = {:>8.4}  R2 = {:.4}  p = {:.4}  p.adj = {:.4}",
                r.pair, r.f_statistic, r.r_squared, r.p_value, r.p_adjusted
            )?;
        }
        Ok(())
    }
}

/// Test every pair of levels of `factor` with PERMANOVA on `dist`.
///
/// The factor is aligned to the matrix by sample identifier. Level counts are
/// checked before any permutation work: fewer than two levels gives
/// [`NullError::InsufficientLevels`], a level with fewer than two samples
/// gives [`NullError::DegenerateGroup`].
pub fn pairwise_test(
    dist: &DissimilarityMatrix,
    factor: &GroupFactor,
    config: &PairwiseConfig,
    runtime: &Runtime<'_>,
) -> Result<PairwiseTable> {
    dist.validate()?;
    let factor = factor.align_to(dist.sample_ids())?;
    let levels = factor.levels();
    if levels.len() < 2 {
        return Err(NullError::InsufficientLevels {
            found: levels.len(),
        });
    }
    let members: Vec<Vec<usize>> = levels.iter().map(|l| factor.indices_of(l)).collect();
    for (level, idx) in levels.iter().zip(&members) {
        if idx.len() < 2 {
            return Err(NullError::DegenerateGroup {
                level: level.clone(),
                n: idx.len(),
            });
        }
    }
    if config.n_permutations == 0 {
        return Err(NullError::InvalidParameter(
            "Pairwise testing needs at least one permutation".to_string(),
        ));
    }

    info!(
        samples = dist.n_samples(),
        levels = levels.len(),
        pairs = levels.len() * (levels.len() - 1) / 2,
        permutations = config.n_permutations,
        "pairwise PERMANOVA"
    );

    let mut results = Vec::new();
    for a in 0..levels.len() {
        for b in (a + 1)..levels.len() {
            let pair_index = results.len();
            let mut indices: Vec<usize> = members[a].iter().chain(&members[b]).copied().collect();
            indices.sort_unstable();
            let groups: Vec<usize> = indices
                .iter()
                .map(|i| usize::from(members[b].binary_search(i).is_ok()))
                .collect();
            let sub = dist.subset(&indices)?;

            let perm_config = PermanovaConfig {
                n_permutations: config.n_permutations,
                seed: replicate_rng(config.seed, pair_index).next_u64(),
            };
            let res = permanova(&sub, &groups, &perm_config, runtime)?;
            let pair = format!("{} <-> {}", levels[a], levels[b]);
            debug!(pair = %pair, f = res.f_statistic, p = res.p_value, "pair tested");

            results.push(PairwiseResult {
                pair,
                level_a: levels[a].clone(),
                level_b: levels[b].clone(),
                n_samples: indices.len(),
                df: res.df,
                sum_sq: res.sum_sq,
                mean_sq: res.mean_sq,
                f_statistic: res.f_statistic,
                r_squared: res.r_squared,
                p_value: res.p_value,
                p_adjusted: f64::NAN,
            });
        }
    }

    let raw: Vec<f64> = results.iter().map(|r| r.p_value).collect();
    for (r, adj) in results.iter_mut().zip(p_adjust(&raw, config.correction)) {
        r.p_adjusted = adj;
    }

    info!(pairs = results.len(), "pairwise PERMANOVA finished");
    Ok(PairwiseTable {
        results,
        correction: config.correction,
        n_permutations: config.n_permutations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(labels: &[&str]) -> (DissimilarityMatrix, GroupFactor) {
        let n = labels.len();
        let ids: Vec<String> = (0..n).map(|i| format!("s{}", i)).collect();
        let rows: Vec<Vec<f64>> = (0..n)
            .map(|i| {
                (0..n)
                    .map(|j| if i == j { 0.0 } else { ((i as f64) - (j as f64)).abs() / n as f64 })
                    .collect()
            })
            .collect();
        let dist = DissimilarityMatrix::from_rows(&rows, ids.clone()).unwrap();
        let factor = GroupFactor::from_labels(ids, labels).unwrap();
        (dist, factor)
    }

    #[test]
    fn test_pairs_in_canonical_order() {
        let (dist, factor) = setup(&["C", "A", "B", "A", "C", "B", "B", "A", "C"]);
        let table = pairwise_test(&dist, &factor, &PairwiseConfig::quick(), &Runtime::sequential()).unwrap();
        let pairs: Vec<&str> = table.results.iter().map(|r| r.pair.as_str()).collect();
        assert_eq!(pairs, vec!["A <-> B", "A <-> C", "B <-> C"]);
        assert!(table.results.iter().all(|r| r.n_samples == 6 && r.df == 1));
        assert!(table.get("C", "A").is_some());
    }

    #[test]
    fn test_single_level_rejected() {
        let (dist, factor) = setup(&["A", "A", "A"]);
        assert!(matches!(
            pairwise_test(&dist, &factor, &PairwiseConfig::quick(), &Runtime::sequential()),
            Err(NullError::InsufficientLevels { found: 1 })
        ));
    }

    #[test]
    fn test_degenerate_group_rejected() {
        let (dist, factor) = setup(&["A", "A", "B", "B", "C"]);
        match pairwise_test(&dist, &factor, &PairwiseConfig::quick(), &Runtime::sequential()) {
            Err(NullError::DegenerateGroup { level, n }) => {
                assert_eq!(level, "C");
                assert_eq!(n, 1);
            }
            other => panic!("expected DegenerateGroup, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_labels_excluded() {
        let (dist, _) = setup(&["A", "A", "B", "B", "A"]);
        let labels = vec![
            Some("A".to_string()),
            Some("A".to_string()),
            Some("B".to_string()),
            Some("B".to_string()),
            None,
        ];
        let factor = GroupFactor::new(dist.sample_ids().to_vec(), labels).unwrap();
        let table = pairwise_test(&dist, &factor, &PairwiseConfig::quick(), &Runtime::sequential()).unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.results[0].n_samples, 4);
    }

    #[test]
    fn test_adjusted_matches_raw_length() {
        let (dist, factor) = setup(&["A", "B", "C", "D", "A", "B", "C", "D"]);
        let config = PairwiseConfig {
            correction: CorrectionMethod::Bonferroni,
            ..PairwiseConfig::quick()
        };
        let table = pairwise_test(&dist, &factor, &config, &Runtime::sequential()).unwrap();
        assert_eq!(table.len(), 6);
        for r in &table.results {
            assert!(r.p_adjusted >= r.p_value);
            assert!(r.p_adjusted <= 1.0);
        }
    }
}
