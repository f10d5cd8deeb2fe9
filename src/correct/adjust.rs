//! Multiple-comparison p-value adjustment.
//!
//! Missing p-values stay missing and do not count toward the number of
//! tests. For the `m` present p-values sorted ascending `p(1) ≤ … ≤ p(m)`:
//!
//! - Bonferroni: `min(1, m p)`
//! - Holm: running maximum of `(m - i + 1) p(i)`, from the smallest up
//! - Hochberg: running minimum of `(m - i + 1) p(i)`, from the largest down
//! - BH: running minimum of `m / i · p(i)`, from the largest down
//! - BY: BH scaled by `Σ_{k=1..m} 1/k`

use crate::error::{NullError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// P-value adjustment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionMethod {
    Holm,
    Hochberg,
    Bonferroni,
    /// Benjamini-Hochberg false discovery rate.
    #[default]
    #[serde(alias = "fdr", alias = "BH")]
    Bh,
    /// Benjamini-Yekutieli false discovery rate.
    #[serde(alias = "BY")]
    By,
    None,
}

impl CorrectionMethod {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Holm => "holm",
            Self::Hochberg => "hochberg",
            Self::Bonferroni => "bonferroni",
            Self::Bh => "BH",
            Self::By => "BY",
            Self::None => "none",
        }
    }
}

impl FromStr for CorrectionMethod {
    type Err = NullError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "holm" => Ok(Self::Holm),
            "hochberg" => Ok(Self::Hochberg),
            "bonferroni" => Ok(Self::Bonferroni),
            "bh" | "fdr" => Ok(Self::Bh),
            "by" => Ok(Self::By),
            "none" => Ok(Self::None),
            other => Err(NullError::InvalidParameter(format!(
                "Unknown correction method '{}'",
                other
            ))),
        }
    }
}

/// Adjust `p_values` with `method`, keeping input order.
pub fn p_adjust(p_values: &[f64], method: CorrectionMethod) -> Vec<f64> {
    let present: Vec<usize> = (0..p_values.len())
        .filter(|&i| !p_values[i].is_nan())
        .collect();
    let m = present.len();
    let mut adjusted = vec![f64::NAN; p_values.len()];
    if m == 0 {
        return adjusted;
    }
    let mf = m as f64;

    // Ascending by p; ties keep input order.
    let mut order = present;
    order.sort_by(|&a, &b| p_values[a].total_cmp(&p_values[b]));

    match method {
        CorrectionMethod::None => {
            for &i in &order {
                adjusted[i] = p_values[i];
            }
        }
        CorrectionMethod::Bonferroni => {
            for &i in &order {
                adjusted[i] = (mf * p_values[i]).min(1.0);
            }
        }
        CorrectionMethod::Holm => {
            let mut running = 0.0_f64;
            for (rank, &i) in order.iter().enumerate() {
                running = running.max((mf - rank as f64) * p_values[i]);
                adjusted[i] = running.min(1.0);
            }
        }
        CorrectionMethod::Hochberg | CorrectionMethod::Bh | CorrectionMethod::By => {
            let scale = if method == CorrectionMethod::By {
                (1..=m).map(|k| 1.0 / k as f64).sum()
            } else {
                1.0
            };
            let mut running = f64::INFINITY;
            for (rank, &i) in order.iter().enumerate().rev() {
                let factor = match method {
                    CorrectionMethod::Hochberg => mf - rank as f64,
                    _ => scale * mf / (rank + 1) as f64,
                };
                running = running.min(factor * p_values[i]);
                adjusted[i] = running.min(1.0);
            }
        }
    }
    adjusted
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const P: [f64; 5] = [0.01, 0.04, 0.03, 0.005, 0.2];

    fn assert_all_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_bh_matches_reference() {
        // R: p.adjust(c(.01,.04,.03,.005,.2), "BH")
        assert_all_close(
            &p_adjust(&P, CorrectionMethod::Bh),
            &[0.025, 0.05, 0.05, 0.025, 0.2],
        );
    }

    #[test]
    fn test_holm_and_hochberg() {
        // R: p.adjust(P, "holm") = 0.04 0.09 0.09 0.025 0.2
        assert_all_close(
            &p_adjust(&P, CorrectionMethod::Holm),
            &[0.04, 0.09, 0.09, 0.025, 0.2],
        );
        // R: p.adjust(P, "hochberg") = 0.04 0.08 0.08 0.025 0.2
        assert_all_close(
            &p_adjust(&P, CorrectionMethod::Hochberg),
            &[0.04, 0.08, 0.08, 0.025, 0.2],
        );
    }

    #[test]
    fn test_bonferroni_caps_at_one() {
        assert_all_close(
            &p_adjust(&P, CorrectionMethod::Bonferroni),
            &[0.05, 0.2, 0.15, 0.025, 1.0],
        );
    }

    #[test]
    fn test_by_scales_bh() {
        let bh = p_adjust(&P, CorrectionMethod::Bh);
        let by = p_adjust(&P, CorrectionMethod::By);
        let c = 1.0 + 0.5 + 1.0 / 3.0 + 0.25 + 0.2;
        for (b, y) in bh.iter().zip(&by) {
            assert_relative_eq!((b * c).min(1.0), *y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_missing_excluded_from_count() {
        let adj = p_adjust(&[0.01, f64::NAN, 0.02], CorrectionMethod::Bonferroni);
        assert_relative_eq!(adj[0], 0.02);
        assert!(adj[1].is_nan());
        assert_relative_eq!(adj[2], 0.04);
        assert!(p_adjust(&[], CorrectionMethod::Bh).is_empty());
    }

    #[test]
    fn test_from_str_aliases() {
        assert_eq!("fdr".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::Bh);
        assert_eq!("BY".parse::<CorrectionMethod>().unwrap(), CorrectionMethod::By);
        assert!("sidak".parse::<CorrectionMethod>().is_err());
    }
}
