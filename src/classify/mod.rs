//! Confidence-interval classification of observed statistics.
//!
//! For each column the null replicates give a mean and a Type 7 quantile
//! interval `[low, upp]`. The observed value is labelled with the scheme's
//! upper label when strictly above `upp`, its lower label when strictly below
//! `low`, and the neutral label otherwise. Values equal to a bound are
//! neutral.

use crate::data::{ClassificationResult, ClassificationTable, Label, LabelScheme};
use crate::error::{NullError, Result};
use crate::replicate::NullReplicateSet;
use crate::stats::{mean, quantile_pair, validate_probs};
use tracing::warn;

/// Label for one observed value against `[low, upp]`.
///
/// Returns `None` if the observed value or either bound is missing.
pub fn classify_value(observed: f64, low: f64, upp: f64, scheme: LabelScheme) -> Option<Label> {
    if observed.is_nan() || low.is_nan() || upp.is_nan() {
        return None;
    }
    if observed > upp {
        Some(scheme.upper())
    } else if observed < low {
        Some(scheme.lower())
    } else {
        Some(scheme.neutral())
    }
}

/// Summarize replicate values and label the observed value.
pub fn classify_column(
    id: &str,
    observed: f64,
    replicates: &[f64],
    probs: (f64, f64),
    scheme: LabelScheme,
) -> ClassificationResult {
    let (low_ci, upp_ci) = quantile_pair(replicates, probs);
    if low_ci.is_nan() && !replicates.is_empty() {
        warn!(column = id, "all null replicates are missing; no interval");
    }
    ClassificationResult {
        id: id.to_string(),
        observed,
        mean_simulated: mean(replicates),
        low_ci,
        upp_ci,
        label: classify_value(observed, low_ci, upp_ci, scheme),
    }
}

/// Classify every column of `null` against the matching observed value.
pub fn classify(
    analysis: &str,
    observed: &[f64],
    null: &NullReplicateSet,
    probs: (f64, f64),
    scheme: LabelScheme,
) -> Result<ClassificationTable> {
    validate_probs(probs)?;
    if observed.len() != null.n_columns() {
        return Err(NullError::dimension(
            "observed statistics",
            null.n_columns(),
            observed.len(),
        ));
    }

    let results = null
        .column_ids()
        .iter()
        .zip(observed)
        .enumerate()
        .map(|(j, (id, &obs))| classify_column(id, obs, &null.column(j), probs, scheme))
        .collect();

    Ok(ClassificationTable {
        analysis: analysis.to_string(),
        probs,
        n_replicates: null.n_replicates(),
        results,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn null_set() -> NullReplicateSet {
        // Column a: 1..=10, column b: constant 5, column c: all missing.
        let reps = (1..=10)
            .map(|v| vec![v as f64, 5.0, f64::NAN])
            .collect::<Vec<_>>();
        NullReplicateSet::from_replicates(vec!["a".into(), "b".into(), "c".into()], reps).unwrap()
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let s = LabelScheme::NicheBreadth;
        assert_eq!(classify_value(2.0, 2.0, 3.0, s), Some(Label::NonSignificant));
        assert_eq!(classify_value(3.0, 2.0, 3.0, s), Some(Label::NonSignificant));
        assert_eq!(classify_value(3.1, 2.0, 3.0, s), Some(Label::Generalist));
        assert_eq!(classify_value(1.9, 2.0, 3.0, s), Some(Label::Specialist));
    }

    #[test]
    fn test_missing_observed_propagates() {
        assert_eq!(classify_value(f64::NAN, 0.0, 1.0, LabelScheme::NicheValue), None);
        assert_eq!(classify_value(0.5, f64::NAN, f64::NAN, LabelScheme::NicheValue), None);
    }

    #[test]
    fn test_two_sided_scheme() {
        let s = LabelScheme::TwoSided;
        assert_eq!(classify_value(10.0, 0.0, 1.0, s), Some(Label::Significant));
        assert_eq!(classify_value(-1.0, 0.0, 1.0, s), Some(Label::Significant));
        assert_eq!(classify_value(0.5, 0.0, 1.0, s), Some(Label::NotSignificant));
    }

    #[test]
    fn test_infinite_replicates_still_labelled() {
        // Windows whose halves have zero within dissimilarity give an infinite ratio.
        let reps = [1.5, 2.0, f64::INFINITY, f64::INFINITY];
        let r = classify_column("w", f64::INFINITY, &reps, (0.025, 0.975), LabelScheme::TwoSided);
        assert_eq!(r.upp_ci, f64::INFINITY);
        assert!(r.low_ci.is_finite());
        assert_eq!(r.label, Some(Label::NotSignificant));

        let r = classify_column("w", 0.5, &[f64::INFINITY; 3], (0.025, 0.975), LabelScheme::TwoSided);
        assert_eq!(r.low_ci, f64::INFINITY);
        assert_eq!(r.label, Some(Label::Significant));
    }

    #[test]
    fn test_classify_table() {
        let table = classify("test", &[9.9, 5.0, 1.0], &null_set(), (0.025, 0.975), LabelScheme::Seasonality)
            .unwrap();
        assert_eq!(table.len(), 3);
        let a = table.get("a").unwrap();
        assert!((a.low_ci - 1.225).abs() < 1e-12);
        assert!((a.upp_ci - 9.775).abs() < 1e-12);
        assert!((a.mean_simulated - 5.5).abs() < 1e-12);
        assert_eq!(a.label, Some(Label::SignificantlyHigher));
        // Observed equal to a degenerate interval is neutral.
        assert_eq!(table.get("b").unwrap().label, Some(Label::NonSignificant));
        let c = table.get("c").unwrap();
        assert!(c.mean_simulated.is_nan());
        assert_eq!(c.label, None);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(matches!(
            classify("test", &[1.0], &null_set(), (0.025, 0.975), LabelScheme::NicheValue),
            Err(NullError::DimensionMismatch { .. })
        ));
    }
}
