//! Niche width indices over a taxon's distribution across samples.
//!
//! Both indices work on the proportions `p_i = x_i / Σx` of one taxon's
//! abundance across samples. A taxon with zero total abundance has no
//! defined niche width and yields NaN.

/// Levins' niche breadth `B = 1 / Σ p_i²`.
///
/// Ranges from 1 (all abundance in one sample) to the number of samples
/// (perfectly even use of all samples).
pub fn levins(abundances: &[f64]) -> f64 {
    let total: f64 = abundances.iter().sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    let sum_sq: f64 = abundances.iter().map(|&x| (x / total).powi(2)).sum();
    1.0 / sum_sq
}

/// Shannon niche breadth `H = -Σ p_i ln p_i` (natural log, zero terms skipped).
pub fn shannon(abundances: &[f64]) -> f64 {
    let total: f64 = abundances.iter().sum();
    if total <= 0.0 {
        return f64::NAN;
    }
    abundances
        .iter()
        .filter(|&&x| x > 0.0)
        .map(|&x| {
            let p = x / total;
            -p * p.ln()
        })
        .sum()
}
