//! Constrained randomization of count matrices with fixed margins.
//!
//! Every method returns a matrix with exactly the row and column totals of
//! its input:
//!
//! - [`NullMethod::R2dtable`] draws a random contingency table with the
//!   observed margins (each individual is assigned a random column slot).
//! - [`NullMethod::Quasiswap`] starts from such a table and applies
//!   margin-preserving unit moves on 2×2 submatrices, never moving the
//!   number of non-zero cells away from the observed fill, until it is met.
//! - [`NullMethod::QuasiswapBinary`] works on presence/absence: it draws a
//!   table with the incidence margins and applies sum-of-squares-reducing
//!   moves until every cell is 0 or 1.

use crate::data::CommunityMatrix;
use crate::error::{NullError, Result};
use nalgebra::DMatrix;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Upper bound on 2×2 move attempts, per matrix cell, before a draw is abandoned.
const ATTEMPTS_PER_CELL: usize = 20_000;

/// Constraint set used to randomize a community matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NullMethod {
    /// Count quasiswap: fixed margins and fixed number of non-zero cells.
    #[default]
    Quasiswap,
    /// Presence/absence quasiswap: fixed incidence margins, binary output.
    QuasiswapBinary,
    /// Random table with fixed margins only.
    R2dtable,
}

impl NullMethod {
    /// Get the descriptive name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Quasiswap => "quasiswap",
            Self::QuasiswapBinary => "quasiswap_binary",
            Self::R2dtable => "r2dtable",
        }
    }
}

impl FromStr for NullMethod {
    type Err = NullError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "quasiswap" | "quasiswap_count" => Ok(Self::Quasiswap),
            "quasiswap_binary" | "binary" => Ok(Self::QuasiswapBinary),
            "r2dtable" => Ok(Self::R2dtable),
            other => Err(NullError::InvalidParameter(format!(
                "Unknown null method '{}'. Use quasiswap, quasiswap_binary or r2dtable",
                other
            ))),
        }
    }
}

/// Dense row-major integer table used while swapping.
struct Table {
    nrow: usize,
    ncol: usize,
    cells: Vec<u64>,
}

impl Table {
    #[inline]
    fn at(&self, i: usize, j: usize) -> u64 {
        self.cells[i * self.ncol + j]
    }

    #[inline]
    fn at_mut(&mut self, i: usize, j: usize) -> &mut u64 {
        &mut self.cells[i * self.ncol + j]
    }

    fn into_matrix(self) -> DMatrix<f64> {
        DMatrix::from_row_iterator(self.nrow, self.ncol, self.cells.into_iter().map(|v| v as f64))
    }
}

/// Produce one randomized matrix under `method`.
///
/// The input must hold non-negative whole numbers.
pub fn null_swap<R: Rng + ?Sized>(
    matrix: &CommunityMatrix,
    method: NullMethod,
    rng: &mut R,
) -> Result<CommunityMatrix> {
    matrix.require_integral()?;
    let data = match method {
        NullMethod::R2dtable => {
            let (rows, cols) = margins(matrix, false);
            r2dtable(&rows, &cols, rng).into_matrix()
        }
        NullMethod::Quasiswap => quasiswap_count(matrix, rng)?.into_matrix(),
        NullMethod::QuasiswapBinary => quasiswap_binary(matrix, rng)?.into_matrix(),
    };
    Ok(matrix.with_data(data))
}

fn margins(matrix: &CommunityMatrix, binary: bool) -> (Vec<u64>, Vec<u64>) {
    let value = |v: f64| -> u64 {
        if binary {
            u64::from(v > 0.0)
        } else {
            v as u64
        }
    };
    let m = matrix.data();
    let rows = m.row_iter().map(|r| r.iter().map(|&v| value(v)).sum()).collect();
    let cols = m.column_iter().map(|c| c.iter().map(|&v| value(v)).sum()).collect();
    (rows, cols)
}

/// Random table with the given margins: column slots of all individuals are
/// shuffled and dealt to rows in order.
fn r2dtable<R: Rng + ?Sized>(row_sums: &[u64], col_sums: &[u64], rng: &mut R) -> Table {
    let nrow = row_sums.len();
    let ncol = col_sums.len();
    let mut slots: Vec<u32> = Vec::with_capacity(col_sums.iter().sum::<u64>() as usize);
    for (j, &c) in col_sums.iter().enumerate() {
        slots.extend(std::iter::repeat(j as u32).take(c as usize));
    }
    slots.shuffle(rng);

    let mut table = Table {
        nrow,
        ncol,
        cells: vec![0; nrow * ncol],
    };
    let mut pos = 0usize;
    for (i, &r) in row_sums.iter().enumerate() {
        for &j in &slots[pos..pos + r as usize] {
            *table.at_mut(i, j as usize) += 1;
        }
        pos += r as usize;
    }
    table
}

/// Two distinct indices below `n` (requires `n >= 2`).
fn distinct_pair<R: Rng + ?Sized>(n: usize, rng: &mut R) -> (usize, usize) {
    let a = rng.gen_range(0..n);
    let mut b = rng.gen_range(0..n - 1);
    if b >= a {
        b += 1;
    }
    (a, b)
}

fn attempt_budget(nrow: usize, ncol: usize) -> usize {
    ATTEMPTS_PER_CELL.saturating_mul(nrow * ncol).max(1_000_000)
}

fn quasiswap_count<R: Rng + ?Sized>(matrix: &CommunityMatrix, rng: &mut R) -> Result<Table> {
    let (rows, cols) = margins(matrix, false);
    let mut table = r2dtable(&rows, &cols, rng);
    let target = matrix.n_nonzero() as i64;
    let mut fill = table.cells.iter().filter(|&&v| v > 0).count() as i64;
    if fill == target {
        return Ok(table);
    }
    if table.nrow < 2 || table.ncol < 2 {
        return Err(NullError::InvalidParameter(
            "quasiswap needs at least 2 samples and 2 taxa to adjust fill".to_string(),
        ));
    }

    let budget = attempt_budget(table.nrow, table.ncol);
    for _ in 0..budget {
        let (i, j) = distinct_pair(table.nrow, rng);
        let (k, l) = distinct_pair(table.ncol, rng);
        // Move one unit from (i,l),(j,k) onto (i,k),(j,l).
        let (ik, jl, il, jk) = (table.at(i, k), table.at(j, l), table.at(i, l), table.at(j, k));
        if il == 0 || jk == 0 {
            continue;
        }
        let delta = i64::from(ik == 0) + i64::from(jl == 0) - i64::from(il == 1) - i64::from(jk == 1);
        // Fill-neutral moves are taken too; they let cells drift to 0 or 1.
        if (fill + delta - target).abs() <= (fill - target).abs() {
            *table.at_mut(i, k) += 1;
            *table.at_mut(j, l) += 1;
            *table.at_mut(i, l) -= 1;
            *table.at_mut(j, k) -= 1;
            fill += delta;
            if fill == target {
                return Ok(table);
            }
        }
    }

    Err(NullError::InvalidParameter(format!(
        "quasiswap did not reach fill {} (stuck at {}) after {} attempts",
        target, fill, budget
    )))
}

fn quasiswap_binary<R: Rng + ?Sized>(matrix: &CommunityMatrix, rng: &mut R) -> Result<Table> {
    let (rows, cols) = margins(matrix, true);
    let mut table = r2dtable(&rows, &cols, rng);
    let total: u64 = table.cells.iter().sum();
    // For a 0/1 table the sum of squares equals the sum.
    let mut ss: u64 = table.cells.iter().map(|v| v * v).sum();
    if ss == total {
        return Ok(table);
    }
    if table.nrow < 2 || table.ncol < 2 {
        return Err(NullError::InvalidParameter(
            "binary quasiswap needs at least 2 samples and 2 taxa".to_string(),
        ));
    }

    let budget = attempt_budget(table.nrow, table.ncol);
    for _ in 0..budget {
        let (i, j) = distinct_pair(table.nrow, rng);
        let (k, l) = distinct_pair(table.ncol, rng);
        let (a, d, b, c) = (table.at(i, k), table.at(j, l), table.at(i, l), table.at(j, k));
        // Moving a unit from the heavier diagonal lowers the sum of squares
        // by 2 (heavy - light - 2); a zero change is allowed for mixing.
        if a > 0 && d > 0 && a + d >= b + c + 2 {
            *table.at_mut(i, k) -= 1;
            *table.at_mut(j, l) -= 1;
            *table.at_mut(i, l) += 1;
            *table.at_mut(j, k) += 1;
            ss -= 2 * (a + d - b - c - 2);
        } else if b > 0 && c > 0 && b + c >= a + d + 2 {
            *table.at_mut(i, l) -= 1;
            *table.at_mut(j, k) -= 1;
            *table.at_mut(i, k) += 1;
            *table.at_mut(j, l) += 1;
            ss -= 2 * (b + c - a - d - 2);
        } else {
            continue;
        }
        if ss == total {
            return Ok(table);
        }
    }

    Err(NullError::InvalidParameter(format!(
        "binary quasiswap did not converge after {} attempts",
        budget
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn create_test_matrix() -> CommunityMatrix {
        CommunityMatrix::from_rows(
            &[
                vec![12.0, 0.0, 3.0, 1.0, 0.0],
                vec![4.0, 8.0, 0.0, 0.0, 2.0],
                vec![0.0, 5.0, 6.0, 2.0, 0.0],
                vec![7.0, 1.0, 0.0, 9.0, 3.0],
                vec![0.0, 0.0, 4.0, 5.0, 6.0],
            ],
            (0..5).map(|i| format!("s{}", i)).collect(),
            (0..5).map(|i| format!("t{}", i)).collect(),
        )
        .unwrap()
    }

    fn assert_same_margins(a: &CommunityMatrix, b: &CommunityMatrix) {
        assert_eq!(a.row_totals(), b.row_totals());
        assert_eq!(a.column_totals(), b.column_totals());
    }

    #[test]
    fn test_r2dtable_preserves_margins() {
        let mat = create_test_matrix();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        for _ in 0..20 {
            let null = null_swap(&mat, NullMethod::R2dtable, &mut rng).unwrap();
            assert_same_margins(&mat, &null);
            assert_eq!(null.sample_ids(), mat.sample_ids());
            assert_eq!(null.taxon_ids(), mat.taxon_ids());
        }
    }

    #[test]
    fn test_quasiswap_preserves_margins_and_fill() {
        let mat = create_test_matrix();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        for _ in 0..20 {
            let null = null_swap(&mat, NullMethod::Quasiswap, &mut rng).unwrap();
            assert_same_margins(&mat, &null);
            assert_eq!(null.n_nonzero(), mat.n_nonzero());
            assert!(null.is_integral());
        }
    }

    #[test]
    fn test_quasiswap_binary_output() {
        let mat = create_test_matrix();
        let binary = CommunityMatrix::from_rows(
            &(0..5)
                .map(|i| (0..5).map(|j| if mat.get(i, j) > 0.0 { 1.0 } else { 0.0 }).collect())
                .collect::<Vec<Vec<f64>>>(),
            mat.sample_ids().to_vec(),
            mat.taxon_ids().to_vec(),
        )
        .unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        for _ in 0..20 {
            let null = null_swap(&mat, NullMethod::QuasiswapBinary, &mut rng).unwrap();
            assert!(null.data().iter().all(|&v| v == 0.0 || v == 1.0));
            assert_same_margins(&binary, &null);
        }
    }

    #[test]
    fn test_rejects_fractional_counts() {
        let mat = CommunityMatrix::from_rows(
            &[vec![1.5, 2.0], vec![0.0, 1.0]],
            vec!["a".into(), "b".into()],
            vec!["x".into(), "y".into()],
        )
        .unwrap();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        assert!(matches!(
            null_swap(&mat, NullMethod::Quasiswap, &mut rng),
            Err(NullError::InvalidCount { row: 0, col: 0, .. })
        ));
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("quasiswap".parse::<NullMethod>().unwrap(), NullMethod::Quasiswap);
        assert_eq!("R2DTABLE".parse::<NullMethod>().unwrap(), NullMethod::R2dtable);
        assert!("curveball".parse::<NullMethod>().is_err());
    }
}
