//! Square sample-by-sample dissimilarity matrices.

use crate::data::community::{check_permutation, ensure_unique};
use crate::data::CommunityMatrix;
use crate::error::{NullError, Result};
use nalgebra::DMatrix;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Absolute tolerance for symmetry and zero-diagonal checks.
const SYMMETRY_TOL: f64 = 1e-10;

/// A symmetric dissimilarity matrix with a zero diagonal.
///
/// Both axes share one list of sample identifiers.
#[derive(Debug, Clone, PartialEq)]
pub struct DissimilarityMatrix {
    data: DMatrix<f64>,
    sample_ids: Vec<String>,
}

impl DissimilarityMatrix {
    /// Create a dissimilarity matrix, validating shape, symmetry and diagonal.
    pub fn new(data: DMatrix<f64>, sample_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != ncols {
            return Err(NullError::AsymmetricMatrix(format!(
                "matrix is {} x {}, expected square",
                nrows, ncols
            )));
        }
        if sample_ids.len() != nrows {
            return Err(NullError::dimension("dissimilarity identifiers", nrows, sample_ids.len()));
        }
        ensure_unique(&sample_ids, "sample")?;

        let matrix = Self { data, sample_ids };
        matrix.validate()?;
        Ok(matrix)
    }

    /// Build from row-major nested values.
    pub fn from_rows(rows: &[Vec<f64>], sample_ids: Vec<String>) -> Result<Self> {
        let n = rows.len();
        for row in rows {
            if row.len() != n {
                return Err(NullError::AsymmetricMatrix(format!(
                    "row of length {} in a matrix with {} rows",
                    row.len(),
                    n
                )));
            }
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(DMatrix::from_row_slice(n, n, &flat), sample_ids)
    }

    /// Bray-Curtis dissimilarity between every pair of samples.
    ///
    /// `BC(a, b) = Σ|a_i - b_i| / Σ(a_i + b_i)`; two empty samples are at distance 0.
    pub fn bray_curtis(community: &CommunityMatrix) -> Result<Self> {
        let n = community.n_samples();
        let m = community.data();
        let mut data = DMatrix::zeros(n, n);
        for i in 0..n {
            for j in (i + 1)..n {
                let mut num = 0.0;
                let mut den = 0.0;
                for k in 0..community.n_taxa() {
                    let a = m[(i, k)];
                    let b = m[(j, k)];
                    num += (a - b).abs();
                    den += a + b;
                }
                let d = if den > 0.0 { num / den } else { 0.0 };
                data[(i, j)] = d;
                data[(j, i)] = d;
            }
        }
        Self::new(data, community.sample_ids().to_vec())
    }

    /// Load from a TSV file with a header row of sample IDs and one row per
    /// sample, each starting with its ID. Row and column IDs must agree.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| NullError::EmptyData("Empty dissimilarity file".to_string()))??;
        let col_ids: Vec<String> = header_line
            .split('\t')
            .skip(1)
            .map(|s| s.trim().to_string())
            .collect();
        let n = col_ids.len();
        if n == 0 {
            return Err(NullError::EmptyData(
                "Dissimilarity matrix has no samples".to_string(),
            ));
        }

        let mut row_ids = Vec::with_capacity(n);
        let mut values = Vec::with_capacity(n * n);
        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != n + 1 {
                return Err(NullError::AsymmetricMatrix(format!(
                    "row {} has {} values, expected {}",
                    row_idx + 1,
                    fields.len().saturating_sub(1),
                    n
                )));
            }
            row_ids.push(fields[0].trim().to_string());
            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                let value: f64 = value_str.trim().parse().map_err(|_| NullError::InvalidCount {
                    value: value_str.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?;
                values.push(value);
            }
        }

        if row_ids.len() != n {
            return Err(NullError::AsymmetricMatrix(format!(
                "{} rows but {} columns",
                row_ids.len(),
                n
            )));
        }
        if row_ids != col_ids {
            return Err(NullError::AsymmetricMatrix(
                "row identifiers do not match column identifiers".to_string(),
            ));
        }

        Self::new(DMatrix::from_row_slice(n, n, &values), row_ids)
    }

    /// Write to TSV in the format read by [`DissimilarityMatrix::from_tsv`].
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "sample_id")?;
        for id in &self.sample_ids {
            write!(writer, "\t{}", id)?;
        }
        writeln!(writer)?;
        for (i, id) in self.sample_ids.iter().enumerate() {
            write!(writer, "{}", id)?;
            for j in 0..self.n_samples() {
                write!(writer, "\t{}", self.data[(i, j)])?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }

    /// Check squareness, finiteness, symmetry and the zero diagonal.
    pub fn validate(&self) -> Result<()> {
        let n = self.n_samples();
        if self.data.ncols() != n {
            return Err(NullError::AsymmetricMatrix(format!(
                "matrix is {} x {}, expected square",
                n,
                self.data.ncols()
            )));
        }
        for i in 0..n {
            if !self.data[(i, i)].is_finite() || self.data[(i, i)].abs() > SYMMETRY_TOL {
                return Err(NullError::InvalidParameter(format!(
                    "Non-zero diagonal {} for sample '{}'",
                    self.data[(i, i)],
                    self.sample_ids[i]
                )));
            }
            for j in (i + 1)..n {
                let a = self.data[(i, j)];
                let b = self.data[(j, i)];
                if !a.is_finite() || !b.is_finite() {
                    return Err(NullError::InvalidParameter(format!(
                        "Non-finite dissimilarity between '{}' and '{}'",
                        self.sample_ids[i], self.sample_ids[j]
                    )));
                }
                if (a - b).abs() > SYMMETRY_TOL {
                    return Err(NullError::AsymmetricMatrix(format!(
                        "d('{}', '{}') = {} but d('{}', '{}') = {}",
                        self.sample_ids[i], self.sample_ids[j], a, self.sample_ids[j], self.sample_ids[i], b
                    )));
                }
            }
        }
        Ok(())
    }

    /// Dissimilarity between samples `i` and `j`.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.data[(i, j)]
    }

    /// Number of samples on each axis.
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Sample identifiers (shared by rows and columns).
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Get the underlying dense matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Reorder both axes jointly; sample `i` of the result is sample
    /// `order[i]` of `self`.
    pub fn reorder(&self, order: &[usize]) -> Result<Self> {
        check_permutation(order, self.n_samples())?;
        Ok(self.select(order))
    }

    /// Restrict both axes to the given sample indices.
    pub fn subset(&self, indices: &[usize]) -> Result<Self> {
        for &idx in indices {
            if idx >= self.n_samples() {
                return Err(NullError::InvalidParameter(format!(
                    "Sample index {} out of bounds",
                    idx
                )));
            }
        }
        Ok(self.select(indices))
    }

    fn select(&self, indices: &[usize]) -> Self {
        let data = self
            .data
            .select_rows(indices.iter())
            .select_columns(indices.iter());
        let sample_ids = indices.iter().map(|&i| self.sample_ids[i].clone()).collect();
        Self { data, sample_ids }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("S{}", i)).collect()
    }

    #[test]
    fn test_rejects_asymmetric() {
        let result = DissimilarityMatrix::from_rows(
            &[vec![0.0, 0.2], vec![0.3, 0.0]],
            ids(2),
        );
        assert!(matches!(result, Err(NullError::AsymmetricMatrix(_))));
    }

    #[test]
    fn test_rejects_non_square() {
        let result = DissimilarityMatrix::new(DMatrix::zeros(2, 3), ids(2));
        assert!(matches!(result, Err(NullError::AsymmetricMatrix(_))));
    }

    #[test]
    fn test_bray_curtis() {
        let comm = CommunityMatrix::from_rows(
            &[vec![6.0, 7.0, 4.0], vec![10.0, 0.0, 6.0], vec![0.0, 0.0, 0.0]],
            ids(3),
            vec!["a".into(), "b".into(), "c".into()],
        )
        .unwrap();
        let d = DissimilarityMatrix::bray_curtis(&comm).unwrap();
        // |6-10| + |7-0| + |4-6| = 13 over 33
        assert_relative_eq!(d.get(0, 1), 13.0 / 33.0, epsilon = 1e-12);
        assert_relative_eq!(d.get(0, 2), 1.0, epsilon = 1e-12);
        assert_eq!(d.get(1, 1), 0.0);
    }

    #[test]
    fn test_reorder_and_subset() {
        let d = DissimilarityMatrix::from_rows(
            &[
                vec![0.0, 1.0, 2.0],
                vec![1.0, 0.0, 3.0],
                vec![2.0, 3.0, 0.0],
            ],
            ids(3),
        )
        .unwrap();
        let r = d.reorder(&[2, 0, 1]).unwrap();
        assert_eq!(r.sample_ids(), &["S2", "S0", "S1"]);
        assert_eq!(r.get(0, 1), 2.0);
        assert_eq!(r.get(1, 2), 1.0);

        let s = d.subset(&[1, 2]).unwrap();
        assert_eq!(s.n_samples(), 2);
        assert_eq!(s.get(0, 1), 3.0);
    }

    #[test]
    fn test_tsv_mismatched_ids() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "id\tA\tB").unwrap();
        writeln!(file, "A\t0\t1").unwrap();
        writeln!(file, "C\t1\t0").unwrap();
        file.flush().unwrap();
        let result = DissimilarityMatrix::from_tsv(file.path());
        assert!(matches!(result, Err(NullError::AsymmetricMatrix(_))));
    }

    #[test]
    fn test_tsv_roundtrip() {
        let d = DissimilarityMatrix::from_rows(&[vec![0.0, 0.5], vec![0.5, 0.0]], ids(2)).unwrap();
        let file = NamedTempFile::new().unwrap();
        d.to_tsv(file.path()).unwrap();
        assert_eq!(DissimilarityMatrix::from_tsv(file.path()).unwrap(), d);
    }
}
