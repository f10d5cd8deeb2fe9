//! Community matrix of taxon abundances across samples.

use crate::error::{NullError, Result};
use nalgebra::DMatrix;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// A dense abundance table.
///
/// Rows represent samples, columns represent taxa. Row order may carry
/// temporal or gradient meaning and is never reordered implicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct CommunityMatrix {
    /// Abundances (samples × taxa)
    data: DMatrix<f64>,
    /// Sample identifiers (row names)
    sample_ids: Vec<String>,
    /// Taxon identifiers (column names)
    taxon_ids: Vec<String>,
}

impl CommunityMatrix {
    /// Create a new CommunityMatrix from a dense matrix and identifiers.
    ///
    /// Fails if the identifiers do not match the matrix shape, if any
    /// identifier is duplicated, or if an entry is negative or not finite.
    pub fn new(data: DMatrix<f64>, sample_ids: Vec<String>, taxon_ids: Vec<String>) -> Result<Self> {
        let (nrows, ncols) = data.shape();
        if nrows != sample_ids.len() {
            return Err(NullError::dimension("sample identifiers", nrows, sample_ids.len()));
        }
        if ncols != taxon_ids.len() {
            return Err(NullError::dimension("taxon identifiers", ncols, taxon_ids.len()));
        }
        ensure_unique(&sample_ids, "sample")?;
        ensure_unique(&taxon_ids, "taxon")?;

        for row in 0..nrows {
            for col in 0..ncols {
                let value = data[(row, col)];
                if !value.is_finite() || value < 0.0 {
                    return Err(NullError::InvalidCount {
                        value: value.to_string(),
                        row,
                        col,
                    });
                }
            }
        }

        Ok(Self {
            data,
            sample_ids,
            taxon_ids,
        })
    }

    /// Build from row-major nested values.
    pub fn from_rows(rows: &[Vec<f64>], sample_ids: Vec<String>, taxon_ids: Vec<String>) -> Result<Self> {
        let ncols = taxon_ids.len();
        for row in rows {
            if row.len() != ncols {
                return Err(NullError::dimension("community row", ncols, row.len()));
            }
        }
        let flat: Vec<f64> = rows.iter().flatten().copied().collect();
        Self::new(DMatrix::from_row_slice(rows.len(), ncols, &flat), sample_ids, taxon_ids)
    }

    /// Replace the abundances while keeping both identifier axes.
    ///
    /// Used by null generators whose output has the same shape as the input.
    pub(crate) fn with_data(&self, data: DMatrix<f64>) -> Self {
        debug_assert_eq!(data.shape(), self.data.shape());
        Self {
            data,
            sample_ids: self.sample_ids.clone(),
            taxon_ids: self.taxon_ids.clone(),
        }
    }

    /// Load a community matrix from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with taxon IDs (first column is the sample ID header)
    /// - Subsequent rows: sample ID followed by abundances
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| NullError::EmptyData("Empty TSV file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(NullError::EmptyData(
                "TSV must have at least one taxon".to_string(),
            ));
        }
        let taxon_ids: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();
        let n_taxa = taxon_ids.len();

        let mut values: Vec<f64> = Vec::new();
        let mut sample_ids: Vec<String> = Vec::new();

        for (row_idx, line_result) in lines.enumerate() {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != n_taxa + 1 {
                return Err(NullError::dimension(
                    &format!("row {} of community TSV", row_idx + 1),
                    n_taxa + 1,
                    fields.len(),
                ));
            }
            sample_ids.push(fields[0].trim().to_string());

            for (col_idx, value_str) in fields[1..].iter().enumerate() {
                let value: f64 = value_str.trim().parse().map_err(|_| NullError::InvalidCount {
                    value: value_str.to_string(),
                    row: row_idx,
                    col: col_idx,
                })?;
                values.push(value);
            }
        }

        if sample_ids.is_empty() {
            return Err(NullError::EmptyData("No samples in TSV".to_string()));
        }

        let data = DMatrix::from_row_slice(sample_ids.len(), n_taxa, &values);
        Self::new(data, sample_ids, taxon_ids)
    }

    /// Write the community matrix to a TSV file.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        write!(writer, "sample_id")?;
        for taxon_id in &self.taxon_ids {
            write!(writer, "\t{}", taxon_id)?;
        }
        writeln!(writer)?;

        for (row, sample_id) in self.sample_ids.iter().enumerate() {
            write!(writer, "{}", sample_id)?;
            for col in 0..self.n_taxa() {
                write!(writer, "\t{}", self.data[(row, col)])?;
            }
            writeln!(writer)?;
        }

        Ok(())
    }

    /// Get the value at (sample, taxon).
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[(row, col)]
    }

    /// Number of samples (rows).
    #[inline]
    pub fn n_samples(&self) -> usize {
        self.data.nrows()
    }

    /// Number of taxa (columns).
    #[inline]
    pub fn n_taxa(&self) -> usize {
        self.data.ncols()
    }

    /// Sample identifiers.
    #[inline]
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Taxon identifiers.
    #[inline]
    pub fn taxon_ids(&self) -> &[String] {
        &self.taxon_ids
    }

    /// Get the underlying dense matrix.
    #[inline]
    pub fn data(&self) -> &DMatrix<f64> {
        &self.data
    }

    /// Abundances of one taxon across all samples, in row order.
    pub fn column(&self, col: usize) -> Vec<f64> {
        self.data.column(col).iter().copied().collect()
    }

    /// Total abundance per sample.
    pub fn row_totals(&self) -> Vec<f64> {
        self.data.row_iter().map(|row| row.sum()).collect()
    }

    /// Total abundance per taxon.
    pub fn column_totals(&self) -> Vec<f64> {
        self.data.column_iter().map(|col| col.sum()).collect()
    }

    /// Largest entry of the whole matrix (0 for an empty matrix).
    pub fn max_value(&self) -> f64 {
        self.data.iter().copied().fold(0.0, f64::max)
    }

    /// Number of non-zero cells.
    pub fn n_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0.0).count()
    }

    /// Whether every entry is a whole number.
    pub fn is_integral(&self) -> bool {
        self.data.iter().all(|v| v.fract() == 0.0)
    }

    /// Fail unless every entry is a whole number (required by count-based null models).
    pub fn require_integral(&self) -> Result<()> {
        for row in 0..self.n_samples() {
            for col in 0..self.n_taxa() {
                let value = self.data[(row, col)];
                if value.fract() != 0.0 {
                    return Err(NullError::InvalidCount {
                        value: value.to_string(),
                        row,
                        col,
                    });
                }
            }
        }
        Ok(())
    }

    /// Rows placed in the order given by `order`; row `i` of the result is
    /// row `order[i]` of `self`. Sample identifiers follow their rows.
    pub fn reorder_samples(&self, order: &[usize]) -> Result<Self> {
        check_permutation(order, self.n_samples())?;
        let data = self.data.select_rows(order.iter());
        let sample_ids = order.iter().map(|&i| self.sample_ids[i].clone()).collect();
        Ok(Self {
            data,
            sample_ids,
            taxon_ids: self.taxon_ids.clone(),
        })
    }

    /// Shuffle abundance rows against fixed sample positions.
    ///
    /// Row `i` receives the abundances of row `order[i]` while sample
    /// identifiers stay in place, so anything aligned to sample position
    /// (an environment vector, time order) is decoupled from the data.
    pub(crate) fn shuffled_rows(&self, order: &[usize]) -> Self {
        self.with_data(self.data.select_rows(order.iter()))
    }
}

pub(crate) fn ensure_unique(ids: &[String], kind: &str) -> Result<()> {
    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
        if !seen.insert(id.as_str()) {
            return Err(NullError::InvalidParameter(format!(
                "Duplicate {} identifier '{}'",
                kind, id
            )));
        }
    }
    Ok(())
}

pub(crate) fn check_permutation(order: &[usize], n: usize) -> Result<()> {
    if order.len() != n {
        return Err(NullError::dimension("sample order", n, order.len()));
    }
    let mut seen = vec![false; n];
    for &i in order {
        if i >= n || seen[i] {
            return Err(NullError::InvalidParameter(format!(
                "Sample order is not a permutation of 0..{}",
                n
            )));
        }
        seen[i] = true;
    }
    Ok(())
}
