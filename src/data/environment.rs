//! Per-sample environmental variables and grouping factors.

use crate::data::community::ensure_unique;
use crate::error::{NullError, Result};
use std::collections::{BTreeSet, HashMap};

/// One numeric value per sample. Missing values are stored as NaN.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvironmentVector {
    sample_ids: Vec<String>,
    values: Vec<f64>,
}

impl EnvironmentVector {
    /// Create an environment vector; `values[i]` belongs to `sample_ids[i]`.
    pub fn new(sample_ids: Vec<String>, values: Vec<f64>) -> Result<Self> {
        if sample_ids.len() != values.len() {
            return Err(NullError::dimension("environment values", sample_ids.len(), values.len()));
        }
        ensure_unique(&sample_ids, "sample")?;
        Ok(Self { sample_ids, values })
    }

    /// Sample identifiers.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Values in sample order (NaN marks a missing value).
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of missing values.
    pub fn n_missing(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Reorder to follow `sample_ids`, which must name exactly the same samples.
    pub fn align_to(&self, sample_ids: &[String]) -> Result<Self> {
        let order = alignment(&self.sample_ids, sample_ids, "environment vector")?;
        Ok(Self {
            sample_ids: sample_ids.to_vec(),
            values: order.iter().map(|&i| self.values[i]).collect(),
        })
    }
}

/// One categorical label per sample. Missing labels are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupFactor {
    sample_ids: Vec<String>,
    labels: Vec<Option<String>>,
}

impl GroupFactor {
    /// Create a factor; `labels[i]` belongs to `sample_ids[i]`.
    pub fn new(sample_ids: Vec<String>, labels: Vec<Option<String>>) -> Result<Self> {
        if sample_ids.len() != labels.len() {
            return Err(NullError::dimension("factor labels", sample_ids.len(), labels.len()));
        }
        ensure_unique(&sample_ids, "sample")?;
        Ok(Self { sample_ids, labels })
    }

    /// Convenience constructor for fully observed labels.
    pub fn from_labels<S: AsRef<str>>(sample_ids: Vec<String>, labels: &[S]) -> Result<Self> {
        let labels = labels.iter().map(|l| Some(l.as_ref().to_string())).collect();
        Self::new(sample_ids, labels)
    }

    /// Sample identifiers.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Labels in sample order.
    pub fn labels(&self) -> &[Option<String>] {
        &self.labels
    }

    /// Distinct non-missing levels in sorted order.
    pub fn levels(&self) -> Vec<String> {
        self.labels
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Indices of samples carrying `level`.
    pub fn indices_of(&self, level: &str) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.as_deref() == Some(level))
            .map(|(i, _)| i)
            .collect()
    }

    /// Reorder to follow `sample_ids`, which must name exactly the same samples.
    pub fn align_to(&self, sample_ids: &[String]) -> Result<Self> {
        let order = alignment(&self.sample_ids, sample_ids, "group factor")?;
        Ok(Self {
            sample_ids: sample_ids.to_vec(),
            labels: order.iter().map(|&i| self.labels[i].clone()).collect(),
        })
    }
}

/// Positions in `source` of each id in `target`.
fn alignment(source: &[String], target: &[String], what: &str) -> Result<Vec<usize>> {
    if source.len() != target.len() {
        return Err(NullError::dimension(what, target.len(), source.len()));
    }
    let index: HashMap<&str, usize> = source
        .iter()
        .enumerate()
        .map(|(i, id)| (id.as_str(), i))
        .collect();
    target
        .iter()
        .map(|id| {
            index.get(id.as_str()).copied().ok_or_else(|| {
                NullError::SampleMismatch(format!("Sample '{}' not found in {}", id, what))
            })
        })
        .collect()
}
