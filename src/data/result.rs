//! Classification labels and result tables.

use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Categorical outcome of comparing an observed value to its null interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    Generalist,
    Specialist,
    Higher,
    Lower,
    SignificantlyHigher,
    SignificantlyLower,
    NonSignificant,
    Significant,
    NotSignificant,
}

impl Label {
    /// Get the output name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Generalist => "GENERALIST",
            Self::Specialist => "SPECIALIST",
            Self::Higher => "HIGHER",
            Self::Lower => "LOWER",
            Self::SignificantlyHigher => "SIGNIFICANTLY_HIGHER",
            Self::SignificantlyLower => "SIGNIFICANTLY_LOWER",
            Self::NonSignificant => "NON_SIGNIFICANT",
            Self::Significant => "SIGNIFICANT",
            Self::NotSignificant => "NOT_SIGNIFICANT",
        }
    }

    /// Whether the label marks a departure from the null interval.
    pub fn is_significant(&self) -> bool {
        !matches!(self, Self::NonSignificant | Self::NotSignificant)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Label vocabulary of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelScheme {
    /// GENERALIST / SPECIALIST / NON_SIGNIFICANT
    NicheBreadth,
    /// HIGHER / LOWER / NON_SIGNIFICANT
    NicheValue,
    /// SIGNIFICANTLY_HIGHER / SIGNIFICANTLY_LOWER / NON_SIGNIFICANT
    Seasonality,
    /// SIGNIFICANT / NOT_SIGNIFICANT, no direction
    TwoSided,
}

impl LabelScheme {
    /// Label for observed values above the upper bound.
    pub fn upper(&self) -> Label {
        match self {
            Self::NicheBreadth => Label::Generalist,
            Self::NicheValue => Label::Higher,
            Self::Seasonality => Label::SignificantlyHigher,
            Self::TwoSided => Label::Significant,
        }
    }

    /// Label for observed values below the lower bound.
    pub fn lower(&self) -> Label {
        match self {
            Self::NicheBreadth => Label::Specialist,
            Self::NicheValue => Label::Lower,
            Self::Seasonality => Label::SignificantlyLower,
            Self::TwoSided => Label::Significant,
        }
    }

    /// Label for observed values inside the interval, bounds included.
    pub fn neutral(&self) -> Label {
        match self {
            Self::TwoSided => Label::NotSignificant,
            _ => Label::NonSignificant,
        }
    }
}

/// Classification of one taxon (or window) against its null distribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Column identifier (taxon ID).
    pub id: String,
    /// Statistic on the observed data.
    pub observed: f64,
    /// Mean of the null replicates, missing values ignored.
    pub mean_simulated: f64,
    /// Lower quantile of the null replicates.
    pub low_ci: f64,
    /// Upper quantile of the null replicates.
    pub upp_ci: f64,
    /// `None` when the observed value or a bound is missing.
    pub label: Option<Label>,
}

/// Per-column classification table produced by one analysis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassificationTable {
    /// Analysis name.
    pub analysis: String,
    /// Quantile probabilities used for the interval.
    pub probs: (f64, f64),
    /// Number of null replicates.
    pub n_replicates: usize,
    /// One row per column, in column order.
    pub results: Vec<ClassificationResult>,
}

impl ClassificationTable {
    /// Number of rows.
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Look up a row by identifier.
    pub fn get(&self, id: &str) -> Option<&ClassificationResult> {
        self.results.iter().find(|r| r.id == id)
    }

    /// Rows carrying a given label.
    pub fn with_label(&self, label: Label) -> Vec<&ClassificationResult> {
        self.results.iter().filter(|r| r.label == Some(label)).collect()
    }

    /// Count rows per label; unlabelled rows are counted under `None`.
    pub fn label_counts(&self) -> Vec<(Option<Label>, usize)> {
        let mut counts: Vec<(Option<Label>, usize)> = Vec::new();
        for r in &self.results {
            match counts.iter_mut().find(|(l, _)| *l == r.label) {
                Some((_, n)) => *n += 1,
                None => counts.push((r.label, 1)),
            }
        }
        counts
    }

    /// Iterate over rows.
    pub fn iter(&self) -> impl Iterator<Item = &ClassificationResult> {
        self.results.iter()
    }

    /// Write the table to a TSV file. Missing labels are written as `NA`.
    pub fn to_tsv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);

        writeln!(writer, "id\tobserved\tmean_simulated\tlow_ci\tupp_ci\tsign")?;
        for r in &self.results {
            writeln!(
                writer,
                "{}\t{}\t{}\t{}\t{}\t{}",
                r.id,
                r.observed,
                r.mean_simulated,
                r.low_ci,
                r.upp_ci,
                r.label.map(|l| l.name()).unwrap_or("NA")
            )?;
        }

        Ok(())
    }
}

impl std::fmt::Display for ClassificationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({} replicates)", self.analysis, self.n_replicates)?;
        writeln!(f, "  Columns classified: {}", self.len())?;
        for (label, n) in self.label_counts() {
            let name = label.map(|l| l.name()).unwrap_or("NA");
            writeln!(f, "  {:<22} {}", name, n)?;
        }
        Ok(())
    }
}
