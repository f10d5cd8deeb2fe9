//! Sample metadata: environmental gradients and grouping factors.

use crate::data::{EnvironmentVector, GroupFactor};
use crate::error::{NullError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A metadata value that can be categorical or continuous.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Variable {
    /// Categorical variable with string levels.
    Categorical(String),
    /// Continuous numeric variable.
    Continuous(f64),
    /// Missing value.
    Missing,
}

impl Variable {
    /// Try to get as continuous f64.
    pub fn as_continuous(&self) -> Option<f64> {
        match self {
            Variable::Continuous(v) => Some(*v),
            _ => None,
        }
    }
}

/// Inferred type of a metadata column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VariableType {
    Categorical,
    Continuous,
}

/// Sample metadata containing variables for each sample.
#[derive(Debug, Clone, Default)]
pub struct Metadata {
    /// Sample IDs in file order.
    sample_ids: Vec<String>,
    /// Column names.
    column_names: Vec<String>,
    /// Data stored as sample_id -> column_name -> Variable.
    data: HashMap<String, HashMap<String, Variable>>,
    /// Inferred type for each column.
    column_types: HashMap<String, VariableType>,
}

fn is_missing_token(raw: &str) -> bool {
    raw.is_empty() || raw == "NA" || raw == "na" || raw == "NaN"
}

impl Metadata {
    /// Load metadata from a TSV file.
    ///
    /// Expected format:
    /// - First row: header with column names (first column is sample ID)
    /// - Subsequent rows: sample ID followed by variable values
    ///
    /// Columns are continuous if every non-missing value parses as a number,
    /// otherwise categorical. Empty cells and `NA` are missing.
    pub fn from_tsv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lines = reader.lines();

        let header_line = lines
            .next()
            .ok_or_else(|| NullError::EmptyData("Empty metadata file".to_string()))??;
        let header: Vec<&str> = header_line.split('\t').collect();
        if header.len() < 2 {
            return Err(NullError::EmptyData(
                "Metadata must have at least one variable column".to_string(),
            ));
        }
        let column_names: Vec<String> = header[1..].iter().map(|s| s.trim().to_string()).collect();

        // First pass: collect raw values to infer types
        let mut raw_data: Vec<(String, Vec<String>)> = Vec::new();
        for line_result in lines {
            let line = line_result?;
            if line.trim().is_empty() {
                continue;
            }
            let fields: Vec<&str> = line.split('\t').collect();
            let sample_id = fields[0].trim().to_string();
            let values: Vec<String> = fields[1..].iter().map(|s| s.trim().to_string()).collect();
            raw_data.push((sample_id, values));
        }

        if raw_data.is_empty() {
            return Err(NullError::EmptyData("No samples in metadata".to_string()));
        }

        let mut column_types = HashMap::new();
        for (col_idx, col_name) in column_names.iter().enumerate() {
            let all_numeric = raw_data.iter().all(|(_, values)| match values.get(col_idx) {
                None => true,
                Some(v) => is_missing_token(v) || v.parse::<f64>().is_ok(),
            });
            let var_type = if all_numeric {
                VariableType::Continuous
            } else {
                VariableType::Categorical
            };
            column_types.insert(col_name.clone(), var_type);
        }

        let mut sample_ids = Vec::new();
        let mut data = HashMap::new();

        for (sample_id, values) in raw_data {
            if data.contains_key(&sample_id) {
                return Err(NullError::SampleMismatch(format!(
                    "Duplicate sample '{}' in metadata",
                    sample_id
                )));
            }
            sample_ids.push(sample_id.clone());
            let mut sample_data = HashMap::new();

            for (col_idx, col_name) in column_names.iter().enumerate() {
                let var = match values.get(col_idx) {
                    None => Variable::Missing,
                    Some(raw) if is_missing_token(raw) => Variable::Missing,
                    Some(raw) => match column_types.get(col_name) {
                        Some(VariableType::Continuous) => raw
                            .parse::<f64>()
                            .map(Variable::Continuous)
                            .unwrap_or(Variable::Missing),
                        Some(VariableType::Categorical) | None => {
                            Variable::Categorical(raw.clone())
                        }
                    },
                };
                sample_data.insert(col_name.clone(), var);
            }
            data.insert(sample_id, sample_data);
        }

        Ok(Self {
            sample_ids,
            column_names,
            data,
            column_types,
        })
    }

    /// Sample IDs in order.
    pub fn sample_ids(&self) -> &[String] {
        &self.sample_ids
    }

    /// Column names.
    pub fn column_names(&self) -> &[String] {
        &self.column_names
    }

    /// Number of samples.
    pub fn n_samples(&self) -> usize {
        self.sample_ids.len()
    }

    /// Get a variable value for a specific sample and column.
    pub fn get(&self, sample_id: &str, column: &str) -> Option<&Variable> {
        self.data.get(sample_id).and_then(|m| m.get(column))
    }

    /// Get all values for a column, in sample order.
    pub fn column(&self, column: &str) -> Result<Vec<&Variable>> {
        if !self.has_column(column) {
            return Err(NullError::MissingColumn(column.to_string()));
        }
        Ok(self
            .sample_ids
            .iter()
            .map(|sid| {
                self.data
                    .get(sid)
                    .and_then(|m| m.get(column))
                    .unwrap_or(&Variable::Missing)
            })
            .collect())
    }

    /// Get the inferred type of a column.
    pub fn column_type(&self, column: &str) -> Option<VariableType> {
        self.column_types.get(column).copied()
    }

    /// Check if a column exists.
    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Extract a continuous column as an environment vector.
    pub fn environment(&self, column: &str) -> Result<EnvironmentVector> {
        if self.column_type(column) == Some(VariableType::Categorical) {
            return Err(NullError::InvalidParameter(format!(
                "Column '{}' is categorical, expected numeric values",
                column
            )));
        }
        let values = self
            .column(column)?
            .into_iter()
            .map(|v| v.as_continuous().unwrap_or(f64::NAN))
            .collect();
        EnvironmentVector::new(self.sample_ids.clone(), values)
    }

    /// Extract a column as a grouping factor. Numeric columns are treated
    /// as labels using their textual form.
    pub fn factor(&self, column: &str) -> Result<GroupFactor> {
        let labels = self
            .column(column)?
            .into_iter()
            .map(|v| match v {
                Variable::Categorical(s) => Some(s.clone()),
                Variable::Continuous(x) => Some(x.to_string()),
                Variable::Missing => None,
            })
            .collect();
        GroupFactor::new(self.sample_ids.clone(), labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_tsv() -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tsite\ttemperature").unwrap();
        writeln!(file, "S1\tlake\t12.5").unwrap();
        writeln!(file, "S2\triver\t15.0").unwrap();
        writeln!(file, "S3\tlake\tNA").unwrap();
        writeln!(file, "S4\t\t9.25").unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_metadata() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        assert_eq!(meta.n_samples(), 4);
        assert_eq!(meta.sample_ids(), &["S1", "S2", "S3", "S4"]);
        assert_eq!(meta.column_names(), &["site", "temperature"]);
        assert_eq!(meta.column_type("site"), Some(VariableType::Categorical));
        assert_eq!(meta.column_type("temperature"), Some(VariableType::Continuous));
    }

    #[test]
    fn test_environment_column() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let env = meta.environment("temperature").unwrap();
        assert_eq!(env.values()[0], 12.5);
        assert!(env.values()[2].is_nan());
        assert_eq!(env.n_missing(), 1);

        assert!(meta.environment("site").is_err());
        assert!(matches!(meta.environment("depth"), Err(NullError::MissingColumn(_))));
    }

    #[test]
    fn test_factor_column() {
        let file = create_test_tsv();
        let meta = Metadata::from_tsv(file.path()).unwrap();

        let factor = meta.factor("site").unwrap();
        assert_eq!(factor.levels(), vec!["lake", "river"]);
        assert_eq!(factor.labels()[3], None);
    }

    #[test]
    fn test_duplicate_sample_rejected() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "sample_id\tsite").unwrap();
        writeln!(file, "S1\ta").unwrap();
        writeln!(file, "S1\tb").unwrap();
        file.flush().unwrap();

        assert!(Metadata::from_tsv(file.path()).is_err());
    }
}
