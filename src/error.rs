//! Error types for the nullcomm library.

use thiserror::Error;

/// Main error type for the library.
#[derive(Error, Debug)]
pub enum NullError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid count value '{value}' at row {row}, column {col}")]
    InvalidCount {
        value: String,
        row: usize,
        col: usize,
    },

    #[error("Rarefaction depth {depth} exceeds total count {total} of sample '{sample}'")]
    InvalidDepth {
        sample: String,
        total: u64,
        depth: u64,
    },

    #[error("Pairwise testing needs at least 2 factor levels, found {found}")]
    InsufficientLevels { found: usize },

    #[error("Group '{level}' has {n} sample(s); at least 2 are required")]
    DegenerateGroup { level: String, n: usize },

    #[error("Invalid window size {size} for {n_samples} samples: {reason}")]
    InvalidWindowSize {
        size: usize,
        n_samples: usize,
        reason: String,
    },

    #[error("Asymmetric dissimilarity matrix: {0}")]
    AsymmetricMatrix(String),

    #[error("Null replicate {replicate} failed: {reason}")]
    ReplicateGeneration { replicate: usize, reason: String },

    #[error("Dimension mismatch in {what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: String,
        expected: usize,
        actual: usize,
    },

    #[error("Sample ID mismatch: {0}")]
    SampleMismatch(String),

    #[error("Missing column '{0}' in metadata")]
    MissingColumn(String),

    #[error("Empty data: {0}")]
    EmptyData(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Analysis cancelled after {completed} replicate(s)")]
    Cancelled { completed: usize },

    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NullError {
    pub(crate) fn dimension(what: &str, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            what: what.to_string(),
            expected,
            actual,
        }
    }
}

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, NullError>;
