//! Data structures for null-model community analysis.

pub(crate) mod community;
mod dissimilarity;
mod environment;
mod metadata;
mod result;

pub use community::CommunityMatrix;
pub use dissimilarity::DissimilarityMatrix;
pub use environment::{EnvironmentVector, GroupFactor};
pub use metadata::{Metadata, Variable, VariableType};
pub use result::{ClassificationResult, ClassificationTable, Label, LabelScheme};
