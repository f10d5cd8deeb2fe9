//! Null-model classification of ecological community matrices.
//!
//! Observed per-taxon statistics are compared against distributions obtained
//! from randomized replicates of the data, and each taxon (or sample window)
//! is labelled by where its observed value falls relative to the null
//! quantile interval.
//!
//! # Overview
//!
//! - **data**: Core data structures (CommunityMatrix, DissimilarityMatrix, Metadata, results)
//! - **rarefy**: Averaged rarefaction to a common sequencing depth
//! - **null**: Null-model generators (quasiswap, r2dtable, row shuffles)
//! - **replicate**: Seeded replicate execution, sequential or on a worker pool
//! - **statistic**: Per-taxon statistics computed on observed and null matrices
//! - **classify**: Quantile intervals and labels
//! - **analysis**: Niche breadth, niche value, seasonality, split moving window
//! - **test**: PERMANOVA and pairwise PERMANOVA
//! - **correct**: Multiple testing correction
//! - **pipeline**: YAML-configured runs
//!
//! # Example
//!
//! ```no_run
//! use nullcomm::prelude::*;
//!
//! let counts = CommunityMatrix::from_tsv("counts.tsv").unwrap();
//! let pool = WorkerPool::new(4).unwrap();
//! let runtime = Runtime::parallel(&pool);
//!
//! let table = niche_breadth(&counts, &NicheBreadthConfig::default(), &runtime).unwrap();
//! for r in table.with_label(Label::Generalist) {
//!     println!("{}: observed {:.3} > {:.3}", r.id, r.observed, r.upp_ci);
//! }
//! ```

pub mod analysis;
pub mod classify;
pub mod correct;
pub mod data;
pub mod error;
pub mod null;
pub mod pipeline;
pub mod rarefy;
pub mod replicate;
pub mod statistic;
pub mod stats;
pub mod test;

/// Convenient re-exports for common usage.
pub mod prelude {
    pub use crate::analysis::{
        niche_breadth, niche_value, seasonality, split_window, BreadthIndex, NicheBreadthConfig,
        NicheValueConfig, NicheValueStatistic, SeasonalityConfig, SplitWindowConfig,
        SplitWindowResult, WindowRecord,
    };
    pub use crate::classify::{classify, classify_value};
    pub use crate::correct::{p_adjust, CorrectionMethod};
    pub use crate::data::{
        ClassificationResult, ClassificationTable, CommunityMatrix, DissimilarityMatrix,
        EnvironmentVector, GroupFactor, Label, LabelScheme, Metadata,
    };
    pub use crate::error::{NullError, Result};
    pub use crate::null::{null_swap, NullGenerator, NullMethod, RowShuffle, SwapGenerator};
    pub use crate::pipeline::{run_config, Analysis, AnalysisConfig, AnalysisOutput};
    pub use crate::rarefy::{min_depth, rarefy_averaged, rarefy_once, RarefyConfig};
    pub use crate::replicate::{
        build_null_distribution, CancelToken, NullReplicateSet, ReplicateRunner, Runtime,
        WorkerPool,
    };
    pub use crate::statistic::{ColumnStatistic, StatisticEngine};
    pub use crate::test::{
        pairwise_test, permanova, PairwiseConfig, PairwiseTable, PermanovaConfig, PermanovaResult,
    };
}
