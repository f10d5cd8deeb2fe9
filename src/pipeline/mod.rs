//! YAML-configured analysis runs.

mod runner;

pub use runner::{
    run_analysis, run_config, Analysis, AnalysisConfig, AnalysisData, AnalysisOutput, InputPaths,
};
