//! Configured analysis runs.

use crate::analysis::{
    niche_breadth, niche_value, seasonality, split_window, NicheBreadthConfig, NicheValueConfig,
    SeasonalityConfig, SplitWindowConfig, SplitWindowResult,
};
use crate::data::{ClassificationTable, CommunityMatrix, DissimilarityMatrix, Metadata};
use crate::error::{NullError, Result};
use crate::rarefy::{rarefy_averaged, RarefyConfig};
use crate::replicate::Runtime;
use crate::test::{pairwise_test, PairwiseConfig, PairwiseTable};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// The analysis performed by a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Analysis {
    /// Averaged rarefaction of the community matrix.
    Rarefy(RarefyConfig),
    /// Generalist / specialist classification.
    NicheBreadth(NicheBreadthConfig),
    /// Niche value along a continuous metadata column.
    NicheValue {
        environment: String,
        #[serde(default)]
        config: NicheValueConfig,
    },
    /// Seasonality of taxa, rows read as time points.
    Seasonality(SeasonalityConfig),
    /// Split moving window along a continuous metadata column.
    SplitWindow {
        environment: String,
        #[serde(default)]
        config: SplitWindowConfig,
    },
    /// Pairwise PERMANOVA between levels of a categorical metadata column.
    Pairwise {
        group: String,
        #[serde(default)]
        config: PairwiseConfig,
    },
}

impl Analysis {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Rarefy(_) => "rarefy",
            Self::NicheBreadth(_) => "niche_breadth",
            Self::NicheValue { .. } => "niche_value",
            Self::Seasonality(_) => "seasonality",
            Self::SplitWindow { .. } => "split_window",
            Self::Pairwise { .. } => "pairwise",
        }
    }
}

/// Input files of a run. Relative paths resolve against the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InputPaths {
    /// Community matrix TSV (samples as rows).
    pub community: Option<PathBuf>,
    /// Sample metadata TSV.
    pub metadata: Option<PathBuf>,
    /// Square dissimilarity matrix TSV.
    pub distance: Option<PathBuf>,
}

/// One configured run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub inputs: InputPaths,
    /// Rarefy the community matrix before the analysis.
    #[serde(default)]
    pub rarefy: Option<RarefyConfig>,
    pub analysis: Analysis,
}

impl AnalysisConfig {
    /// Load from YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(NullError::from)
    }

    /// Load from a YAML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// Save to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(NullError::from)
    }

    /// Template with every section filled in.
    pub fn example() -> Self {
        Self {
            name: "niche-value-temperature".to_string(),
            description: Some("Weighted-mean temperature niche of each taxon".to_string()),
            inputs: InputPaths {
                community: Some(PathBuf::from("counts.tsv")),
                metadata: Some(PathBuf::from("metadata.tsv")),
                distance: None,
            },
            rarefy: Some(RarefyConfig::default()),
            analysis: Analysis::NicheValue {
                environment: "temperature".to_string(),
                config: NicheValueConfig::default(),
            },
        }
    }
}

/// Loaded inputs.
#[derive(Debug, Clone, Default)]
pub struct AnalysisData {
    pub community: Option<CommunityMatrix>,
    pub metadata: Option<Metadata>,
    pub distance: Option<DissimilarityMatrix>,
}

impl AnalysisData {
    /// Read every input named in `inputs`, resolving relative paths against `base`.
    pub fn load(inputs: &InputPaths, base: &Path) -> Result<Self> {
        let resolve = |p: &PathBuf| if p.is_absolute() { p.clone() } else { base.join(p) };
        Ok(Self {
            community: inputs
                .community
                .as_ref()
                .map(|p| CommunityMatrix::from_tsv(resolve(p)))
                .transpose()?,
            metadata: inputs
                .metadata
                .as_ref()
                .map(|p| Metadata::from_tsv(resolve(p)))
                .transpose()?,
            distance: inputs
                .distance
                .as_ref()
                .map(|p| DissimilarityMatrix::from_tsv(resolve(p)))
                .transpose()?,
        })
    }

    fn community(&self) -> Result<&CommunityMatrix> {
        self.community
            .as_ref()
            .ok_or_else(|| NullError::InvalidParameter("a community matrix is required".to_string()))
    }

    fn metadata(&self) -> Result<&Metadata> {
        self.metadata
            .as_ref()
            .ok_or_else(|| NullError::InvalidParameter("sample metadata is required".to_string()))
    }

    /// The given dissimilarity matrix, or Bray-Curtis from the community matrix.
    fn distance(&self) -> Result<DissimilarityMatrix> {
        match (&self.distance, &self.community) {
            (Some(d), _) => Ok(d.clone()),
            (None, Some(c)) => DissimilarityMatrix::bray_curtis(c),
            (None, None) => Err(NullError::InvalidParameter(
                "a dissimilarity or community matrix is required".to_string(),
            )),
        }
    }
}

/// Result of a run.
#[derive(Debug, Clone)]
pub enum AnalysisOutput {
    Matrix(CommunityMatrix),
    Classification(ClassificationTable),
    SplitWindow(SplitWindowResult),
    Pairwise(PairwiseTable),
}

impl AnalysisOutput {
    /// Write as TSV; the split-window result goes to JSON when the path ends in `.json`.
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match self {
            Self::Matrix(m) => m.to_tsv(path),
            Self::Classification(t) => t.to_tsv(path),
            Self::Pairwise(t) => t.to_tsv(path),
            Self::SplitWindow(r) => {
                if path.extension().is_some_and(|e| e == "json") {
                    r.to_json(path)
                } else {
                    r.to_tsv(path)
                }
            }
        }
    }
}

impl std::fmt::Display for AnalysisOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matrix(m) => writeln!(
                f,
                "Community matrix: {} samples x {} taxa",
                m.n_samples(),
                m.n_taxa()
            ),
            Self::Classification(t) => write!(f, "{}", t),
            Self::SplitWindow(r) => write!(f, "{}", r),
            Self::Pairwise(t) => write!(f, "{}", t),
        }
    }
}

/// Run `config.analysis` on already loaded data.
pub fn run_analysis(
    config: &AnalysisConfig,
    data: &AnalysisData,
    runtime: &Runtime<'_>,
) -> Result<AnalysisOutput> {
    info!(run = %config.name, analysis = config.analysis.name(), "running configured analysis");

    let rarefied;
    let data = match (&config.rarefy, &data.community) {
        (Some(r), Some(c)) => {
            rarefied = AnalysisData {
                community: Some(rarefy_averaged(c, r, runtime)?),
                metadata: data.metadata.clone(),
                distance: data.distance.clone(),
            };
            &rarefied
        }
        _ => data,
    };

    let output = match &config.analysis {
        Analysis::Rarefy(r) => AnalysisOutput::Matrix(rarefy_averaged(data.community()?, r, runtime)?),
        Analysis::NicheBreadth(c) => {
            AnalysisOutput::Classification(niche_breadth(data.community()?, c, runtime)?)
        }
        Analysis::NicheValue {
            environment,
            config: c,
        } => {
            let env = data.metadata()?.environment(environment)?;
            AnalysisOutput::Classification(niche_value(data.community()?, &env, c, runtime)?)
        }
        Analysis::Seasonality(c) => {
            AnalysisOutput::Classification(seasonality(data.community()?, c, runtime)?)
        }
        Analysis::SplitWindow {
            environment,
            config: c,
        } => {
            let env = data.metadata()?.environment(environment)?;
            AnalysisOutput::SplitWindow(split_window(&data.distance()?, &env, c, runtime)?)
        }
        Analysis::Pairwise { group, config: c } => {
            let factor = data.metadata()?.factor(group)?;
            AnalysisOutput::Pairwise(pairwise_test(&data.distance()?, &factor, c, runtime)?)
        }
    };
    Ok(output)
}

/// Load the inputs named in `config` and run it.
pub fn run_config(config: &AnalysisConfig, base: &Path, runtime: &Runtime<'_>) -> Result<AnalysisOutput> {
    let data = AnalysisData::load(&config.inputs, base)?;
    run_analysis(config, &data, runtime)
}
