//! nullcomm - null-model classification CLI
//!
//! Command-line interface for rarefaction, null-model classification of taxa,
//! split moving window analysis and pairwise PERMANOVA.

use clap::{Args, Parser, Subcommand, ValueEnum};
use nullcomm::analysis::{
    niche_breadth, niche_value, seasonality, split_window, BreadthIndex, NicheBreadthConfig,
    NicheValueConfig, NicheValueStatistic, SeasonalityConfig, SplitWindowConfig,
};
use nullcomm::correct::CorrectionMethod;
use nullcomm::data::{CommunityMatrix, DissimilarityMatrix, Metadata};
use nullcomm::error::{NullError, Result};
use nullcomm::null::NullMethod;
use nullcomm::pipeline::{run_config, AnalysisConfig, AnalysisOutput};
use nullcomm::rarefy::{rarefy_averaged, RarefyConfig};
use nullcomm::replicate::{Runtime, WorkerPool};
use nullcomm::test::{pairwise_test, PairwiseConfig};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI-friendly null model enum
#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNullMethod {
    /// Fixed row and column totals and fill, counts kept
    Quasiswap,
    /// Fixed incidence margins, presence/absence output
    QuasiswapBinary,
    /// Fixed row and column totals only
    R2dtable,
}

impl From<CliNullMethod> for NullMethod {
    fn from(method: CliNullMethod) -> Self {
        match method {
            CliNullMethod::Quasiswap => NullMethod::Quasiswap,
            CliNullMethod::QuasiswapBinary => NullMethod::QuasiswapBinary,
            CliNullMethod::R2dtable => NullMethod::R2dtable,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliBreadthIndex {
    Levins,
    Shannon,
    Occurrence,
}

impl From<CliBreadthIndex> for BreadthIndex {
    fn from(index: CliBreadthIndex) -> Self {
        match index {
            CliBreadthIndex::Levins => BreadthIndex::Levins,
            CliBreadthIndex::Shannon => BreadthIndex::Shannon,
            CliBreadthIndex::Occurrence => BreadthIndex::Occurrence,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliNicheStatistic {
    /// Abundance-weighted mean of the environment
    WeightedMean,
    /// Environmental range where the taxon is present
    Range,
}

impl From<CliNicheStatistic> for NicheValueStatistic {
    fn from(stat: CliNicheStatistic) -> Self {
        match stat {
            CliNicheStatistic::WeightedMean => NicheValueStatistic::WeightedMean,
            CliNicheStatistic::Range => NicheValueStatistic::NicheRange,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliCorrection {
    Holm,
    Hochberg,
    Bonferroni,
    Bh,
    By,
    None,
}

impl From<CliCorrection> for CorrectionMethod {
    fn from(method: CliCorrection) -> Self {
        match method {
            CliCorrection::Holm => CorrectionMethod::Holm,
            CliCorrection::Hochberg => CorrectionMethod::Hochberg,
            CliCorrection::Bonferroni => CorrectionMethod::Bonferroni,
            CliCorrection::Bh => CorrectionMethod::Bh,
            CliCorrection::By => CorrectionMethod::By,
            CliCorrection::None => CorrectionMethod::None,
        }
    }
}

/// Null-model classification of ecological community matrices
#[derive(Parser)]
#[command(name = "nullcomm")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Worker threads for replicate generation (0 runs sequentially)
    #[arg(long, global = true, default_value = "0")]
    threads: usize,

    /// Random seed
    #[arg(long, global = true, default_value = "42")]
    seed: u64,

    /// Log progress at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Null distribution settings shared by the classification commands.
#[derive(Args)]
struct NullArgs {
    /// Number of null replicates
    #[arg(short = 'n', long, default_value = "1000")]
    replicates: usize,

    /// Lower quantile of the null interval
    #[arg(long, default_value = "0.025")]
    low: f64,

    /// Upper quantile of the null interval
    #[arg(long, default_value = "0.975")]
    high: f64,
}

/// Dissimilarity input: a matrix file, or Bray-Curtis computed from counts.
#[derive(Args)]
struct DistanceArgs {
    /// Path to a square dissimilarity matrix TSV
    #[arg(short, long)]
    distance: Option<PathBuf>,

    /// Path to a community matrix TSV, used for Bray-Curtis when no distance is given
    #[arg(short = 'c', long)]
    counts: Option<PathBuf>,
}

impl DistanceArgs {
    fn load(&self) -> Result<DissimilarityMatrix> {
        match (&self.distance, &self.counts) {
            (Some(path), _) => DissimilarityMatrix::from_tsv(path),
            (None, Some(path)) => {
                info!("no dissimilarity matrix given, using Bray-Curtis");
                DissimilarityMatrix::bray_curtis(&CommunityMatrix::from_tsv(path)?)
            }
            (None, None) => Err(NullError::InvalidParameter(
                "either --distance or --counts is required".to_string(),
            )),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Rarefy a community matrix to a common depth
    Rarefy {
        /// Path to community matrix TSV (samples as rows)
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Output path for the rarefied matrix TSV
        #[arg(short, long)]
        output: PathBuf,

        /// Target depth (default: smallest sample total)
        #[arg(long)]
        depth: Option<u64>,

        /// Number of rarefied matrices to average
        #[arg(long, default_value = "100")]
        repetitions: usize,

        /// Keep fractional averages instead of rounding
        #[arg(long)]
        no_round: bool,
    },

    /// Classify taxa as generalists or specialists
    NicheBreadth {
        /// Path to community matrix TSV (samples as rows)
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Output path for the classification TSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Niche breadth index
        #[arg(long, value_enum, default_value = "levins")]
        index: CliBreadthIndex,

        /// Null model
        #[arg(long, value_enum, default_value = "quasiswap")]
        null_method: CliNullMethod,

        #[command(flatten)]
        null: NullArgs,
    },

    /// Classify taxa by their niche along an environmental variable
    NicheValue {
        /// Path to community matrix TSV (samples as rows)
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Path to metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Continuous metadata column
        #[arg(short, long)]
        env: String,

        /// Niche statistic
        #[arg(long, value_enum, default_value = "weighted-mean")]
        statistic: CliNicheStatistic,

        /// Output path for the classification TSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        null: NullArgs,
    },

    /// Classify taxa time series as seasonal or not
    Seasonality {
        /// Path to community matrix TSV (rows are consecutive time points)
        #[arg(short = 'c', long)]
        counts: PathBuf,

        /// Largest autocorrelation lag (default: floor(10 log10(n)))
        #[arg(long)]
        lag_max: Option<usize>,

        /// Output path for the classification TSV
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        null: NullArgs,
    },

    /// Split moving window analysis along an environmental gradient
    SplitWindow {
        #[command(flatten)]
        input: DistanceArgs,

        /// Path to metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Continuous metadata column defining the gradient
        #[arg(short, long)]
        env: String,

        /// Window size (even, at least 4)
        #[arg(short = 'w', long, default_value = "10")]
        window_size: usize,

        /// Output path (.json for JSON, otherwise TSV)
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        null: NullArgs,
    },

    /// Pairwise PERMANOVA between levels of a grouping variable
    Pairwise {
        #[command(flatten)]
        input: DistanceArgs,

        /// Path to metadata TSV
        #[arg(short, long)]
        metadata: PathBuf,

        /// Categorical metadata column
        #[arg(short, long)]
        group: String,

        /// Number of permutations per pair
        #[arg(short = 'p', long, default_value = "999")]
        permutations: usize,

        /// Multiple testing correction
        #[arg(long, value_enum, default_value = "bh")]
        correction: CliCorrection,

        /// Output path for the results TSV
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run an analysis from a YAML configuration file
    Run {
        /// Path to analysis configuration YAML
        #[arg(short, long)]
        config: PathBuf,

        /// Output path for results
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate an example configuration file
    Example {
        /// Output path for example YAML
        #[arg(short, long, default_value = "analysis.yaml")]
        output: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let pool = match cli.threads {
        0 => None,
        n => Some(WorkerPool::new(n)?),
    };
    let runtime = match &pool {
        Some(pool) => Runtime::parallel(pool),
        None => Runtime::sequential(),
    };
    let seed = cli.seed;

    match cli.command {
        Commands::Rarefy {
            counts,
            output,
            depth,
            repetitions,
            no_round,
        } => {
            let config = RarefyConfig {
                depth,
                repetitions,
                round: !no_round,
                seed,
            };
            let matrix = CommunityMatrix::from_tsv(&counts)?;
            let rarefied = rarefy_averaged(&matrix, &config, &runtime)?;
            finish(AnalysisOutput::Matrix(rarefied), Some(&output))
        }

        Commands::NicheBreadth {
            counts,
            output,
            index,
            null_method,
            null,
        } => {
            let config = NicheBreadthConfig {
                index: index.into(),
                null_method: null_method.into(),
                n_replicates: null.replicates,
                probs: (null.low, null.high),
                seed,
            };
            let matrix = CommunityMatrix::from_tsv(&counts)?;
            let table = niche_breadth(&matrix, &config, &runtime)?;
            finish(AnalysisOutput::Classification(table), output.as_deref())
        }

        Commands::NicheValue {
            counts,
            metadata,
            env,
            statistic,
            output,
            null,
        } => {
            let config = NicheValueConfig {
                statistic: statistic.into(),
                n_replicates: null.replicates,
                probs: (null.low, null.high),
                seed,
            };
            let matrix = CommunityMatrix::from_tsv(&counts)?;
            let environment = Metadata::from_tsv(&metadata)?.environment(&env)?;
            let table = niche_value(&matrix, &environment, &config, &runtime)?;
            finish(AnalysisOutput::Classification(table), output.as_deref())
        }

        Commands::Seasonality {
            counts,
            lag_max,
            output,
            null,
        } => {
            let config = SeasonalityConfig {
                lag_max,
                n_replicates: null.replicates,
                probs: (null.low, null.high),
                seed,
            };
            let matrix = CommunityMatrix::from_tsv(&counts)?;
            let table = seasonality(&matrix, &config, &runtime)?;
            finish(AnalysisOutput::Classification(table), output.as_deref())
        }

        Commands::SplitWindow {
            input,
            metadata,
            env,
            window_size,
            output,
            null,
        } => {
            let config = SplitWindowConfig {
                window_size,
                n_replicates: null.replicates,
                probs: (null.low, null.high),
                seed,
            };
            let dist = input.load()?;
            let environment = Metadata::from_tsv(&metadata)?.environment(&env)?;
            let result = split_window(&dist, &environment, &config, &runtime)?;
            finish(AnalysisOutput::SplitWindow(result), output.as_deref())
        }

        Commands::Pairwise {
            input,
            metadata,
            group,
            permutations,
            correction,
            output,
        } => {
            let config = PairwiseConfig {
                n_permutations: permutations,
                correction: correction.into(),
                seed,
            };
            let dist = input.load()?;
            let factor = Metadata::from_tsv(&metadata)?.factor(&group)?;
            let table = pairwise_test(&dist, &factor, &config, &runtime)?;
            finish(AnalysisOutput::Pairwise(table), output.as_deref())
        }

        Commands::Run { config, output } => {
            info!("loading analysis configuration from {:?}", config);
            let analysis = AnalysisConfig::from_file(&config)?;
            let base = config.parent().unwrap_or_else(|| Path::new("."));
            let result = run_config(&analysis, base, &runtime)?;
            finish(result, output.as_deref())
        }

        Commands::Example { output } => cmd_example(&output),
    }
}

/// Write the result when an output path is given, print it otherwise.
fn finish(result: AnalysisOutput, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            result.write(path)?;
            info!("wrote results to {:?}", path);
            eprint!("{}", result);
        }
        None => print!("{}", result),
    }
    Ok(())
}

/// Generate an example configuration file
fn cmd_example(output_path: &Path) -> Result<()> {
    let yaml = AnalysisConfig::example().to_yaml()?;

    std::fs::write(output_path, &yaml)?;
    eprintln!("Wrote example configuration to {:?}", output_path);
    eprintln!();
    eprintln!("Contents:");
    println!("{}", yaml);

    Ok(())
}
