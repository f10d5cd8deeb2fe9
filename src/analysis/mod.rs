//! Null-model classification analyses.
//!
//! - [`niche_breadth`]: generalist / specialist taxa against margin-preserving nulls
//! - [`niche_value`]: environmental optimum or range against row-shuffled nulls
//! - [`seasonality`]: temporal autocorrelation against row-shuffled nulls
//! - [`split_window`]: community turnover along an environmental gradient

pub mod niche_breadth;
pub mod niche_value;
pub mod seasonality;
pub mod split_window;

pub use niche_breadth::{niche_breadth, BreadthIndex, NicheBreadthConfig};
pub use niche_value::{niche_value, NicheValueConfig, NicheValueStatistic};
pub use seasonality::{seasonality, SeasonalityConfig};
pub use split_window::{
    split_window, SplitWindowConfig, SplitWindowNull, SplitWindowResult, WindowRecord,
};

use crate::classify::classify;
use crate::data::{ClassificationTable, CommunityMatrix, LabelScheme};
use crate::error::{NullError, Result};
use crate::null::NullGenerator;
use crate::replicate::{build_null_distribution, Runtime};
use crate::statistic::StatisticEngine;
use crate::stats::validate_probs;
use tracing::info;

pub(crate) fn check_null_settings(n_replicates: usize, probs: (f64, f64)) -> Result<()> {
    if n_replicates == 0 {
        return Err(NullError::InvalidParameter(
            "At least one null replicate is required".to_string(),
        ));
    }
    validate_probs(probs)
}

/// Shared per-taxon workflow: observed statistic, null distribution, labels.
#[allow(clippy::too_many_arguments)]
pub(crate) fn classify_taxa<G>(
    analysis: &str,
    matrix: &CommunityMatrix,
    generator: &G,
    engine: &StatisticEngine,
    n_replicates: usize,
    seed: u64,
    probs: (f64, f64),
    scheme: LabelScheme,
    runtime: &Runtime<'_>,
) -> Result<ClassificationTable>
where
    G: NullGenerator<Output = CommunityMatrix>,
{
    info!(
        analysis,
        samples = matrix.n_samples(),
        taxa = matrix.n_taxa(),
        statistic = engine.statistic().name(),
        replicates = n_replicates,
        "starting analysis"
    );

    let observed = engine.compute(matrix)?;
    let runner = runtime.runner(n_replicates, seed);
    let null = build_null_distribution(generator, |m| engine.compute(m), matrix.taxon_ids(), &runner)?;
    let table = classify(analysis, &observed, &null, probs, scheme)?;

    info!(
        analysis,
        significant = table.iter().filter(|r| r.label.is_some_and(|l| l.is_significant())).count(),
        "analysis finished"
    );
    Ok(table)
}
