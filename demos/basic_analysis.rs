//! Basic example demonstrating the null-model analyses.
//!
//! This example shows how to:
//! 1. Build a community matrix and environment in memory
//! 2. Rarefy to a common depth
//! 3. Classify taxa by niche breadth and niche value
//! 4. Run a split moving window and pairwise PERMANOVA on Bray-Curtis

use nullcomm::prelude::*;

fn main() -> Result<()> {
    println!("=== nullcomm Example ===\n");

    let (counts, environment, sites) = create_example_data()?;

    println!("Data dimensions:");
    println!("  Samples: {}", counts.n_samples());
    println!("  Taxa:    {}", counts.n_taxa());
    println!();

    let pool = WorkerPool::with_reserved(1)?;
    let runtime = Runtime::parallel(&pool);
    println!("Using {} worker thread(s)\n", pool.n_threads());

    println!("=== Rarefaction ===\n");
    let rarefied = rarefy_averaged(&counts, &RarefyConfig::quick(), &runtime)?;
    println!("Rarefied to depth {}\n", min_depth(&counts)?);

    println!("=== Niche breadth ===\n");
    let breadth = niche_breadth(&rarefied, &NicheBreadthConfig::quick(), &runtime)?;
    print!("{}", breadth);
    println!();

    println!("=== Niche value (temperature) ===\n");
    let value = niche_value(&rarefied, &environment, &NicheValueConfig::quick(), &runtime)?;
    for r in value.iter().filter(|r| r.label.is_some_and(|l| l.is_significant())) {
        println!(
            "  {}: observed {:.2}, null [{:.2}, {:.2}] -> {}",
            r.id,
            r.observed,
            r.low_ci,
            r.upp_ci,
            r.label.map(|l| l.name()).unwrap_or("NA")
        );
    }
    println!();

    let dist = DissimilarityMatrix::bray_curtis(&rarefied)?;

    println!("=== Split moving window ===\n");
    let config = SplitWindowConfig {
        window_size: 6,
        ..SplitWindowConfig::quick()
    };
    let windows = split_window(&dist, &environment, &config, &runtime)?;
    println!(
        "{} of {} windows mark a significant boundary\n",
        windows.significant().len(),
        windows.n_windows()
    );

    println!("=== Pairwise PERMANOVA (site) ===\n");
    let pairs = pairwise_test(&dist, &sites, &PairwiseConfig::quick(), &runtime)?;
    print!("{}", pairs);

    Ok(())
}

/// Twenty-four samples along a temperature gradient at three sites.
fn create_example_data() -> Result<(CommunityMatrix, EnvironmentVector, GroupFactor)> {
    let n = 24;
    let sample_ids: Vec<String> = (0..n).map(|i| format!("sample_{:02}", i + 1)).collect();
    let taxon_ids: Vec<String> = ["warm", "cold", "common", "patchy", "rare"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    let rows: Vec<Vec<f64>> = (0..n)
        .map(|i| {
            let t = i as f64 / (n - 1) as f64;
            vec![
                (80.0 * t).round() + 2.0,
                (80.0 * (1.0 - t)).round() + 2.0,
                40.0 + (i % 3) as f64,
                if i % 4 == 0 { 30.0 } else { 0.0 },
                (i % 2) as f64,
            ]
        })
        .collect();
    let counts = CommunityMatrix::from_rows(&rows, sample_ids.clone(), taxon_ids)?;

    let temperature = (0..n).map(|i| 4.0 + 0.75 * i as f64).collect();
    let environment = EnvironmentVector::new(sample_ids.clone(), temperature)?;

    let sites: Vec<&str> = (0..n).map(|i| ["north", "middle", "south"][i * 3 / n]).collect();
    let factor = GroupFactor::from_labels(sample_ids, &sites)?;

    Ok((counts, environment, factor))
}
