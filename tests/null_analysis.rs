//! Integration tests for the null-model analyses.

use nullcomm::prelude::*;
use nullcomm::replicate::replicate_rng;
use std::io::Write;
use tempfile::NamedTempFile;

/// Create synthetic community data along a gradient.
fn create_synthetic_counts() -> CommunityMatrix {
    // 30 samples x 12 taxa
    // - taxa 0-3: abundant everywhere
    // - taxa 4-7: restricted to one third of the gradient each
    // - taxa 8-11: sparse, present in every fifth sample
    let n_samples = 30;
    let n_taxa = 12;

    let mut rng_seed = 42u64;
    let simple_rand = |seed: &mut u64| -> f64 {
        *seed = seed.wrapping_mul(1103515245).wrapping_add(12345);
        ((*seed >> 16) & 0x7FFF) as f64 / 32768.0
    };

    let rows: Vec<Vec<f64>> = (0..n_samples)
        .map(|s| {
            (0..n_taxa)
                .map(|t| {
                    let base = match t {
                        0..=3 => 60.0,
                        4..=7 if s * 3 / n_samples == (t - 4) % 3 => 40.0,
                        8..=11 if s % 5 == t - 8 => 15.0,
                        _ => 0.0,
                    };
                    (base * (0.8 + 0.4 * simple_rand(&mut rng_seed))).round()
                })
                .collect()
        })
        .collect();

    let sample_ids = (0..n_samples).map(|i| format!("sample_{}", i)).collect();
    let taxon_ids = (0..n_taxa).map(|i| format!("taxon_{}", i)).collect();
    CommunityMatrix::from_rows(&rows, sample_ids, taxon_ids).unwrap()
}

/// Create metadata matching the synthetic counts.
fn create_synthetic_metadata() -> Metadata {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "sample_id\tsite\tdepth").unwrap();
    for i in 0..30 {
        let site = ["A", "B", "C"][i / 10];
        writeln!(file, "sample_{}\t{}\t{}", i, site, 2.5 * i as f64).unwrap();
    }
    file.flush().unwrap();
    Metadata::from_tsv(file.path()).unwrap()
}

fn check_table(table: &ClassificationTable, matrix: &CommunityMatrix, scheme: LabelScheme) {
    let ids: Vec<&str> = table.iter().map(|r| r.id.as_str()).collect();
    let expected: Vec<&str> = matrix.taxon_ids().iter().map(|s| s.as_str()).collect();
    assert_eq!(ids, expected);

    for r in table.iter() {
        if r.low_ci.is_finite() && r.upp_ci.is_finite() {
            assert!(r.low_ci <= r.upp_ci, "{}: {} > {}", r.id, r.low_ci, r.upp_ci);
        }
        assert_eq!(r.label, classify_value(r.observed, r.low_ci, r.upp_ci, scheme));
    }
}

#[test]
fn test_niche_breadth_table() {
    let counts = create_synthetic_counts();
    let table = niche_breadth(&counts, &NicheBreadthConfig::quick(), &Runtime::sequential()).unwrap();

    assert_eq!(table.n_replicates, 100);
    check_table(&table, &counts, LabelScheme::NicheBreadth);
    assert!(table
        .iter()
        .all(|r| r.observed > 0.0 && r.observed <= counts.n_samples() as f64));
}

#[test]
fn test_niche_value_table() {
    let counts = create_synthetic_counts();
    let env = create_synthetic_metadata().environment("depth").unwrap();
    let table = niche_value(&counts, &env, &NicheValueConfig::quick(), &Runtime::sequential()).unwrap();

    check_table(&table, &counts, LabelScheme::NicheValue);
    // taxon_4 lives in the shallow third, taxon_6 in the deep third.
    assert_eq!(table.get("taxon_4").unwrap().label, Some(Label::Lower));
    assert_eq!(table.get("taxon_6").unwrap().label, Some(Label::Higher));
}

#[test]
fn test_parallel_matches_sequential() {
    let counts = create_synthetic_counts();
    let config = NicheBreadthConfig {
        n_replicates: 40,
        ..NicheBreadthConfig::default()
    };
    let pool = WorkerPool::new(3).unwrap();

    let seq = niche_breadth(&counts, &config, &Runtime::sequential()).unwrap();
    let par = niche_breadth(&counts, &config, &Runtime::parallel(&pool)).unwrap();
    for (a, b) in seq.iter().zip(par.iter()) {
        assert_eq!(a.low_ci.to_bits(), b.low_ci.to_bits());
        assert_eq!(a.upp_ci.to_bits(), b.upp_ci.to_bits());
        assert_eq!(a.label, b.label);
    }
}

#[test]
fn test_null_swap_keeps_margins() {
    let counts = create_synthetic_counts();
    for method in [NullMethod::Quasiswap, NullMethod::R2dtable] {
        let mut rng = replicate_rng(7, 0);
        let null = null_swap(&counts, method, &mut rng).unwrap();
        assert_eq!(null.row_totals(), counts.row_totals());
        assert_eq!(null.column_totals(), counts.column_totals());
    }
}

#[test]
fn test_rarefy_single_draw_hits_depth() {
    let counts = create_synthetic_counts();
    let depth = min_depth(&counts).unwrap();
    let config = RarefyConfig {
        repetitions: 1,
        round: false,
        ..RarefyConfig::default()
    };
    let rarefied = rarefy_averaged(&counts, &config, &Runtime::sequential()).unwrap();

    for total in rarefied.row_totals() {
        assert_eq!(total, depth as f64);
    }
    for i in 0..counts.n_samples() {
        for j in 0..counts.n_taxa() {
            assert!(rarefied.get(i, j) <= counts.get(i, j));
        }
    }
}

#[test]
fn test_pairwise_enumerates_all_pairs() {
    let counts = create_synthetic_counts();
    let dist = DissimilarityMatrix::bray_curtis(&counts).unwrap();
    let sites = create_synthetic_metadata().factor("site").unwrap();

    let table = pairwise_test(&dist, &sites, &PairwiseConfig::quick(), &Runtime::sequential()).unwrap();
    let pairs: Vec<&str> = table.results.iter().map(|r| r.pair.as_str()).collect();
    assert_eq!(pairs, vec!["A <-> B", "A <-> C", "B <-> C"]);

    for r in &table.results {
        assert_eq!(r.n_samples, 20);
        assert!(r.p_value > 0.0 && r.p_value <= 1.0);
        assert!(r.p_adjusted >= r.p_value);
        assert!(r.r_squared >= 0.0 && r.r_squared <= 1.0);
    }
}

#[test]
fn test_split_window_counts() {
    let counts = create_synthetic_counts();
    let dist = DissimilarityMatrix::bray_curtis(&counts).unwrap();
    let env = create_synthetic_metadata().environment("depth").unwrap();
    let config = SplitWindowConfig {
        window_size: 6,
        ..SplitWindowConfig::quick()
    };

    let result = split_window(&dist, &env, &config, &Runtime::sequential()).unwrap();
    assert_eq!(result.n_windows(), 30 - 6);
    assert_eq!(result.membership.len(), 30 - 6);
    assert!(result
        .membership
        .iter()
        .all(|m| m.iter().filter(|&&x| x).count() == 6));
    assert_eq!(result.null.values.len(), 100);
    assert!(result.null.low_ci <= result.null.upp_ci);
}

#[test]
fn test_cancelled_run() {
    let counts = create_synthetic_counts();
    let token = CancelToken::new();
    token.cancel();
    let runtime = Runtime::sequential().with_cancel_token(token);

    let err = niche_breadth(&counts, &NicheBreadthConfig::quick(), &runtime).unwrap_err();
    assert!(matches!(err, NullError::Cancelled { completed: 0 }));
}

#[test]
fn test_result_output() {
    let counts = create_synthetic_counts();
    let env = create_synthetic_metadata().environment("depth").unwrap();
    let table = niche_value(&counts, &env, &NicheValueConfig::quick(), &Runtime::sequential()).unwrap();

    let file = NamedTempFile::new().unwrap();
    table.to_tsv(file.path()).unwrap();
    let content = std::fs::read_to_string(file.path()).unwrap();
    let mut lines = content.lines();
    assert_eq!(
        lines.next().unwrap(),
        "id\tobserved\tmean_simulated\tlow_ci\tupp_ci\tsign"
    );
    assert_eq!(lines.count(), counts.n_taxa());
}
