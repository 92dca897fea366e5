//! Leave-one-out evaluation on a small synthetic set of institutions.
//!
//! Run with `RUST_LOG=debug` to see every annealing run and enforcement move.

use rand::prelude::*;
use refcluster::features::{infer_missing_top_percentile, normalise_citations_by_year};
use refcluster::{
    FeatureGroups, FeatureTable, InstitutionResult, LeaveOneOut, LooConfig, StarProfile,
};
use tracing_subscriber::EnvFilter;

struct Output {
    institution: u64,
    year: i32,
    citations: Option<f64>,
    top_percentile: Option<f64>,
    fwci: f64,
    fwvi: f64,
}

fn main() -> refcluster::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut rng = StdRng::seed_from_u64(2021);

    // (institution, outputs, 4*, 3*, 2*, 1*, unclassified)
    let profiles = [
        (10007783u64, 12usize, 60.0, 40.0, 0.0, 0.0, 0.0),
        (10007800, 20, 6.3, 63.5, 28.6, 1.6, 0.0),
        (10007856, 10, 10.0, 30.0, 50.0, 10.0, 0.0),
        (10007833, 9, 0.0, 33.3, 55.6, 11.1, 0.0),
        (10000001, 10, 50.0, 50.0, 0.0, 0.0, 0.0),
    ];

    let mut outputs = Vec::new();
    let mut results = Vec::new();
    for (institution, n, four, three, two, one, unclassified) in profiles {
        let profile = StarProfile {
            four_star: four,
            three_star: three,
            two_star: two,
            one_star: one,
            unclassified,
        };
        let result = InstitutionResult::from_star_profile(institution, &profile, n);
        for i in 0..n as u64 {
            let strong = i < result.high_scoring_outputs;
            let citations = if strong { rng.random_range(20.0..300.0) } else { rng.random_range(0.0..25.0) };
            outputs.push(Output {
                institution,
                year: rng.random_range(2014..2021),
                citations: rng.random_bool(0.95).then_some(citations),
                top_percentile: match (strong, rng.random_bool(0.5)) {
                    (true, true) => Some(10.0),
                    (true, false) => Some(25.0),
                    (false, true) => Some(50.0),
                    (false, false) => None,
                },
                fwci: if strong { rng.random_range(1.5..4.0) } else { rng.random_range(0.1..1.2) },
                fwvi: if strong { rng.random_range(1.0..3.0) } else { rng.random_range(0.2..1.0) },
            });
        }
        println!(
            "{institution}: {} high, {} low",
            result.high_scoring_outputs, result.low_scoring_outputs
        );
        results.push(result);
    }

    let citations: Vec<Option<f64>> = outputs.iter().map(|o| o.citations).collect();
    let years: Vec<i32> = outputs.iter().map(|o| o.year).collect();
    let normalised = normalise_citations_by_year(&citations, &years)?;
    let top: Vec<Option<f64>> = outputs.iter().map(|o| o.top_percentile).collect();
    let top = infer_missing_top_percentile(&top);

    let groups = FeatureGroups::default();
    let mut table = FeatureTable::from_features(&groups.features()?);
    for (i, output) in outputs.iter().enumerate() {
        table.push(
            output.institution,
            vec![normalised[i], Some(top[i]), Some(output.fwci), Some(output.fwvi)],
        )?;
    }

    let config = LooConfig::default()
        .with_features(groups)
        .with_enforce_distribution(true);
    let report = LeaveOneOut::new(config).run(&table, &results)?;

    println!("\n=== Per fold ===");
    for fold in &report.outcomes {
        println!(
            "  {}: actual {:5.1}% high, predicted {:5.1}% high (tvd {:.3})",
            fold.institution, fold.actual_high, fold.predicted_high, fold.divergence.tvd
        );
    }

    println!("\n=== Averages ===");
    for (name, value) in report.to_map() {
        println!("  {name:<24} {value:.4}");
    }
    Ok(())
}
