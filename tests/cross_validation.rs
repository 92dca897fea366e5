use rand::prelude::*;
use refcluster::{
    Error, FeatureGroups, FeatureTable, InstitutionId, InstitutionResult, LeaveOneOut, LooConfig,
    ScoreLabel,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn jitter(rng: &mut StdRng) -> f64 {
    rng.random_range(-0.2..0.2)
}

fn high_output(rng: &mut StdRng) -> Vec<Option<f64>> {
    vec![
        Some(2.0 + jitter(rng)),
        Some(5.0),
        Some(3.0 + jitter(rng)),
        Some(2.5 + jitter(rng)),
    ]
}

fn low_output(rng: &mut StdRng) -> Vec<Option<f64>> {
    vec![
        Some(-1.5 + jitter(rng)),
        Some(75.0),
        Some(0.4 + jitter(rng)),
        // Missing views impact, imputed from training rows.
        None,
    ]
}

/// Five institutions; 1 and 5 only have high-scoring outputs.
fn scenario() -> (FeatureTable, Vec<InstitutionResult>) {
    let features = FeatureGroups::default().features().unwrap();
    let mut table = FeatureTable::from_features(&features);
    let mut rng = StdRng::seed_from_u64(7);

    let counts: [(InstitutionId, u64, u64); 5] = [(1, 6, 0), (2, 3, 3), (3, 0, 6), (4, 4, 2), (5, 4, 0)];
    let mut results = Vec::new();
    for (id, high, low) in counts {
        for _ in 0..high {
            table.push(id, high_output(&mut rng)).unwrap();
        }
        for _ in 0..low {
            table.push(id, low_output(&mut rng)).unwrap();
        }
        results.push(InstitutionResult::new(id, high, low));
    }
    (table, results)
}

fn config() -> LooConfig {
    LooConfig::default()
        .with_max_iters(300)
        .with_enforce_distribution(true)
}

#[test]
fn every_institution_is_held_out_once() {
    init_tracing();
    let (table, results) = scenario();
    let report = LeaveOneOut::new(config()).run(&table, &results).unwrap();

    assert_eq!(report.folds(), 5);
    let held_out: Vec<InstitutionId> = report.outcomes.iter().map(|o| o.institution).collect();
    assert_eq!(held_out, vec![1, 2, 3, 4, 5]);

    for outcome in &report.outcomes {
        assert_eq!(outcome.train_outputs + outcome.test_outputs, table.len());
        assert!((outcome.predicted_high + outcome.predicted_low - 100.0).abs() < 1e-9);
        assert!((outcome.actual_high + outcome.actual_low - 100.0).abs() < 1e-9);
        assert!((0.0..=1.0).contains(&outcome.divergence.tvd));
        assert!(outcome.quality.inertia >= 0.0);

        let [high, low] = &outcome.profiles;
        assert_eq!(high.label, ScoreLabel::HighScoringOutputs);
        assert_eq!(high.cluster, outcome.labels.high_scoring);
        assert_eq!(low.cluster, outcome.labels.low_scoring);
        assert_eq!(high.size + low.size, outcome.train_outputs);
    }

    for (name, value) in report.to_map() {
        assert!(value.is_finite(), "{name} is not finite");
    }
}

#[test]
fn target_distribution_excludes_held_out_institution() {
    let (table, results) = scenario();
    let report = LeaveOneOut::new(config()).run(&table, &results).unwrap();

    // 17 high and 11 low outputs overall.
    let fold_3 = report.outcomes.iter().find(|o| o.institution == 3).unwrap();
    assert!((fold_3.target_distribution[0] - 17.0 / 22.0).abs() < 1e-12);
    assert_eq!(fold_3.actual_high, 0.0);

    let fold_1 = report.outcomes.iter().find(|o| o.institution == 1).unwrap();
    assert!((fold_1.target_distribution[0] - 11.0 / 22.0).abs() < 1e-12);
    assert_eq!(fold_1.actual_high, 100.0);
}

#[test]
fn seeded_runs_are_reproducible() {
    let (table, results) = scenario();
    let a = LeaveOneOut::new(config()).run(&table, &results).unwrap();
    let b = LeaveOneOut::new(config()).run(&table, &results).unwrap();
    assert_eq!(a, b);
}

#[test]
fn report_serializes() {
    let (table, results) = scenario();
    let report = LeaveOneOut::new(config()).run(&table, &results).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcomes"].as_array().unwrap().len(), 5);
    assert_eq!(json["features"][0], "normalised_citations");
    let profile = &json["outcomes"][0]["profiles"][0];
    assert_eq!(profile["label"], "high_scoring_outputs");
    assert_eq!(profile["features"][0]["feature"], "normalised_citations");
}

#[test]
fn institution_without_outputs_aborts_the_run() {
    let (mut table, mut results) = scenario();
    table.push(9, vec![Some(0.0), Some(50.0), Some(1.0), Some(1.0)]).unwrap();
    results.push(InstitutionResult::new(9, 0, 0));

    match LeaveOneOut::new(config()).run(&table, &results) {
        Err(Error::Fold { institution, source }) => {
            assert_eq!(institution, 9);
            assert!(matches!(*source, Error::DivisionByZero { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn all_missing_training_column_aborts_the_run() {
    let groups = FeatureGroups {
        citations: true,
        output_metrics: false,
        journal_metrics: false,
        authors: false,
    };
    let mut table = FeatureTable::from_features(&groups.features().unwrap());
    for id in [1, 1, 2, 2, 3] {
        table.push(id, vec![None]).unwrap();
    }
    let results = [
        InstitutionResult::new(1, 2, 0),
        InstitutionResult::new(2, 1, 1),
        InstitutionResult::new(3, 0, 1),
    ];

    let err = LeaveOneOut::new(config().with_features(groups))
        .run(&table, &results)
        .unwrap_err();
    match err {
        Error::Fold { institution, source } => {
            assert_eq!(institution, 1);
            assert!(matches!(*source, Error::UndefinedImputation { .. }));
        }
        other => panic!("unexpected {other:?}"),
    }
}
