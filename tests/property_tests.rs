use proptest::prelude::*;
use refcluster::cluster::{target_counts, AnnealingParams, Clustering, DeterministicAnnealing};
use refcluster::metrics::{js_divergence, kl_divergence, total_variation_distance};

fn model(k: usize) -> DeterministicAnnealing {
    DeterministicAnnealing::new(AnnealingParams {
        n_clusters: k,
        distribution: vec![1.0 / k as f64; k],
        max_iters: 50,
        seed: Some(42),
        ..Default::default()
    })
    .unwrap()
}

fn sizes(labels: &[usize], k: usize) -> Vec<usize> {
    let mut out = vec![0; k];
    for &l in labels {
        out[l] += 1;
    }
    out
}

proptest! {
    #[test]
    fn prop_annealing_labels_in_range(
        data in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 2), 1..20),
        k in 1usize..5
    ) {
        // Skip if k > n
        if k <= data.len() {
            let mut m = model(k);
            let labels = m.fit_predict(&data).unwrap();

            prop_assert_eq!(labels.len(), data.len());
            for &l in &labels {
                prop_assert!(l < k);
            }
            let inertia = m.inertia().unwrap();
            prop_assert!(inertia.is_finite() && inertia >= 0.0);
        }
    }

    #[test]
    fn prop_enforcement_is_exact_and_idempotent(
        data in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 3), 4..30),
        k in 2usize..4
    ) {
        let mut m = model(k);
        let labels = m.fit_with(&data, None, true).unwrap().labels.clone();
        let expected = target_counts(m.distribution(), data.len());
        prop_assert_eq!(sizes(&labels, k), expected.clone());

        let again = m.enforce_cluster_distribution(&data).unwrap();
        prop_assert_eq!(again, expected);
        prop_assert_eq!(m.labels().unwrap(), &labels[..]);
    }

    #[test]
    fn prop_predict_matches_dimensions(
        train in prop::collection::vec(prop::collection::vec(-5.0f64..5.0, 2), 2..15),
        test in prop::collection::vec(prop::collection::vec(-5.0f64..5.0, 2), 1..10)
    ) {
        let mut m = model(2);
        m.fit(&train).unwrap();
        let labels = m.predict(&test).unwrap();
        prop_assert_eq!(labels.len(), test.len());
        prop_assert!(labels.iter().all(|&l| l < 2));
    }

    #[test]
    fn prop_js_is_symmetric(p in 0.0f64..=1.0, q in 0.0f64..=1.0) {
        let a = [p, 1.0 - p];
        let b = [q, 1.0 - q];
        let ab = js_divergence(&a, &b).unwrap();
        let ba = js_divergence(&b, &a).unwrap();
        prop_assert!((ab - ba).abs() < 1e-12);
    }

    #[test]
    fn prop_tvd_is_bounded(p in 0.0f64..=1.0, q in 0.0f64..=1.0) {
        let tvd = total_variation_distance(&[p, 1.0 - p], &[q, 1.0 - q]).unwrap();
        prop_assert!((0.0..=1.0).contains(&tvd));
    }

    #[test]
    fn prop_self_divergence_is_zero(p in 0.0f64..=1.0) {
        let a = [p, 1.0 - p];
        prop_assert!(kl_divergence(&a, &a).unwrap().abs() < 1e-6);
        prop_assert!(js_divergence(&a, &a).unwrap().abs() < 1e-6);
        prop_assert_eq!(total_variation_distance(&a, &a).unwrap(), 0.0);
    }
}
