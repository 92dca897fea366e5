use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::prelude::*;
use refcluster::cluster::{AnnealingParams, DeterministicAnnealing};

fn bench_annealing(c: &mut Criterion) {
    let mut group = c.benchmark_group("annealing");

    // Synthetic data
    let mut rng = StdRng::seed_from_u64(42);
    let n = 500;
    let d = 4;

    let data: Vec<Vec<f64>> = (0..n)
        .map(|_| (0..d).map(|_| rng.random::<f64>()).collect())
        .collect();

    group.bench_function("fit_n500_d4_k2", |b| {
        b.iter(|| {
            let mut model = DeterministicAnnealing::new(AnnealingParams {
                n_clusters: 2,
                distribution: vec![0.3, 0.7],
                max_iters: 200,
                seed: Some(42),
                ..Default::default()
            })
            .unwrap();
            model.fit(black_box(&data)).unwrap();
        })
    });

    group.bench_function("fit_enforced_n500_d4_k5", |b| {
        b.iter(|| {
            let mut model = DeterministicAnnealing::new(AnnealingParams {
                n_clusters: 5,
                distribution: vec![0.2; 5],
                max_iters: 200,
                seed: Some(42),
                ..Default::default()
            })
            .unwrap();
            model.fit_with(black_box(&data), None, true).unwrap();
        })
    });

    group.finish();
}

criterion_group!(benches, bench_annealing);
criterion_main!(benches);
