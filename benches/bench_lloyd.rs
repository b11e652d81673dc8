use criterion::{criterion_group, criterion_main, Criterion};
use lloyd_parallel::{cluster_with_reporter, generate_grid_points, ClusterConfig, Executor};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn bench_lloyd(c: &mut Criterion) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let points = generate_grid_points(20_000, &mut rng);
    let config = ClusterConfig {
        k: 8,
        workers: 4,
        ..ClusterConfig::default()
    };
    c.bench_function("lloyd_threads_20k_k8_w4", |b| {
        b.iter(|| {
            let _run = cluster_with_reporter(&points, &config, &mut ()).expect("threads bench run");
        });
    });

    let rayon_config = ClusterConfig {
        executor: Executor::Rayon,
        ..config.clone()
    };
    c.bench_function("lloyd_rayon_20k_k8_w4", |b| {
        b.iter(|| {
            let _run =
                cluster_with_reporter(&points, &rayon_config, &mut ()).expect("rayon bench run");
        });
    });

    let single = ClusterConfig {
        workers: 1,
        ..config
    };
    c.bench_function("lloyd_single_worker_20k_k8", |b| {
        b.iter(|| {
            let _run = cluster_with_reporter(&points, &single, &mut ()).expect("single bench run");
        });
    });
}

criterion_group!(benches, bench_lloyd);
criterion_main!(benches);
