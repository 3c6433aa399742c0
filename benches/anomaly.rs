use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use htm_anomaly::{
    AnomalyScorer, AnomalyScorerParams, SpatialPooler, SpatialPoolerParams, TemporalMemory,
    TemporalMemoryParams,
};
use rand::{rngs::StdRng, seq::index::sample, Rng, SeedableRng};

fn random_input(rng: &mut StdRng, size: usize) -> Vec<bool> {
    (0..size).map(|_| rng.random_bool(0.1)).collect()
}

fn bench_spatial_pooler(c: &mut Criterion) {
    let mut group = c.benchmark_group("spatial_pooler");

    for &(inputs, columns) in &[(100, 500), (1000, 2048)] {
        let mut rng = StdRng::seed_from_u64(1);
        let input = random_input(&mut rng, inputs);
        let mut sp = SpatialPooler::new(SpatialPoolerParams {
            input_size: inputs,
            column_count: columns,
            ..Default::default()
        })
        .unwrap();

        group.bench_with_input(
            BenchmarkId::new("compute", format!("{inputs}x{columns}")),
            &input,
            |b, input| b.iter(|| black_box(sp.compute(input, false).len())),
        );
    }

    group.finish();
}

fn bench_temporal_memory(c: &mut Criterion) {
    let columns = 500;
    let active = 10;
    let mut rng = StdRng::seed_from_u64(2);
    let steps: Vec<Vec<usize>> = (0..64)
        .map(|_| sample(&mut rng, columns, active).into_vec())
        .collect();
    let mut tm = TemporalMemory::new(TemporalMemoryParams {
        column_count: columns,
        ..Default::default()
    })
    .unwrap();

    let mut i = 0;
    c.bench_function("temporal_memory/compute_learn", |b| {
        b.iter(|| {
            let (active_cells, _) = tm.compute(&steps[i % steps.len()], true);
            i += 1;
            black_box(active_cells.len())
        })
    });
}

fn bench_scorer(c: &mut Criterion) {
    let sp = SpatialPooler::new(SpatialPoolerParams {
        input_size: 100,
        column_count: 500,
        ..Default::default()
    })
    .unwrap();
    let tm = TemporalMemory::new(TemporalMemoryParams {
        column_count: 500,
        ..Default::default()
    })
    .unwrap();
    let mut scorer = AnomalyScorer::new(sp, tm, AnomalyScorerParams::default()).unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    let inputs: Vec<Vec<bool>> = (0..16).map(|_| random_input(&mut rng, 100)).collect();

    let mut i = 0;
    c.bench_function("anomaly_scorer/compute_anomaly", |b| {
        b.iter(|| {
            let score = scorer.compute_anomaly(&inputs[i % inputs.len()], true);
            i += 1;
            black_box(score)
        })
    });
}

criterion_group!(
    benches,
    bench_spatial_pooler,
    bench_temporal_memory,
    bench_scorer
);
criterion_main!(benches);
