// Benchmarks the two operations on the hot path of biometric admission:
// sequential `add` (the write path held under the single-writer lock) and
// `search` against a populated index (the read path every admission and
// every duplicate check exercises).

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use happydog_core::vectorindex::VectorIndex;

const DIMENSION: usize = 512;

fn vector_for(seed: u32) -> Vec<f32> {
    (0..DIMENSION).map(|i| ((seed as f32) * 0.0001 + i as f32).sin()).collect()
}

fn bench_add(c: &mut Criterion) {
    c.bench_function("vectorindex_add_sequential", |b| {
        b.iter_batched(
            || {
                let dir = tempfile::tempdir().unwrap();
                let index = VectorIndex::open(dir.path().join("idx.bin"), DIMENSION).unwrap();
                (index, dir)
            },
            |(index, _dir)| {
                for i in 0..100u32 {
                    index.add(black_box(&vector_for(i))).unwrap();
                }
            },
            criterion::BatchSize::SmallInput,
        )
    });
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("vectorindex_search");
    for size in [100usize, 1_000, 10_000] {
        let dir = tempfile::tempdir().unwrap();
        let index = VectorIndex::open(dir.path().join("idx.bin"), DIMENSION).unwrap();
        for i in 0..size as u32 {
            index.add(&vector_for(i)).unwrap();
        }
        let query = vector_for(size as u32 / 2);
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| index.search(black_box(&query), 1).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, bench_add, bench_search);
criterion_main!(benches);
