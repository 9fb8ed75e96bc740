//! Benchmark for the evaluation backends.
//!
//! Measures the same map/filter/sort chain on every strategy, and the cost
//! of repeated materialization where the strategies differ most.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lazuli::backend::{Backend, Buffered, Eager, Lazy, Snap};
use std::hint::black_box;

fn chain<B>(backend: &B) -> usize
where
    B: Backend<i64, Rebind<i64> = B>,
{
    backend
        .map(|value| value * 3)
        .filter(|value| value % 2 == 0)
        .sort_by(|left, right| right.cmp(left))
        .size()
        .unwrap_or_default()
}

// =============================================================================
// Single Materialization
// =============================================================================

fn benchmark_chain(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("backend_chain");

    for size in [100_i64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::new("eager", size), &size, |bencher, &size| {
            bencher.iter(|| black_box(chain(&Eager::from_iter(0..size))));
        });

        group.bench_with_input(BenchmarkId::new("lazy", size), &size, |bencher, &size| {
            bencher.iter(|| black_box(chain(&Lazy::new(move || 0..size))));
        });

        group.bench_with_input(
            BenchmarkId::new("buffered", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| black_box(chain(&Buffered::from_source(0..size))));
            },
        );

        group.bench_with_input(BenchmarkId::new("snap", size), &size, |bencher, &size| {
            bencher.iter(|| black_box(chain(&Snap::wrap(Lazy::new(move || 0..size)))));
        });
    }

    group.finish();
}

// =============================================================================
// Repeated Materialization
// =============================================================================

fn benchmark_repeated_reads(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("backend_repeated_reads");
    let size = 1_000_i64;

    group.bench_function("lazy_recomputes", |bencher| {
        let lazy = Lazy::new(move || 0..size).map(|value| value + 1);
        bencher.iter(|| {
            for _ in 0..10 {
                black_box(lazy.size().unwrap_or_default());
            }
        });
    });

    group.bench_function("buffered_replays", |bencher| {
        bencher.iter(|| {
            let buffered = Buffered::from_source(0..size).map(|value| value + 1);
            for _ in 0..10 {
                black_box(buffered.size().unwrap_or_default());
            }
        });
    });

    group.bench_function("snap_memoizes", |bencher| {
        bencher.iter(|| {
            let snap = Snap::wrap(Lazy::new(move || 0..size)).map(|value| value + 1);
            for _ in 0..10 {
                black_box(snap.size().unwrap_or_default());
            }
        });
    });

    group.finish();
}

criterion_group!(benches, benchmark_chain, benchmark_repeated_reads);
criterion_main!(benches);
