//! Benchmarks for result deduplication and budgeting.
#![cfg_attr(
    test,
    allow(
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use shopkeep_core::ScoredProduct;
use shopkeep_routing::{
    BackendKind, BudgetConfig, ResultCombiner, StageId, StageResult, StageStatus,
};
use shopkeep_benchmarks_criterion::catalog;

/// Stage results where every stage overlaps half of the previous one
fn overlapping_results(stages: usize, per_stage: usize) -> Vec<StageResult> {
    let products = catalog(stages * per_stage);
    (0..stages)
        .map(|stage| {
            let start = stage * per_stage / 2;
            StageResult {
                stage: StageId::new(stage + 1),
                backend: BackendKind::Graph,
                description: format!("stage {}", stage + 1),
                subject: String::new(),
                status: StageStatus::Ok,
                records: products.products()[start..start + per_stage]
                    .iter()
                    .map(|product| ScoredProduct::new(product.clone(), 0.0))
                    .collect(),
                used_fallback: false,
                elapsed_ms: 0,
            }
        })
        .collect()
}

/// Benchmark combination with the default budget
fn bench_combine(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("combine");
    let combiner = ResultCombiner::default();

    for (stages, per_stage) in [(1, 10), (2, 50), (4, 100)] {
        let results = overlapping_results(stages, per_stage);
        group.throughput(Throughput::Elements((stages * per_stage) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{stages}x{per_stage}")),
            &results,
            |bencher, results| {
                bencher.iter(|| combiner.combine(black_box(results)));
            },
        );
    }

    group.finish();
}

/// Benchmark combination without truncation
fn bench_combine_unbounded(criterion: &mut Criterion) {
    let combiner = ResultCombiner::new(BudgetConfig {
        result_units: usize::MAX,
        max_results: usize::MAX,
    });
    let results = overlapping_results(4, 100);

    criterion.bench_function("combine_unbounded_4x100", |bencher| {
        bencher.iter(|| combiner.combine(black_box(&results)));
    });
}

criterion_group!(benches, bench_combine, bench_combine_unbounded);
criterion_main!(benches);
