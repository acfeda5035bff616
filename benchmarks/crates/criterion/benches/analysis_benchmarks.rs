//! Benchmarks for query analysis and plan generation.
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
use shopkeep_routing::{CategoryLexicon, PlanGenerator, QueryAnalyzer};

const QUERIES: [(&str, &str); 5] = [
    ("simple", "zapatillas rojas para hombre"),
    ("similarity", "productos similares al Metcon 9 en talla 42"),
    ("price", "alternativas más baratas que el Nano X3 por debajo de 120 dólares"),
    ("comparison", "comparar Nike Air Zoom vs Adidas Ultraboost"),
    ("recommendation", "what's the best jacket for hiking in the rain"),
];

fn analyzer() -> QueryAnalyzer {
    QueryAnalyzer::new(CategoryLexicon::default())
        .unwrap_or_else(|err| panic!("Failed to build analyzer: {err}"))
}

/// Benchmark activation, classification and extraction
fn bench_analysis(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("query_analysis");
    let analyzer = analyzer();

    for (name, query) in QUERIES {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(name), &query, |bencher, &query| {
            bencher.iter(|| analyzer.analyze(black_box(query)));
        });
    }

    group.finish();
}

/// Benchmark analysis followed by plan generation
fn bench_planning(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("plan_generation");
    let analyzer = analyzer();
    let generator = PlanGenerator::default();

    for (name, query) in QUERIES {
        group.bench_with_input(BenchmarkId::from_parameter(name), &query, |bencher, &query| {
            bencher.iter(|| {
                let analysis = analyzer.analyze(black_box(query));
                if analysis.active {
                    generator.generate(analysis.intent, analysis.parameters).ok()
                } else {
                    Some(generator.direct(query))
                }
            });
        });
    }

    group.finish();
}

/// Benchmark analyzer construction, which compiles every cue pattern
fn bench_compile(criterion: &mut Criterion) {
    criterion.bench_function("analyzer_compile", |bencher| {
        bencher.iter(|| QueryAnalyzer::new(black_box(CategoryLexicon::default())));
    });
}

criterion_group!(benches, bench_analysis, bench_planning, bench_compile);
criterion_main!(benches);
