//! Rationalization Performance Benchmarks
//!
//! Measures the pass over synthetic functions:
//! - Straight-line local stores (nodes/second)
//! - Mixed blocks exercising every rewrite rule
//! - Cost of the invariant checks

use criterion::{
    black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput,
};
use jit_benchmarks::{mixed_function, straight_line_function};
use jit_rationalize::{rationalize, RationalizeConfig, TargetInfo};

fn bench_straight_line(c: &mut Criterion) {
    let mut group = c.benchmark_group("rationalize_straight_line");
    let target = TargetInfo::x64();
    let config = RationalizeConfig::default().with_invariant_checks(false);

    for statements in [16usize, 256, 4096] {
        let func = straight_line_function(statements);
        group.throughput(Throughput::Elements(func.node_count() as u64));

        group.bench_with_input(
            BenchmarkId::from_parameter(statements),
            &func,
            |b, func| {
                b.iter_batched(
                    || func.clone(),
                    |mut func| {
                        rationalize(&mut func, &target, &config).expect("rationalize");
                        black_box(func)
                    },
                    BatchSize::SmallInput,
                )
            },
        );
    }

    group.finish();
}

fn bench_mixed(c: &mut Criterion) {
    let mut group = c.benchmark_group("rationalize_mixed");
    let target = TargetInfo::x64();
    let config = RationalizeConfig::default().with_invariant_checks(false);

    for blocks in [8usize, 128, 1024] {
        let func = mixed_function(blocks);
        group.throughput(Throughput::Elements(func.node_count() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(blocks), &func, |b, func| {
            b.iter_batched(
                || func.clone(),
                |mut func| {
                    rationalize(&mut func, &target, &config).expect("rationalize");
                    black_box(func)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_invariant_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("rationalize_checks");
    let target = TargetInfo::x64();
    let func = mixed_function(128);

    for (name, checked) in [("unchecked", false), ("checked", true)] {
        let config = RationalizeConfig::default().with_invariant_checks(checked);
        group.bench_with_input(BenchmarkId::new("mixed_128", name), &func, |b, func| {
            b.iter_batched(
                || func.clone(),
                |mut func| {
                    rationalize(&mut func, &target, &config).expect("rationalize");
                    black_box(func)
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_straight_line,
    bench_mixed,
    bench_invariant_checks
);

criterion_main!(benches);
