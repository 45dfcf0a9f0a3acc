//! Benchmarks for the sequential test core.
//!
//! Performance budgets:
//! - Single-stream update: < 50ns
//! - Mixture update (window 256): < 5µs
//!
//! Run with: cargo bench -p stcp-families --bench stcp_bench

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use stcp_core::{Combination, GeneralE, GeneralEValue, Stcp, StcpConfig, SufficientStat};
use stcp_families::{BernoulliLlr, NormalLlr};
use std::hint::black_box;

/// Deterministic observations around a mild upward drift.
fn observations(len: usize) -> Vec<f64> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (0..len)
        .map(|_| {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            ((state >> 11) as f64 / (1u64 << 53) as f64) * 2.0 - 0.8
        })
        .collect()
}

fn normal() -> NormalLlr {
    NormalLlr::upward(0.0, 1.0, 0.0).unwrap()
}

// =============================================================================
// Per-observation updates by combination policy
// =============================================================================

fn bench_update_by_policy(c: &mut Criterion) {
    let mut group = c.benchmark_group("general_e/update");
    let xs = observations(1024);
    group.throughput(Throughput::Elements(xs.len() as u64));

    let policies = [
        ("single", Combination::Single),
        ("mixture_16", Combination::Mixture { window: 16 }),
        ("mixture_256", Combination::Mixture { window: 256 }),
        ("maximum_256", Combination::Maximum { window: 256 }),
    ];
    for (name, combination) in policies {
        group.bench_with_input(BenchmarkId::new("normal", name), &xs, |b, xs| {
            b.iter(|| {
                let mut e = GeneralE::new(normal(), combination).unwrap();
                for &x in xs {
                    e.update_log_value(black_box(x)).unwrap();
                }
                black_box(e.log_value())
            })
        });
    }

    group.finish();
}

// =============================================================================
// Batch path vs repeated updates
// =============================================================================

fn bench_batch_vs_sequence(c: &mut Criterion) {
    let mut group = c.benchmark_group("general_e/batch");

    for n in [16usize, 256] {
        let combination = Combination::Mixture { window: 64 };
        group.bench_with_input(BenchmarkId::new("by_avg", n), &n, |b, &n| {
            b.iter(|| {
                let mut e = GeneralE::new(normal(), combination).unwrap();
                e.update_log_value_by_avg(black_box(0.4), n as f64).unwrap();
                black_box(e.log_value())
            })
        });
        group.bench_with_input(BenchmarkId::new("repeated", n), &n, |b, &n| {
            b.iter(|| {
                let mut e = GeneralE::new(normal(), combination).unwrap();
                for _ in 0..n {
                    e.update_log_value(black_box(0.4)).unwrap();
                }
                black_box(e.log_value())
            })
        });
    }

    group.finish();
}

// =============================================================================
// Controller sequences
// =============================================================================

fn bench_controller(c: &mut Criterion) {
    let mut group = c.benchmark_group("stcp/sequence");
    let xs = observations(4096);
    let cfg = StcpConfig::default().with_combination(Combination::Mixture { window: 64 });

    group.throughput(Throughput::Elements(xs.len() as u64));
    group.bench_function("update_log_values", |b| {
        b.iter(|| {
            let mut stcp = Stcp::from_config(normal(), &cfg).unwrap();
            stcp.update_log_values(black_box(&xs)).unwrap();
            black_box(stcp.snapshot())
        })
    });
    group.bench_function("update_and_return_histories", |b| {
        b.iter(|| {
            let mut stcp = Stcp::from_config(normal(), &cfg).unwrap();
            black_box(stcp.update_and_return_histories(black_box(&xs)).unwrap())
        })
    });

    let stats: Vec<SufficientStat> = xs
        .chunks(32)
        .filter_map(SufficientStat::from_observations)
        .collect();
    group.bench_function("update_log_values_by_avgs", |b| {
        b.iter(|| {
            let lr = BernoulliLlr::upward(0.3, 0.0).unwrap();
            let mut stcp = Stcp::new(GeneralE::single(lr), cfg.threshold).unwrap();
            stcp.update_log_values_by_avgs(black_box(&stats)).unwrap();
            black_box(stcp.log_value())
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_update_by_policy,
    bench_batch_vs_sequence,
    bench_controller,
);
criterion_main!(benches);
