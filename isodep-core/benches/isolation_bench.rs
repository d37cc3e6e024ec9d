//! Criterion benchmarks for isolation hot paths.
//!
//! Benchmarks:
//! 1. Veto descriptor parsing
//! 2. Deposit query within a cone, with and without vetoes
//! 3. Full isolator over synthetic events (constant vs expression weight)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use isodep_core::synthetic::EventGenerator;
use isodep_core::veto::{center_all, parse_vetos};
use isodep_core::{CandIsolator, DepositConfig, Direction, IsoDeposit, IsolatorConfig};

// ── Helpers ──────────────────────────────────────────────────────────

fn dense_deposit(n: usize) -> IsoDeposit {
    let mut dep = IsoDeposit::new(Direction::new(0.3, 1.1)).with_default_veto(0.01);
    dep.add_cand_energy(30.0);
    for i in 0..n {
        let a = i as f64 * 0.37;
        let r = 0.5 * ((i % 97) as f64 / 97.0);
        dep.add_deposit(Direction::new(0.3 + r * a.cos(), 1.1 + r * a.sin()), 0.1 + (i % 13) as f64);
    }
    dep
}

fn isolator(weight: &str) -> CandIsolator {
    CandIsolator::from_config(&IsolatorConfig::new(vec![
        DepositConfig::new("tracker", 0.3, "sum")
            .with_weight(weight)
            .with_vetos(["0.01", "Threshold(1.0)"]),
        DepositConfig::new("ecal", 0.4, "sumRelative")
            .with_weight(weight)
            .with_vetos(["0.07", "AngleVeto(0.02)"]),
    ]))
    .unwrap()
}

// ── 1. Parsing ───────────────────────────────────────────────────────

fn bench_parse(c: &mut Criterion) {
    let tokens = [
        "0.01",
        "Threshold(1.50)",
        "ConeVeto(0.05)",
        "AngleCone(0.10)",
        "AngleVeto(0.20)",
    ];
    c.bench_function("parse_vetos_5", |b| {
        b.iter(|| parse_vetos(black_box(&tokens)).unwrap())
    });
}

// ── 2. Deposit query ─────────────────────────────────────────────────

fn bench_deposit(c: &mut Criterion) {
    let mut group = c.benchmark_group("deposit_within");
    let vetos = parse_vetos(&["0.05", "Threshold(0.50)", "AngleVeto(0.02)"]).unwrap();
    for n in [16, 128, 1024] {
        let dep = dense_deposit(n);
        let anchored = center_all(&vetos, dep.direction());
        group.bench_with_input(BenchmarkId::new("no_vetos", n), &dep, |b, dep| {
            b.iter(|| dep.deposit_and_count_within(black_box(0.3), &[], false))
        });
        group.bench_with_input(BenchmarkId::new("three_vetos", n), &dep, |b, dep| {
            b.iter(|| dep.deposit_and_count_within(black_box(0.3), &anchored, false))
        });
    }
    group.finish();
}

// ── 3. Full isolator ─────────────────────────────────────────────────

fn bench_isolator(c: &mut Criterion) {
    let events = EventGenerator::new(42).with_max_muons(4).events(200);
    let mut group = c.benchmark_group("isolator_200_events");
    for (name, weight) in [("constant", "1"), ("expression", "1/pt")] {
        let iso = isolator(weight);
        group.bench_function(name, |b| {
            b.iter(|| {
                for event in &events {
                    black_box(iso.produce(event).unwrap());
                }
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_deposit, bench_isolator);
criterion_main!(benches);
