//! Gap gain solver benchmarks.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rfgap::{
    bunch::Bunch,
    config::PROTON_REST_ENERGY,
    energy::EnergyVector,
    gap::{AcceleratingRfGap, GapLocation},
    scan::{scan_phases, PhaseScan},
    spectrum::{ConstantSpectrum, FieldSpectrum},
    twiss::Twiss,
};

const FREQ: f64 = 402.5e6;
const V0: f64 = 1.0e6;

fn bench_single_solve(c: &mut Criterion) {
    let constant = AcceleratingRfGap::new(FREQ, V0, ConstantSpectrum::unit());
    let uniform = AcceleratingRfGap::new(FREQ, V0, FieldSpectrum::uniform_gap(0.02));
    let initial = EnergyVector::from_degrees(-30.0, 2.5e6);

    c.bench_function("solve_constant_spectrum", |b| {
        b.iter(|| {
            constant.solve_gap_gains(
                GapLocation::PreGap,
                1.0,
                PROTON_REST_ENERGY,
                black_box(initial),
            )
        })
    });

    c.bench_function("solve_uniform_gap", |b| {
        b.iter(|| {
            uniform.solve_gap_gains(
                GapLocation::PreGap,
                1.0,
                PROTON_REST_ENERGY,
                black_box(initial),
            )
        })
    });

    c.bench_function("traverse_uniform_gap", |b| {
        b.iter(|| uniform.traverse(1.0, PROTON_REST_ENERGY, black_box(initial)))
    });
}

fn bench_phase_scan(c: &mut Criterion) {
    let gap = AcceleratingRfGap::new(FREQ, V0, FieldSpectrum::uniform_gap(0.02));
    let mut group = c.benchmark_group("phase_scan");

    for steps in [16, 256, 4096] {
        let scan = PhaseScan::new(-90.0, 30.0, steps);
        group.throughput(Throughput::Elements(steps as u64));
        group.bench_with_input(BenchmarkId::from_parameter(steps), &scan, |b, scan| {
            b.iter(|| scan_phases(&gap, GapLocation::PostGap, 1.0, PROTON_REST_ENERGY, 2.5e6, scan))
        });
    }
    group.finish();
}

fn bench_bunch(c: &mut Criterion) {
    let gap = AcceleratingRfGap::new(FREQ, V0, FieldSpectrum::uniform_gap(0.02));
    let twiss = Twiss::new(0.0, 5.0e-6, 500.0);
    let centre = EnergyVector::from_degrees(-30.0, 2.5e6);
    let mut group = c.benchmark_group("bunch_cross_gap");

    for particles in [1_000, 10_000] {
        let bunch = Bunch::sample(&twiss, centre, particles, Some(1)).unwrap();
        group.throughput(Throughput::Elements(particles as u64));
        group.bench_with_input(BenchmarkId::from_parameter(particles), &bunch, |b, bunch| {
            b.iter(|| bunch.cross_gap(&gap, 1.0, PROTON_REST_ENERGY, false))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_solve, bench_phase_scan, bench_bunch);
criterion_main!(benches);
