//! # Step Benchmark
//!
//! Full-capacity step timings:
//! - 20 480 particles in a 2560 x 1440 world
//! - 128 x 128 grid
//! - serial and pooled solve/integrate
//!
//! Run with: `cargo bench --package kinetica_sim`

#![allow(missing_docs)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kinetica_sim::{SimulationConfig, SimulationContext};

/// Particle count of a full default world.
const PARTICLE_COUNT: usize = 20_480;

const DT: f32 = 1.0 / 60.0;

fn full_world(parallel: bool) -> SimulationContext {
    let config = SimulationConfig {
        parallel,
        ..SimulationConfig::default()
    };
    let mut sim = SimulationContext::new(config).unwrap();
    sim.generate(PARTICLE_COUNT).unwrap();
    // Let the initial overlaps settle so timings reflect steady state.
    for _ in 0..30 {
        sim.step(DT).unwrap();
    }
    sim
}

/// Benchmark: one full step, serial vs worker pool.
fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("step_20k");

    for parallel in [false, true] {
        let mut sim = full_world(parallel);
        let label = if parallel { "parallel" } else { "serial" };
        group.bench_with_input(BenchmarkId::from_parameter(label), &DT, |b, &dt| {
            b.iter(|| black_box(sim.step(dt).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark: grid rebuild alone.
fn bench_partition(c: &mut Criterion) {
    let mut sim = full_world(false);
    c.bench_function("partition_20k", |b| {
        b.iter(|| sim.partition().unwrap());
    });
}

/// Benchmark: generate a full world from empty.
fn bench_generate(c: &mut Criterion) {
    let mut sim = SimulationContext::new(SimulationConfig::default()).unwrap();
    c.bench_function("generate_20k", |b| {
        b.iter(|| {
            sim.clear();
            black_box(sim.generate(PARTICLE_COUNT).unwrap())
        });
    });
}

criterion_group!(benches, bench_step, bench_partition, bench_generate);
criterion_main!(benches);
