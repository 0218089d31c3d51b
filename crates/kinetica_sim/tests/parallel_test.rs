//! Integration test: the worker pool produces exactly the serial result.

#![cfg(feature = "parallel")]

use kinetica_sim::{SimulationConfig, SimulationContext};

fn config(parallel: bool, workers: usize) -> SimulationConfig {
    SimulationConfig {
        capacity: 4096,
        world_width: 640.0,
        world_height: 480.0,
        partitions: 32,
        seed: 42,
        parallel,
        workers,
        ..SimulationConfig::default()
    }
}

fn snapshot(sim: &SimulationContext) -> Vec<(f32, f32, f32, f32)> {
    (0..sim.count())
        .map(|i| {
            let (x, y) = sim.position(i).unwrap();
            let (vx, vy) = sim.velocity(i).unwrap();
            (x, y, vx, vy)
        })
        .collect()
}

#[test]
fn test_parallel_matches_serial() {
    let mut serial = SimulationContext::new(config(false, 1)).unwrap();
    let mut parallel = SimulationContext::new(config(true, 4)).unwrap();
    assert_eq!(serial.engine().workers(), 1);
    assert_eq!(parallel.engine().workers(), 4);

    serial.generate(1500).unwrap();
    parallel.generate(1500).unwrap();
    assert_eq!(snapshot(&serial), snapshot(&parallel));

    for frame in 0..120 {
        serial.step(1.0 / 60.0).unwrap();
        parallel.step(1.0 / 60.0).unwrap();
        assert_eq!(
            snapshot(&serial),
            snapshot(&parallel),
            "paths diverged at frame {frame}"
        );
    }
}

#[test]
fn test_more_workers_than_rows() {
    let mut serial = SimulationContext::new(SimulationConfig {
        partitions: 4,
        ..config(false, 1)
    })
    .unwrap();
    let mut parallel = SimulationContext::new(SimulationConfig {
        partitions: 4,
        ..config(true, 16)
    })
    .unwrap();

    serial.generate(200).unwrap();
    parallel.generate(200).unwrap();
    for _ in 0..30 {
        serial.step(0.016).unwrap();
        parallel.step(0.016).unwrap();
    }
    assert_eq!(snapshot(&serial), snapshot(&parallel));
}
