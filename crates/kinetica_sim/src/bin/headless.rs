//! # Kinetica Headless Runner
//!
//! Runs the simulation without a window and prints per-phase timings.
//!
//! ## Usage
//!
//! ```bash
//! kinetica_headless --config sim.toml --batches 10 --frames 600 --dt 0.016
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use kinetica_sim::{SimError, SimulationConfig, SimulationContext};

struct Options {
    config: Option<PathBuf>,
    batches: usize,
    frames: u64,
    dt: f32,
    parallel: bool,
}

fn parse_args() -> Option<Options> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        config: None,
        batches: 10,
        frames: 600,
        dt: 1.0 / 60.0,
        parallel: false,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    options.config = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--batches" | "-b" => {
                if i + 1 < args.len() {
                    options.batches = args[i + 1].parse().unwrap_or(10);
                    i += 1;
                }
            }
            "--frames" | "-f" => {
                if i + 1 < args.len() {
                    options.frames = args[i + 1].parse().unwrap_or(600);
                    i += 1;
                }
            }
            "--dt" => {
                if i + 1 < args.len() {
                    options.dt = args[i + 1].parse().unwrap_or(1.0 / 60.0);
                    i += 1;
                }
            }
            "--parallel" | "-p" => options.parallel = true,
            "--help" | "-h" => {
                println!("Usage: kinetica_headless [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --config <FILE>     TOML config (default: built-in defaults)");
                println!("  -b, --batches <NUM>     Particle batches to generate (default: 10)");
                println!("  -f, --frames <NUM>      Steps to run (default: 600)");
                println!("      --dt <SECS>         Fixed time step (default: 1/60)");
                println!("  -p, --parallel          Step on the worker pool");
                println!("  -h, --help              Show this help");
                return None;
            }
            _ => {}
        }
        i += 1;
    }
    Some(options)
}

fn run(options: &Options) -> Result<(), SimError> {
    let mut config = match &options.config {
        Some(path) => SimulationConfig::from_toml_file(path)?,
        None => SimulationConfig::default(),
    };
    config.parallel |= options.parallel;

    println!("┌─ CONFIGURATION ─────────────────────────────────────────────────┐");
    println!("│ World:              {} x {}", config.world_width, config.world_height);
    println!("│ Capacity:           {}", config.capacity);
    println!(
        "│ Grid:               {0} x {0} buckets of {1:.1}",
        config.grid_dim(),
        config.partition_size()
    );
    println!("│ Batches:            {} x {}", options.batches, config.batch_size);
    println!("│ Frames:             {} at dt {:.4}", options.frames, options.dt);
    println!(
        "│ Workers:            {}",
        if config.parallel { config.workers } else { 1 }
    );
    println!("└──────────────────────────────────────────────────────────────────┘");
    println!();

    let mut sim = SimulationContext::new(config)?;
    for _ in 0..options.batches {
        sim.generate_batch()?;
    }
    println!("Generated {} particles", sim.count());

    for frame in 1..=options.frames {
        let timings = sim.step(options.dt)?;
        if frame % 120 == 0 {
            println!(
                "[frame {frame:>6}] total {:>7.3}ms | partition {:>6.3}ms | collision {:>6.3}ms | integration {:>6.3}ms",
                timings.total_ms(),
                timings.partition_ms,
                timings.collision_ms,
                timings.integration_ms
            );
        }
    }

    let stats = sim.stats();
    println!();
    println!("┌─ SUMMARY ───────────────────────────────────────────────────────┐");
    println!("│ Particles:          {}", sim.count());
    println!("│ Steps:              {}", stats.steps);
    if stats.steps > 0 {
        println!("│ Step min:           {:.3}ms", stats.min_ms);
        println!("│ Step avg:           {:.3}ms", stats.avg_ms);
        println!("│ Step max:           {:.3}ms", stats.max_ms);
    }
    println!("└──────────────────────────────────────────────────────────────────┘");
    Ok(())
}

fn main() -> ExitCode {
    let Some(options) = parse_args() else {
        return ExitCode::SUCCESS;
    };

    match run(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("kinetica_headless: {e}");
            ExitCode::FAILURE
        }
    }
}
