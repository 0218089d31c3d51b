//! # Kinetica Sim
//!
//! The collision and integration engine for `kinetica_core` particles,
//! plus everything needed to run it:
//! - [`SimulationConfig`] loaded from TOML
//! - [`SimulationContext`], the owner of all state a shell talks to
//! - [`Engine`], the partition -> solve -> integrate pipeline
//! - [`Spawner`], seeded random particle generation
//!
//! ## Architecture Rules
//!
//! 1. **Allocate once** - `SimulationContext::new` is the only allocation point
//! 2. **Strict phase order** - partition, then solve, then integrate
//! 3. **Bucket-local collisions** - neighbouring buckets are never consulted
//! 4. **Faults halt** - the first fault stops the context for good
//!
//! ## Feature Flags
//!
//! - `parallel` (default): solve and integrate on a fixed `rayon` pool when
//!   `SimulationConfig::parallel` is set

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod generation;
pub mod stats;

pub use config::SimulationConfig;
pub use context::SimulationContext;
pub use engine::{Engine, CONTACT_EPSILON};
pub use error::{ConfigError, ConfigResult, SimError};
pub use generation::Spawner;
pub use kinetica_core::{Fault, FaultResult, Palette, Particle, Rgba};
pub use stats::{StepStats, StepTimings};
