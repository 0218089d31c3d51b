//! # Kinetica Core
//!
//! Fixed-capacity data structures for a 2D particle simulation:
//! - A bump [`Arena`] that backs every particle column
//! - A structure-of-arrays [`ParticleStore`]
//! - A uniform [`SpatialGrid`] of fixed-size buckets
//!
//! ## Architecture Rules
//!
//! 1. **No heap allocations after startup** - the arena and grid are sized once
//! 2. **Data-oriented design** - every attribute lives in its own column
//! 3. **Faults are fatal** - exhaustion and overflow surface as [`Fault`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use kinetica_core::{Particle, ParticleStore, SpatialGrid};
//!
//! let mut store = ParticleStore::new(20_480);
//! store.push(Particle::new(0.0, 0.0, 50.0, 0.0, 5.0))?;
//!
//! let mut grid = SpatialGrid::new(128, 20.0, 160, store.capacity());
//! grid.rebuild(store.positions_x(), store.positions_y(), store.radii())?;
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod error;
pub mod memory;
pub mod particles;
pub mod spatial;

pub use error::{Fault, FaultResult};
pub use memory::{Arena, ArenaBlock, ArenaSlice};
pub use particles::{ColumnsMut, Palette, Particle, ParticleStore, Rgba};
pub use spatial::SpatialGrid;
