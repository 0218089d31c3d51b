//! # Particles
//!
//! Structure-of-arrays particle storage and the cosmetic colour palette.
//!
//! ## Design Philosophy
//!
//! - One contiguous column per attribute, for cache-friendly sweeps
//! - Fixed capacity, columns carved from the arena once
//! - Live particles are always the dense prefix `0..count`

mod palette;
mod store;

pub use palette::{Palette, Rgba};
pub use store::{ColumnsMut, Particle, ParticleStore};
