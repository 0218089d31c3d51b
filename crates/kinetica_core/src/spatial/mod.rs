//! # Spatial Partitioning
//!
//! A uniform bucket grid that keeps collision detection sub-quadratic.

mod grid;

pub use grid::SpatialGrid;
