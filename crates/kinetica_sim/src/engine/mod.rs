//! # Collision & Integration Engine
//!
//! One step is three phases, always in this order:
//!
//! ```text
//! ┌───────────┐    ┌───────────┐    ┌─────────────┐
//! │ partition │ -> │   solve   │ -> │  integrate  │
//! │ (rebuild) │    │ (reflect, │    │ (p += v*dt) │
//! │           │    │  collide) │    │             │
//! └───────────┘    └───────────┘    └─────────────┘
//! ```
//!
//! The grid is derived data. It is rebuilt from current positions at the
//! start of every step and never carried across steps.

mod integrate;
#[cfg(feature = "parallel")]
mod parallel;
mod solve;

use std::time::Instant;

use kinetica_core::{ColumnsMut, FaultResult, ParticleStore, SpatialGrid};
use tracing::{debug, trace};

use crate::config::SimulationConfig;
use crate::error::ConfigResult;
use crate::stats::StepTimings;

pub use solve::CONTACT_EPSILON;

use integrate::integrate_range;
use solve::{SolveKernel, Velocities};

/// Owns the spatial grid and runs the per-step pipeline over a store.
pub struct Engine {
    grid: SpatialGrid,
    half_width: f32,
    half_height: f32,
    restitution: f32,
    #[cfg(feature = "parallel")]
    workers: Option<parallel::Workers>,
}

impl Engine {
    /// Builds the grid, and the worker pool if `config.parallel` is set.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::ThreadPool`] if the workers cannot be
    /// started.
    pub fn new(config: &SimulationConfig) -> ConfigResult<Self> {
        let (half_width, half_height) = config.half_extents();
        let grid = SpatialGrid::new(
            config.grid_dim(),
            config.partition_size(),
            config.bucket_capacity(),
            config.capacity,
        );

        #[cfg(feature = "parallel")]
        let workers = if config.parallel {
            Some(parallel::Workers::new(config.workers)?)
        } else {
            None
        };
        #[cfg(not(feature = "parallel"))]
        if config.parallel {
            tracing::warn!("built without the `parallel` feature, stepping serially");
        }

        debug!(
            grid_dim = grid.dim(),
            partition_size = grid.partition_size(),
            bucket_capacity = grid.bucket_capacity(),
            parallel = config.parallel,
            "engine initialised"
        );

        Ok(Self {
            grid,
            half_width,
            half_height,
            restitution: config.restitution,
            #[cfg(feature = "parallel")]
            workers,
        })
    }

    /// Returns the spatial grid as of the last partition.
    #[inline]
    #[must_use]
    pub const fn grid(&self) -> &SpatialGrid {
        &self.grid
    }

    /// Number of worker threads solve and integrate run on; 1 when serial.
    #[must_use]
    pub fn workers(&self) -> usize {
        #[cfg(feature = "parallel")]
        if let Some(workers) = &self.workers {
            return workers.count();
        }
        1
    }

    /// Runs partition, solve and integrate once.
    ///
    /// # Errors
    ///
    /// Returns [`kinetica_core::Fault::BucketOverflow`] if partitioning
    /// overflows a bucket, or a stale handle fault from the store. The
    /// store is left mid-step in either case.
    pub fn step(&mut self, store: &mut ParticleStore, dt: f32) -> FaultResult<StepTimings> {
        let start = Instant::now();
        self.partition(store)?;
        let partitioned = Instant::now();
        self.solve(store)?;
        let solved = Instant::now();
        self.integrate(store, dt)?;
        let integrated = Instant::now();

        let timings = StepTimings::from_durations(
            partitioned - start,
            solved - partitioned,
            integrated - solved,
        );
        trace!(
            count = store.count(),
            partition_ms = timings.partition_ms,
            collision_ms = timings.collision_ms,
            integration_ms = timings.integration_ms,
            "step complete"
        );
        Ok(timings)
    }

    /// Rebuilds the grid from the store's current positions.
    ///
    /// # Errors
    ///
    /// Returns [`kinetica_core::Fault::BucketOverflow`] if a bucket fills up.
    pub fn partition(&mut self, store: &ParticleStore) -> FaultResult<()> {
        self.grid
            .rebuild(store.positions_x(), store.positions_y(), store.radii())
    }

    /// Reflects leaving particles and resolves collisions bucket by bucket.
    ///
    /// Works on the buckets of the last [`Engine::partition`]; particles
    /// appended since then are not considered.
    ///
    /// # Errors
    ///
    /// Returns a fault if the store's column handles went stale.
    ///
    /// # Panics
    ///
    /// Panics if the grid indexes more particles than the store holds,
    /// which only happens when the store was cleared behind the engine's
    /// back. [`Engine::clear`] keeps the two in sync.
    pub fn solve(&self, store: &mut ParticleStore) -> FaultResult<()> {
        let ColumnsMut {
            pos_x,
            pos_y,
            vel_x,
            vel_y,
            radius,
            ..
        } = store.columns_mut()?;
        assert!(
            self.grid.indexed() <= pos_x.len(),
            "grid indexes {} particles, store holds {}",
            self.grid.indexed(),
            pos_x.len()
        );

        let kernel = SolveKernel {
            pos_x,
            pos_y,
            radius,
            half_width: self.half_width,
            half_height: self.half_height,
            restitution: self.restitution,
        };

        #[cfg(feature = "parallel")]
        if let Some(workers) = &self.workers {
            workers.solve(&self.grid, &kernel, vel_x, vel_y);
            return Ok(());
        }

        let mut velocities = Velocities { x: vel_x, y: vel_y };
        for bucket in self.grid.buckets() {
            kernel.solve_bucket(bucket, &mut velocities);
        }
        Ok(())
    }

    /// Advances every live particle by `velocity * dt`.
    ///
    /// # Errors
    ///
    /// Returns a fault if the store's column handles went stale.
    pub fn integrate(&self, store: &mut ParticleStore, dt: f32) -> FaultResult<()> {
        let ColumnsMut {
            pos_x,
            pos_y,
            vel_x,
            vel_y,
            ..
        } = store.columns_mut()?;

        #[cfg(feature = "parallel")]
        if let Some(workers) = &self.workers {
            workers.integrate(pos_x, pos_y, vel_x, vel_y, dt);
            return Ok(());
        }

        integrate_range(pos_x, pos_y, vel_x, vel_y, dt);
        Ok(())
    }

    /// Empties the grid. Called whenever the store is cleared.
    pub fn clear(&mut self) {
        self.grid.clear();
    }
}
