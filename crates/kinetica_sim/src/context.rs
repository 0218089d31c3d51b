//! # Simulation Context
//!
//! The single owner of all simulation state. A presentation shell creates
//! one at startup and drives it once per frame:
//!
//! ```text
//! shell                         SimulationContext
//!   │ new(config) ────────────────> validate, arena, grid, workers
//!   │ generate_batch() / clear() ─> store (+ grid on clear)
//!   │ step(dt) ───────────────────> partition -> solve -> integrate
//!   │ positions / radii / colors <─ live column views
//! ```
//!
//! Several contexts can live side by side in one process; nothing is
//! global.
//!
//! ## Faults
//!
//! The first fault a context hits is logged and recorded. From then on the
//! context is halted: every mutating call returns that fault again without
//! touching the particles.

use kinetica_core::{Arena, Fault, FaultResult, Palette, Particle, ParticleStore, SpatialGrid};
use tracing::{debug, error};

use crate::config::SimulationConfig;
use crate::engine::Engine;
use crate::error::ConfigResult;
use crate::generation::Spawner;
use crate::stats::{StepStats, StepTimings};

/// An independent particle simulation.
///
/// # Example
///
/// ```rust,ignore
/// let mut sim = SimulationContext::new(SimulationConfig::default())?;
/// sim.generate_batch()?;
/// loop {
///     let timings = sim.step(frame_dt)?;
///     draw(sim.positions_x(), sim.positions_y(), sim.radii(), sim.color_indices());
/// }
/// ```
pub struct SimulationContext {
    config: SimulationConfig,
    store: ParticleStore,
    engine: Engine,
    spawner: Spawner,
    palette: Palette,
    stats: StepStats,
    halted: Option<Fault>,
}

impl SimulationContext {
    /// Validates `config` and allocates everything the simulation needs.
    ///
    /// This is the only place memory is allocated; stepping, generating
    /// and clearing reuse what is built here.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ConfigError::Invalid`] for a bad config and
    /// [`crate::ConfigError::ThreadPool`] if the parallel workers cannot be
    /// started.
    pub fn new(config: SimulationConfig) -> ConfigResult<Self> {
        config.validate()?;

        let palette = Palette::DEFAULT;
        let arena = Arena::new(config.arena_bytes());
        let store = ParticleStore::with_arena(config.capacity, arena);
        let engine = Engine::new(&config)?;
        let spawner = Spawner::new(&config, palette);

        debug!(
            capacity = config.capacity,
            world_width = config.world_width,
            world_height = config.world_height,
            arena_bytes = config.arena_bytes(),
            "simulation context created"
        );

        Ok(Self {
            config,
            store,
            engine,
            spawner,
            palette,
            stats: StepStats::default(),
            halted: None,
        })
    }

    /// Returns the configuration the context was built from.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Returns the fault that halted the context, if any.
    #[inline]
    #[must_use]
    pub const fn fault(&self) -> Option<&Fault> {
        self.halted.as_ref()
    }

    /// Returns true once a fault has halted the context.
    #[inline]
    #[must_use]
    pub const fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// Appends up to `n` random particles.
    ///
    /// At capacity this is a logged no-op.
    ///
    /// # Returns
    ///
    /// Number of particles appended.
    ///
    /// # Errors
    ///
    /// Returns the halting fault, or a new one if the arena cannot hold the
    /// particle columns.
    pub fn generate(&mut self, n: usize) -> FaultResult<usize> {
        self.ensure_running()?;
        let result = self.spawner.generate(&mut self.store, n);
        self.record(result)
    }

    /// Appends one configured batch of random particles.
    ///
    /// # Errors
    ///
    /// As [`SimulationContext::generate`].
    pub fn generate_batch(&mut self) -> FaultResult<usize> {
        self.generate(self.config.batch_size)
    }

    /// Appends one explicit particle.
    ///
    /// # Returns
    ///
    /// The particle's index, or `None` at capacity.
    ///
    /// # Errors
    ///
    /// As [`SimulationContext::generate`].
    pub fn spawn(&mut self, particle: Particle) -> FaultResult<Option<u32>> {
        self.ensure_running()?;
        let result = self.store.push(particle);
        self.record(result)
    }

    /// Removes every particle, resets the arena, empties the grid and
    /// starts the step statistics over.
    ///
    /// The generation RNG keeps its state, so particles generated after a
    /// clear differ from the first batch. Clearing does not lift a halt.
    pub fn clear(&mut self) {
        let removed = self.store.count();
        self.store.clear();
        self.engine.clear();
        self.stats.reset();
        debug!(removed, "particles cleared");
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// # Returns
    ///
    /// Wall time spent in each phase.
    ///
    /// # Errors
    ///
    /// Returns the halting fault, or a new one raised during the step.
    pub fn step(&mut self, dt: f32) -> FaultResult<StepTimings> {
        self.ensure_running()?;
        let result = self.engine.step(&mut self.store, dt);
        let timings = self.record(result)?;
        self.stats.record(timings);
        Ok(timings)
    }

    /// Runs only the partition phase.
    ///
    /// # Errors
    ///
    /// As [`SimulationContext::step`].
    pub fn partition(&mut self) -> FaultResult<()> {
        self.ensure_running()?;
        let result = self.engine.partition(&self.store);
        self.record(result)
    }

    /// Runs only the solve phase over the buckets of the last partition.
    ///
    /// # Errors
    ///
    /// As [`SimulationContext::step`].
    pub fn solve(&mut self) -> FaultResult<()> {
        self.ensure_running()?;
        let result = self.engine.solve(&mut self.store);
        self.record(result)
    }

    /// Runs only the integrate phase.
    ///
    /// # Errors
    ///
    /// As [`SimulationContext::step`].
    pub fn integrate(&mut self, dt: f32) -> FaultResult<()> {
        self.ensure_running()?;
        let result = self.engine.integrate(&mut self.store, dt);
        self.record(result)
    }

    /// Returns the running step statistics.
    #[inline]
    #[must_use]
    pub const fn stats(&self) -> &StepStats {
        &self.stats
    }

    /// Returns the particle store.
    #[inline]
    #[must_use]
    pub const fn store(&self) -> &ParticleStore {
        &self.store
    }

    /// Returns the spatial grid as of the last partition.
    #[inline]
    #[must_use]
    pub const fn grid(&self) -> &SpatialGrid {
        self.engine.grid()
    }

    /// Returns the engine.
    #[inline]
    #[must_use]
    pub const fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Returns the palette colour indices resolve against.
    #[inline]
    #[must_use]
    pub const fn palette(&self) -> Palette {
        self.palette
    }

    /// Number of live particles.
    #[inline]
    #[must_use]
    pub const fn count(&self) -> usize {
        self.store.count()
    }

    /// Maximum number of particles.
    #[inline]
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.store.capacity()
    }

    /// Centre of particle `index`.
    #[must_use]
    pub fn position(&self, index: usize) -> Option<(f32, f32)> {
        self.store.position(index)
    }

    /// Velocity of particle `index`.
    #[must_use]
    pub fn velocity(&self, index: usize) -> Option<(f32, f32)> {
        self.store.velocity(index)
    }

    /// Radius of particle `index`.
    #[must_use]
    pub fn radius(&self, index: usize) -> Option<f32> {
        self.store.radius(index)
    }

    /// Palette index of particle `index`.
    #[must_use]
    pub fn color_index(&self, index: usize) -> Option<u32> {
        self.store.color_index(index)
    }

    /// Particle `index` as a whole.
    #[must_use]
    pub fn particle(&self, index: usize) -> Option<Particle> {
        self.store.get(index)
    }

    /// Centre x of every live particle.
    #[must_use]
    pub fn positions_x(&self) -> &[f32] {
        self.store.positions_x()
    }

    /// Centre y of every live particle.
    #[must_use]
    pub fn positions_y(&self) -> &[f32] {
        self.store.positions_y()
    }

    /// Radius of every live particle.
    #[must_use]
    pub fn radii(&self) -> &[f32] {
        self.store.radii()
    }

    /// Palette index of every live particle.
    #[must_use]
    pub fn color_indices(&self) -> &[u32] {
        self.store.color_indices()
    }

    /// Buckets per grid axis.
    #[must_use]
    pub fn grid_dim(&self) -> usize {
        self.engine.grid().dim()
    }

    /// Particle indices in bucket `(x, y)` as of the last partition.
    ///
    /// # Panics
    ///
    /// Panics if the coordinates are outside the grid.
    #[must_use]
    pub fn bucket(&self, x: usize, y: usize) -> &[u32] {
        self.engine.grid().bucket(x, y)
    }

    /// Bucket particle `index` was filed under by the last partition.
    #[must_use]
    pub fn bucket_of(&self, index: usize) -> Option<(usize, usize)> {
        self.engine.grid().bucket_of(index)
    }

    fn ensure_running(&self) -> FaultResult<()> {
        match &self.halted {
            Some(fault) => Err(fault.clone()),
            None => Ok(()),
        }
    }

    fn record<T>(&mut self, result: FaultResult<T>) -> FaultResult<T> {
        if let Err(fault) = &result {
            error!(%fault, count = self.store.count(), "simulation halted");
            self.halted = Some(fault.clone());
        }
        result
    }
}
