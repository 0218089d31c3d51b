//! # Particle Generation
//!
//! Appends batches of randomly initialised particles. Every spawned
//! particle lies fully inside the world:
//!
//! ```text
//! radius   = base_radius + U[jitter_min, jitter_max]
//! position = U[-w/2 + radius, w/2 - radius] x U[-h/2 + radius, h/2 - radius]
//! velocity = U[-max_speed, max_speed] per axis
//! color    = U{0 .. palette.len()}
//! ```
//!
//! The RNG is seeded once from the config and never reseeded, so a run is
//! reproducible from its seed and its sequence of actions.

use kinetica_core::{FaultResult, Palette, Particle, ParticleStore};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

use crate::config::SimulationConfig;

/// Seeded source of random particles.
pub struct Spawner {
    rng: ChaCha8Rng,
    half_width: f32,
    half_height: f32,
    base_radius: f32,
    jitter: [f32; 2],
    max_speed: f32,
    colors: u32,
}

impl Spawner {
    /// Creates a spawner for the world described by `config`.
    #[must_use]
    pub fn new(config: &SimulationConfig, palette: Palette) -> Self {
        let (half_width, half_height) = config.half_extents();
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            half_width,
            half_height,
            base_radius: config.base_radius,
            jitter: config.radius_jitter,
            max_speed: config.max_speed,
            colors: palette.len().max(1) as u32,
        }
    }

    /// Draws one particle.
    pub fn sample(&mut self) -> Particle {
        let [jitter_min, jitter_max] = self.jitter;
        let radius = self.base_radius + self.rng.gen_range(jitter_min..=jitter_max);
        let x = self
            .rng
            .gen_range(-self.half_width + radius..=self.half_width - radius);
        let y = self
            .rng
            .gen_range(-self.half_height + radius..=self.half_height - radius);
        let vx = self.rng.gen_range(-self.max_speed..=self.max_speed);
        let vy = self.rng.gen_range(-self.max_speed..=self.max_speed);
        let color = self.rng.gen_range(0..self.colors);

        Particle::new(x, y, vx, vy, radius).with_color(color)
    }

    /// Appends up to `n` random particles to `store`.
    ///
    /// The request is clamped to the free capacity. A full store is left
    /// untouched and no random numbers are drawn.
    ///
    /// # Returns
    ///
    /// Number of particles appended.
    ///
    /// # Errors
    ///
    /// Returns a fault if the store cannot acquire its columns.
    pub fn generate(&mut self, store: &mut ParticleStore, n: usize) -> FaultResult<usize> {
        let free = store.remaining();
        if n > free {
            warn!(
                requested = n,
                free,
                capacity = store.capacity(),
                "particle request clamped to capacity"
            );
        }

        let appended = store.extend_with(n, |_| self.sample())?;
        debug!(appended, count = store.count(), "particles generated");
        Ok(appended)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SimulationConfig {
        SimulationConfig::with_world(100, 200.0, 200.0, 25.0)
    }

    #[test]
    fn test_samples_stay_inside_world() {
        let config = config();
        let mut spawner = Spawner::new(&config, Palette::DEFAULT);

        for _ in 0..1000 {
            let p = spawner.sample();
            assert!(p.radius >= 4.5 && p.radius <= 6.5);
            assert!(p.x - p.radius >= -100.001 && p.x + p.radius <= 100.001);
            assert!(p.y - p.radius >= -100.001 && p.y + p.radius <= 100.001);
            assert!(p.vx.abs() <= 100.0 && p.vy.abs() <= 100.0);
            assert!(p.color < 8);
        }
    }

    #[test]
    fn test_same_seed_same_particles() {
        let config = config();
        let mut a = Spawner::new(&config, Palette::DEFAULT);
        let mut b = Spawner::new(&config, Palette::DEFAULT);
        for _ in 0..32 {
            assert_eq!(a.sample(), b.sample());
        }
    }

    #[test]
    fn test_generate_clamps_to_capacity() {
        let config = config();
        let mut spawner = Spawner::new(&config, Palette::DEFAULT);
        let mut store = ParticleStore::new(config.capacity);

        assert_eq!(spawner.generate(&mut store, 60).unwrap(), 60);
        assert_eq!(spawner.generate(&mut store, 60).unwrap(), 40);
        assert!(store.is_full());
        assert_eq!(spawner.generate(&mut store, 60).unwrap(), 0);
        assert_eq!(store.count(), 100);
    }
}
