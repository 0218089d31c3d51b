//! # Simulation Configuration
//!
//! Every tunable of the simulation, loaded once at startup.
//!
//! ## Example
//!
//! ```toml
//! capacity = 20480
//! world_width = 2560.0
//! world_height = 1440.0
//! partitions = 128
//! batch_size = 2048
//! restitution = 1.0
//! ```
//!
//! Missing keys fall back to [`SimulationConfig::default`].

use std::path::Path;

use kinetica_core::ParticleStore;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Default bucket slots per particle expected in the densest bucket.
const BUCKET_HEADROOM: f32 = 8.0;

/// Largest grid, in buckets, a config may ask for.
const MAX_GRID_BUCKETS: usize = 1 << 22;

/// Largest total slot count, across all buckets, a config may ask for.
const MAX_GRID_SLOTS: usize = 1 << 26;

/// Share of one axis's extent that lands in its fullest cell.
///
/// Folding maps the strips on both sides of the origin onto one cell, and
/// everything past the last cell is clamped into it.
fn densest_axis_share(extent: f32, cell: f32, dim: usize) -> f32 {
    let folded = 2.0 * cell;
    let clamped = extent - (2.0 * dim as f32 - 3.0) * cell;
    (folded.max(clamped) / extent).min(1.0)
}

/// Configuration for a [`crate::SimulationContext`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimulationConfig {
    /// Maximum number of live particles.
    pub capacity: usize,
    /// World width; the world spans `[-w/2, w/2]`.
    pub world_width: f32,
    /// World height; the world spans `[-h/2, h/2]`.
    pub world_height: f32,
    /// Buckets per grid axis when `partition_size` is not set.
    pub partitions: usize,
    /// Explicit bucket edge length, overriding `partitions`.
    pub partition_size: Option<f32>,
    /// Slots per bucket; defaults to eight times the particle count a
    /// uniformly filled world puts in its fullest bucket.
    pub bucket_capacity: Option<usize>,
    /// Particles appended by one "add" action.
    pub batch_size: usize,
    /// Radius every spawned particle starts from.
    pub base_radius: f32,
    /// Inclusive `[min, max]` random offset added to `base_radius`.
    pub radius_jitter: [f32; 2],
    /// Per-axis speed bound for spawned particles.
    pub max_speed: f32,
    /// Collision restitution; `1.0` is the plain unit-mass elastic impulse.
    pub restitution: f32,
    /// Seed for particle generation.
    pub seed: u64,
    /// Worker threads for the parallel path.
    pub workers: usize,
    /// Run solve and integrate on the worker pool.
    pub parallel: bool,
    /// Arena size in bytes; defaults to exactly what the columns need.
    pub arena_bytes: Option<usize>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            capacity: 20_480,
            world_width: 2560.0,
            world_height: 1440.0,
            partitions: 128,
            partition_size: None,
            bucket_capacity: None,
            batch_size: 2048,
            base_radius: 0.5,
            radius_jitter: [4.0, 6.0],
            max_speed: 100.0,
            restitution: 1.0,
            seed: 0x5EED,
            workers: 8,
            parallel: false,
            arena_bytes: None,
        }
    }
}

impl SimulationConfig {
    /// Creates a config for a `width x height` world split into
    /// `partition_size` buckets, with defaults for everything else.
    #[must_use]
    pub fn with_world(capacity: usize, width: f32, height: f32, partition_size: f32) -> Self {
        Self {
            capacity,
            world_width: width,
            world_height: height,
            partition_size: Some(partition_size),
            ..Self::default()
        }
    }

    /// Parses and validates a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or unknown keys and
    /// [`ConfigError::Invalid`] if validation fails.
    pub fn from_toml_str(text: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`SimulationConfig::from_toml_str`].
    pub fn from_toml_file(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Buckets per grid axis.
    #[must_use]
    pub fn grid_dim(&self) -> usize {
        match self.partition_size {
            Some(size) => ((self.world_width / size).ceil() as usize).max(1),
            None => self.partitions,
        }
    }

    /// Bucket edge length in world units.
    #[must_use]
    pub fn partition_size(&self) -> f32 {
        self.partition_size
            .unwrap_or(self.world_width / self.partitions as f32)
    }

    /// Slots per bucket.
    ///
    /// Without an explicit value this sizes buckets for a full store spread
    /// uniformly over the world, with eight slots per particle expected in
    /// the fullest folded bucket, capped at `capacity`.
    #[must_use]
    pub fn bucket_capacity(&self) -> usize {
        self.bucket_capacity.unwrap_or_else(|| {
            let dim = self.grid_dim().max(1);
            let cell = self.partition_size();
            let share = densest_axis_share(self.world_width, cell, dim)
                * densest_axis_share(self.world_height, cell, dim);
            let expected = self.capacity as f32 * share;
            ((expected * BUCKET_HEADROOM).ceil() as usize).clamp(1, self.capacity.max(1))
        })
    }

    /// Half extents `(w/2, h/2)` of the world.
    #[must_use]
    pub fn half_extents(&self) -> (f32, f32) {
        (self.world_width / 2.0, self.world_height / 2.0)
    }

    /// Largest radius a spawned particle can get.
    #[must_use]
    pub fn max_radius(&self) -> f32 {
        self.base_radius + self.radius_jitter[1]
    }

    /// Arena capacity in bytes.
    #[must_use]
    pub fn arena_bytes(&self) -> usize {
        self.arena_bytes
            .unwrap_or_else(|| ParticleStore::required_bytes(self.capacity))
    }

    /// Checks every field for range and consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        fn invalid(message: impl Into<String>) -> ConfigResult<()> {
            Err(ConfigError::Invalid(message.into()))
        }

        if self.capacity == 0 {
            return invalid("capacity must be greater than zero");
        }
        if u32::try_from(self.capacity).is_err() {
            return invalid("capacity cannot exceed u32::MAX");
        }
        if !(self.world_width.is_finite() && self.world_width > 0.0)
            || !(self.world_height.is_finite() && self.world_height > 0.0)
        {
            return invalid("world dimensions must be positive and finite");
        }
        match self.partition_size {
            Some(size) if !(size.is_finite() && size > 0.0) => {
                return invalid("partition_size must be positive and finite");
            }
            None if self.partitions == 0 => {
                return invalid("partitions must be greater than zero");
            }
            _ => {}
        }
        if self.bucket_capacity == Some(0) {
            return invalid("bucket_capacity must be greater than zero");
        }
        let dim = self.grid_dim();
        let slots = dim
            .checked_mul(dim)
            .filter(|&buckets| buckets <= MAX_GRID_BUCKETS)
            .and_then(|buckets| buckets.checked_mul(self.bucket_capacity()));
        if !slots.is_some_and(|slots| slots <= MAX_GRID_SLOTS) {
            return invalid(format!(
                "grid of {dim} x {dim} buckets with {} slots each is too large",
                self.bucket_capacity()
            ));
        }
        let [jitter_min, jitter_max] = self.radius_jitter;
        if !(jitter_min.is_finite() && jitter_max.is_finite() && self.base_radius.is_finite()) {
            return invalid("radius settings must be finite");
        }
        if jitter_min > jitter_max {
            return invalid("radius_jitter must be [min, max] with min <= max");
        }
        if self.base_radius + jitter_min <= 0.0 {
            return invalid("smallest spawn radius must be positive");
        }
        if 2.0 * self.max_radius() > self.world_width.min(self.world_height) {
            return invalid("world is too small to spawn the largest particle");
        }
        if !(self.max_speed.is_finite() && self.max_speed >= 0.0) {
            return invalid("max_speed must be non-negative and finite");
        }
        if !(0.0..=1.0).contains(&self.restitution) {
            return invalid("restitution must lie in [0, 1]");
        }
        if self.workers == 0 {
            return invalid("workers must be greater than zero");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = SimulationConfig::default();
        config.validate().unwrap();
        assert_eq!(config.grid_dim(), 128);
        assert!((config.partition_size() - 20.0).abs() < f32::EPSILON);
        // Fullest bucket holds 2/128 of the width and 2/72 of the height.
        assert_eq!(config.bucket_capacity(), 72);
        assert_eq!(config.half_extents(), (1280.0, 720.0));
    }

    #[test]
    fn test_with_world_derives_grid() {
        let config = SimulationConfig::with_world(100, 200.0, 200.0, 25.0);
        config.validate().unwrap();
        assert_eq!(config.grid_dim(), 8);
        // Folded cells hold 2 of 8 strips per axis: 100 / 16 expected.
        assert_eq!(config.bucket_capacity(), 50);
        assert_eq!(config.arena_bytes(), ParticleStore::required_bytes(100));
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = SimulationConfig::from_toml_str(
            r#"
            capacity = 500
            world_width = 400.0
            world_height = 300.0
            partitions = 16
            restitution = 0.9
            radius_jitter = [1.0, 2.0]
            "#,
        )
        .unwrap();

        assert_eq!(config.capacity, 500);
        assert_eq!(config.grid_dim(), 16);
        assert!((config.partition_size() - 25.0).abs() < f32::EPSILON);
        assert!((config.restitution - 0.9).abs() < f32::EPSILON);
        assert_eq!(config.batch_size, 2048);
    }

    #[test]
    fn test_default_buckets_cover_folded_density() {
        let config = SimulationConfig::with_world(100, 200.0, 200.0, 25.0);
        assert_eq!(config.bucket_capacity(), 50);
        assert_eq!(
            SimulationConfig::with_world(1000, 200.0, 200.0, 25.0).bucket_capacity(),
            500
        );

        // One bucket per axis folds the whole world into a single cell.
        let coarse = SimulationConfig::with_world(100, 200.0, 200.0, 400.0);
        assert_eq!(coarse.grid_dim(), 1);
        assert_eq!(coarse.bucket_capacity(), 100);

        // Height beyond the grid clamps into the last row.
        let tall = SimulationConfig::with_world(100, 100.0, 400.0, 25.0);
        assert_eq!(tall.grid_dim(), 4);
        assert_eq!(tall.bucket_capacity(), 100);
    }

    #[test]
    fn test_toml_rejects_unknown_keys() {
        let err = SimulationConfig::from_toml_str("gravity = 9.8").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let cases: Vec<SimulationConfig> = vec![
            SimulationConfig {
                capacity: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                world_width: -1.0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                partitions: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                partition_size: Some(0.0),
                ..SimulationConfig::default()
            },
            SimulationConfig {
                bucket_capacity: Some(0),
                ..SimulationConfig::default()
            },
            SimulationConfig {
                radius_jitter: [3.0, 1.0],
                ..SimulationConfig::default()
            },
            SimulationConfig {
                base_radius: -10.0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                world_width: 8.0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                max_speed: f32::NAN,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                restitution: 1.5,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                workers: 0,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                partitions: 100_000,
                ..SimulationConfig::default()
            },
            SimulationConfig {
                partition_size: Some(1.0e-30),
                ..SimulationConfig::default()
            },
            SimulationConfig {
                bucket_capacity: Some(usize::MAX),
                ..SimulationConfig::default()
            },
        ];

        for config in cases {
            assert!(
                matches!(config.validate(), Err(ConfigError::Invalid(_))),
                "accepted {config:?}"
            );
        }
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SimulationConfig::from_toml_file("/nonexistent/kinetica.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
