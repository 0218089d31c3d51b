//! # Simulation Error Types
//!
//! Configuration problems are caught before anything is allocated.
//! Runtime faults come from `kinetica_core` and are always fatal.

use std::path::PathBuf;

use kinetica_core::Fault;
use thiserror::Error;

/// Errors raised while loading or validating a [`crate::SimulationConfig`].
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// Path that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The config text is not valid TOML for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range or inconsistent with another.
    #[error("invalid configuration: {0}")]
    Invalid(String),

    /// The parallel worker pool could not be started.
    #[error("failed to build worker pool: {0}")]
    ThreadPool(String),
}

/// Any error a simulation run can end with.
#[derive(Error, Debug)]
pub enum SimError {
    /// Startup failed on configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The simulation hit a fatal fault.
    #[error("fatal simulation fault: {0}")]
    Fault(#[from] Fault),
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigError>;
