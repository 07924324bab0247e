//! Configuration for the Kohonen map engine.

use crate::error::{KohonenError, Result};
use crate::{DEFAULT_ITERATIONS, DEFAULT_LOG_INTERVAL, DEFAULT_MIN_DISTANCE, DEFAULT_RATE};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level configuration, as read from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Map topology configuration.
    pub map: MapConfig,

    /// Training configuration.
    pub train: TrainConfig,
}

impl Config {
    /// Loads a configuration from a JSON file.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }
}

/// Map topology configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// Dimensionality of the input vectors.
    pub input_size: usize,

    /// Grid width in units.
    pub width: usize,

    /// Grid height in units.
    pub height: usize,

    /// Floor of the default neighbourhood radius schedule.
    /// Default: 2.0.
    pub min_distance: f64,

    /// Random seed for reproducibility.
    /// Default: None (random).
    pub seed: Option<u64>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            input_size: 2,
            width: 10,
            height: 10,
            min_distance: DEFAULT_MIN_DISTANCE,
            seed: None,
        }
    }
}

impl MapConfig {
    /// Creates a configuration for the given topology with default settings.
    pub fn new(input_size: usize, width: usize, height: usize) -> Self {
        Self {
            input_size,
            width,
            height,
            ..Default::default()
        }
    }

    /// Returns the total number of grid units.
    #[inline]
    pub fn total_units(&self) -> usize {
        self.width * self.height
    }

    /// Length of the grid diagonal, the starting radius of the default schedule.
    #[inline]
    pub fn diagonal_radius(&self) -> f64 {
        (self.width as f64).hypot(self.height as f64)
    }

    /// Checks that the topology can build a usable map.
    pub fn validate(&self) -> Result<()> {
        if self.input_size == 0 {
            return Err(KohonenError::Config("input size must be at least 1".to_string()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(KohonenError::Config(format!(
                "grid dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.width.checked_mul(self.height).is_none() {
            return Err(KohonenError::Config(format!(
                "grid of {}x{} units overflows the unit count",
                self.width, self.height
            )));
        }
        if !self.min_distance.is_finite() || self.min_distance <= 0.0 {
            return Err(KohonenError::Config(format!(
                "min distance must be a positive finite number, got {}",
                self.min_distance
            )));
        }
        Ok(())
    }
}

/// Training configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Number of passes over the dataset.
    /// Default: 100.
    pub iterations: usize,

    /// Progress is reported every `log` iterations; `None` disables it.
    /// Default: Some(10).
    pub log: Option<usize>,

    /// Learning rate applied to every weight update.
    /// Default: 0.3.
    pub rate: f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
            log: Some(DEFAULT_LOG_INTERVAL),
            rate: DEFAULT_RATE,
        }
    }
}

impl TrainConfig {
    /// Returns true if progress should be reported at this iteration.
    #[inline]
    pub fn should_log(&self, iteration: usize) -> bool {
        matches!(self.log, Some(interval) if interval > 0 && iteration % interval == 0)
    }
}
