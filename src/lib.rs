//! # kohonen-map - Self-Organizing Maps
//!
//! A Kohonen Self-Organizing Map maps arbitrary-dimensional input vectors onto
//! a 2D grid of competing units while preserving topology: nearby grid units
//! respond to similar inputs. Useful for clustering and for visualizing
//! high-dimensional data.
//!
//! ## Overview
//!
//! An input layer holds the raw components of a vector and is fully wired
//! into a `width` x `height` grid layer. Each grid unit measures the squared
//! distance between its weight vector and the input; the closest unit wins.
//! Training pulls every grid unit towards each sample, scaled by a Gaussian
//! kernel of its grid distance from the winner and a shrinking radius.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kohonen_map::{Map, MapConfig, TrainOptions};
//!
//! let mut config = MapConfig::new(2, 8, 8);
//! config.seed = Some(42);
//! let mut map = Map::new(&config)?;
//!
//! let dataset = vec![vec![0.0, 0.0], vec![1.0, 1.0]];
//! map.train(&dataset, &TrainOptions::default().with_rate(0.5))?;
//!
//! let winner = map.activate(&[0.9, 1.1])?.winner_id();
//! map.serialize().save("map.json")?;
//! ```
//!
//! ## Architecture
//!
//! - [`som`] - units, layers, the map engine and training
//! - [`storage`] - the persisted state and its file encodings
//! - [`config`] - topology and training configuration
//! - [`rng`] - injectable random sources

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod rng;
pub mod som;
pub mod storage;

// Re-export commonly used types
pub use config::{Config, MapConfig, TrainConfig};
pub use error::{KohonenError, Result};
pub use rng::{seeded_rng, RandomSource};
pub use som::{Layer, LinearDecay, Map, Position, TrainOptions, TrainProgress, Unit, UnitRole};
pub use storage::{MapState, StateFormat};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default floor of the neighbourhood radius schedule.
pub const DEFAULT_MIN_DISTANCE: f64 = 2.0;

/// Default number of training iterations.
pub const DEFAULT_ITERATIONS: usize = 100;

/// Default progress interval, in iterations.
pub const DEFAULT_LOG_INTERVAL: usize = 10;

/// Default learning rate.
pub const DEFAULT_RATE: f64 = 0.3;
