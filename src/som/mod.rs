//! Self-Organizing Map (SOM) module.
//!
//! - **Units** hold activation state, weights and upstream connections (unit.rs)
//! - **Layers** own their units and wire one layer into another (layer.rs)
//! - **Map** builds the network, activates it and answers queries (map.rs)
//! - **Training** runs the competitive-learning loop (training.rs)

mod layer;
mod map;
mod unit;
pub mod training;

pub use layer::Layer;
pub use map::Map;
pub use training::{LinearDecay, TrainOptions, TrainProgress};
pub use unit::{Position, Unit, UnitRole};
