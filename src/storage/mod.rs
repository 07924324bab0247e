//! Persistence of trained maps and loading of datasets.

mod dataset;
mod state;

pub use dataset::{load_dataset, parse_dataset, parse_vector};
pub use state::{MapState, StateFormat};
