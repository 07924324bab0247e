//! Error types for the Kohonen map engine.

use crate::som::UnitRole;
use thiserror::Error;

/// The main error type for map operations.
#[derive(Error, Debug)]
pub enum KohonenError {
    /// An input vector component is not a finite number.
    #[error("Invalid input at index {index}: {value} is not finite")]
    InvalidInput {
        /// Position of the offending component.
        index: usize,
        /// The rejected value.
        value: f64,
    },

    /// Input vector length does not match the input layer.
    #[error("Input length mismatch: expected {expected}, got {actual}")]
    InputLength {
        /// Size of the input layer.
        expected: usize,
        /// Length of the supplied vector.
        actual: usize,
    },

    /// A unit operation was invoked on a unit of the wrong role.
    #[error("Unit role mismatch: expected {expected} unit, found {found} unit")]
    UnitRole {
        /// Role the operation requires.
        expected: UnitRole,
        /// Role of the unit it was invoked on.
        found: UnitRole,
    },

    /// Invalid configuration or serialized state.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Training error.
    #[error("Training error: {0}")]
    Training(String),

    /// Malformed dataset file.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Result type alias for map operations.
pub type Result<T> = std::result::Result<T, KohonenError>;

impl From<bincode::Error> for KohonenError {
    fn from(err: bincode::Error) -> Self {
        KohonenError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for KohonenError {
    fn from(err: serde_json::Error) -> Self {
        KohonenError::Serialization(err.to_string())
    }
}
