//! Unit representation for the map layers.

use crate::error::{KohonenError, Result};
use crate::rng::RandomSource;
use std::fmt;

/// The role a unit plays in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitRole {
    /// Holds one raw component of the input vector.
    Input,
    /// Competes on the 2D grid.
    Grid,
}

impl fmt::Display for UnitRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitRole::Input => write!(f, "input"),
            UnitRole::Grid => write!(f, "grid"),
        }
    }
}

/// Grid coordinates of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Column.
    pub x: usize,
    /// Row.
    pub y: usize,
}

impl Position {
    /// Squared Euclidean distance to another grid position.
    #[inline]
    pub fn distance_squared(&self, other: &Position) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        dx * dx + dy * dy
    }
}

/// A unit in one of the map's layers.
///
/// Upstream connections are indices into the source layer's units, so a unit
/// never borrows from another layer. Grid units carry their position and a
/// precomputed row of kernel exponents, one per grid unit.
#[derive(Debug, Clone)]
pub struct Unit {
    id: usize,
    role: UnitRole,
    /// Activation. Raw value for input units, dissimilarity for grid units.
    pub state: f64,
    /// One weight per upstream connection.
    pub weights: Vec<f64>,
    inputs: Vec<usize>,
    position: Option<Position>,
    neighbour_distances: Vec<f64>,
}

impl Unit {
    /// Creates an unwired unit.
    pub fn new(id: usize, role: UnitRole) -> Self {
        Self {
            id,
            role,
            state: 0.0,
            weights: Vec::new(),
            inputs: Vec::new(),
            position: None,
            neighbour_distances: Vec::new(),
        }
    }

    /// Index of this unit within its layer.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Role of this unit.
    #[inline]
    pub fn role(&self) -> UnitRole {
        self.role
    }

    /// Indices of the upstream units, in connection order.
    #[inline]
    pub fn inputs(&self) -> &[usize] {
        &self.inputs
    }

    /// Grid position, present only for grid units.
    #[inline]
    pub fn position(&self) -> Option<Position> {
        self.position
    }

    /// Neighbour-distance row indexed by grid-unit id.
    #[inline]
    pub fn neighbour_distances(&self) -> &[f64] {
        &self.neighbour_distances
    }

    pub(crate) fn set_position(&mut self, position: Position) {
        self.position = Some(position);
    }

    pub(crate) fn set_neighbour_distances(&mut self, row: Vec<f64>) {
        self.neighbour_distances = row;
    }

    pub(crate) fn connect(&mut self, upstream: impl IntoIterator<Item = usize>) {
        self.inputs.extend(upstream);
    }

    /// Stores a raw input value. Input units only.
    pub fn set_input(&mut self, value: f64) -> Result<()> {
        self.expect_role(UnitRole::Input)?;
        if !value.is_finite() {
            return Err(KohonenError::InvalidInput {
                index: self.id,
                value,
            });
        }
        self.state = value;
        Ok(())
    }

    /// Sets `state` to the squared Euclidean distance between the weight
    /// vector and the upstream activations. Grid units only.
    ///
    /// Lower is a closer match.
    pub fn compute_activation(&mut self, upstream: &[Unit]) -> Result<()> {
        self.expect_role(UnitRole::Grid)?;
        if self.inputs.is_empty() {
            return Err(KohonenError::Config(format!("grid unit {} is not wired", self.id)));
        }
        if self.weights.len() != self.inputs.len() {
            return Err(KohonenError::Config(format!(
                "grid unit {} has {} weights for {} inputs",
                self.id,
                self.weights.len(),
                self.inputs.len()
            )));
        }

        let mut sum = 0.0;
        for (w, &src) in self.weights.iter().zip(&self.inputs) {
            let source = upstream.get(src).ok_or_else(|| {
                KohonenError::Config(format!(
                    "grid unit {} references missing upstream unit {}",
                    self.id, src
                ))
            })?;
            sum += (w - source.state).powi(2);
        }
        self.state = sum;
        Ok(())
    }

    /// Discards the weights and draws one fresh value in (-1, 1) per upstream
    /// connection.
    pub fn reinitialize_weights<R: RandomSource + ?Sized>(&mut self, rng: &mut R) {
        self.weights.clear();
        self.weights
            .extend((0..self.inputs.len()).map(|_| rng.uniform_weight()));
    }

    /// Moves every weight towards `input` by `influence` of the gap.
    #[inline]
    pub fn pull_towards(&mut self, input: &[f64], influence: f64) {
        for (w, x) in self.weights.iter_mut().zip(input) {
            *w += (x - *w) * influence;
        }
    }

    fn expect_role(&self, expected: UnitRole) -> Result<()> {
        if self.role != expected {
            return Err(KohonenError::UnitRole {
                expected,
                found: self.role,
            });
        }
        Ok(())
    }
}
