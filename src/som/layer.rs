//! Layers: owned arenas of units sharing one role.

use crate::error::{KohonenError, Result};
use crate::rng::RandomSource;
use crate::som::{Unit, UnitRole};
use log::debug;

/// An ordered collection of units of one role.
#[derive(Debug, Clone)]
pub struct Layer {
    role: UnitRole,
    units: Vec<Unit>,
}

impl Layer {
    /// Creates a layer of `size` unwired units.
    pub fn new(size: usize, role: UnitRole) -> Self {
        let units = (0..size).map(|id| Unit::new(id, role)).collect();
        Self { role, units }
    }

    /// Role shared by every unit in the layer.
    #[inline]
    pub fn role(&self) -> UnitRole {
        self.role
    }

    /// Number of units.
    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns true if the layer holds no units.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// All units, in index order.
    #[inline]
    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    /// Mutable access to the units.
    #[inline]
    pub fn units_mut(&mut self) -> &mut [Unit] {
        &mut self.units
    }

    /// Gets a unit by index.
    #[inline]
    pub fn get(&self, id: usize) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Fully connects this layer as the input of `target`.
    ///
    /// Every target unit gets all of this layer's units appended to its inputs,
    /// in order, and then fresh random weights. Calling this twice for the same
    /// pair duplicates the connections.
    pub fn connect_as_input_to<R: RandomSource + ?Sized>(
        &self,
        target: &mut Layer,
        rng: &mut R,
    ) -> Result<()> {
        if self.is_empty() {
            return Err(KohonenError::Config("cannot wire from an empty layer".to_string()));
        }
        if target.role == UnitRole::Input {
            return Err(KohonenError::Config("input layers cannot receive connections".to_string()));
        }

        for unit in &mut target.units {
            unit.connect(0..self.units.len());
            unit.reinitialize_weights(rng);
        }

        debug!(
            "Wired {} {} units into {} {} units",
            self.len(),
            self.role,
            target.len(),
            target.role
        );
        Ok(())
    }
}
