//! The map engine: construction, activation and queries.

use crate::config::MapConfig;
use crate::error::{KohonenError, Result};
use crate::rng::{seeded_rng, RandomSource};
use crate::som::{Layer, Position, Unit, UnitRole};
use crate::storage::MapState;
use log::debug;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// A Kohonen self-organizing map.
///
/// The map owns an input layer of `input_size` units fully connected to a
/// `width` x `height` grid layer (row-major, index `y * width + x`). Activating
/// the map with an input vector selects the grid unit whose weight vector is
/// nearest to it; training pulls every grid unit towards each sample, scaled
/// by a Gaussian kernel of its grid distance from that winner.
///
/// The generator `R` initializes weights and shuffles the dataset each
/// training iteration.
#[derive(Debug, Clone)]
pub struct Map<R = ChaCha8Rng> {
    pub(super) config: MapConfig,
    pub(super) input_layer: Layer,
    pub(super) grid_layer: Layer,
    /// Current neighbourhood radius.
    pub(super) lambda: f64,
    pub(super) winner_id: usize,
    pub(super) rng: R,
}

impl Map<ChaCha8Rng> {
    /// Creates a map with random weights and default settings.
    pub fn from_dimensions(input_size: usize, width: usize, height: usize) -> Result<Self> {
        Self::new(&MapConfig::new(input_size, width, height))
    }

    /// Creates a map from a configuration, seeded by `config.seed` if set.
    pub fn new(config: &MapConfig) -> Result<Self> {
        Self::with_rng(config, seeded_rng(config.seed))
    }

    /// Restores a map from its persisted state.
    pub fn from_serialized_state(state: &MapState) -> Result<Self> {
        Self::from_serialized_state_with_rng(state, seeded_rng(None))
    }
}

impl<R: RandomSource> Map<R> {
    /// Creates a map with random weights drawn from `rng`.
    pub fn with_rng(config: &MapConfig, rng: R) -> Result<Self> {
        Self::build(config.clone(), None, rng)
    }

    /// Restores a map from its persisted state, using `rng` for later training.
    pub fn from_serialized_state_with_rng(state: &MapState, rng: R) -> Result<Self> {
        let config = MapConfig::new(state.input_size, state.width, state.height);
        Self::build(config, Some(&state.weights), rng)
    }

    fn build(config: MapConfig, weights: Option<&[Vec<f64>]>, mut rng: R) -> Result<Self> {
        config.validate()?;
        if let Some(weights) = weights {
            validate_weights(&config, weights)?;
        }

        let input_layer = Layer::new(config.input_size, UnitRole::Input);
        let mut grid_layer = Layer::new(config.total_units(), UnitRole::Grid);
        input_layer.connect_as_input_to(&mut grid_layer, &mut rng)?;

        for (id, unit) in grid_layer.units_mut().iter_mut().enumerate() {
            unit.set_position(Position {
                x: id % config.width,
                y: id / config.width,
            });
            if let Some(weights) = weights {
                unit.weights.clone_from(&weights[id]);
            }
        }

        assign_neighbour_distances(&mut grid_layer);

        debug!(
            "Built {}x{} map with {} inputs",
            config.width, config.height, config.input_size
        );

        let lambda = ((config.width * config.height) as f64).sqrt() / 2.0;
        Ok(Self {
            config,
            input_layer,
            grid_layer,
            lambda,
            winner_id: 0,
            rng,
        })
    }

    /// Feeds `input` through the map and selects the winning grid unit.
    ///
    /// Afterwards every grid unit's state is its distance to the input,
    /// min-max rescaled to [0, 1] (all zero if every unit is equidistant).
    /// Ties go to the lowest index.
    pub fn activate(&mut self, input: &[f64]) -> Result<&mut Self> {
        if input.len() != self.config.input_size {
            return Err(KohonenError::InputLength {
                expected: self.config.input_size,
                actual: input.len(),
            });
        }
        if let Some((index, &value)) = input.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(KohonenError::InvalidInput { index, value });
        }

        for (unit, &value) in self.input_layer.units_mut().iter_mut().zip(input) {
            unit.set_input(value)?;
        }

        let upstream = self.input_layer.units();
        let mut winner = 0;
        let mut best = f64::INFINITY;
        for (id, unit) in self.grid_layer.units_mut().iter_mut().enumerate() {
            unit.compute_activation(upstream)?;
            // Strict improvement only: the lowest index keeps exact ties.
            if id == 0 || unit.state < best {
                best = unit.state;
                winner = id;
            }
        }
        self.winner_id = winner;

        let (min, max) = state_range(self.grid_layer.units());
        for unit in self.grid_layer.units_mut() {
            unit.state = rescale(unit.state, min, max);
        }

        Ok(self)
    }

    /// Activates the map once per entry and returns each winner id.
    pub fn winners<D: AsRef<[f64]>>(&mut self, dataset: &[D]) -> Result<Vec<usize>> {
        dataset
            .iter()
            .map(|input| Ok(self.activate(input.as_ref())?.winner_id))
            .collect()
    }

    /// Activates the map once per entry and returns the distinct winners,
    /// ordered by id.
    pub fn hot_units<D: AsRef<[f64]>>(&mut self, dataset: &[D]) -> Result<Vec<&Unit>> {
        let mut hottest = BTreeSet::new();
        for input in dataset {
            hottest.insert(self.activate(input.as_ref())?.winner_id);
        }
        Ok(hottest
            .into_iter()
            .filter_map(|id| self.grid_layer.get(id))
            .collect())
    }

    /// Changes the floor of the default neighbourhood schedule.
    pub fn set_min_distance(&mut self, min_distance: f64) -> Result<()> {
        let mut config = self.config.clone();
        config.min_distance = min_distance;
        config.validate()?;
        self.config = config;
        Ok(())
    }
}

impl<R> Map<R> {
    /// Dimensionality of the input vectors.
    #[inline]
    pub fn input_size(&self) -> usize {
        self.config.input_size
    }

    /// Grid width.
    #[inline]
    pub fn width(&self) -> usize {
        self.config.width
    }

    /// Grid height.
    #[inline]
    pub fn height(&self) -> usize {
        self.config.height
    }

    /// Floor of the default neighbourhood schedule.
    #[inline]
    pub fn min_distance(&self) -> f64 {
        self.config.min_distance
    }

    /// Topology configuration.
    #[inline]
    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    /// Current neighbourhood radius.
    #[inline]
    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    /// Id of the grid unit that won the last activation.
    #[inline]
    pub fn winner_id(&self) -> usize {
        self.winner_id
    }

    /// The input layer.
    #[inline]
    pub fn input_layer(&self) -> &Layer {
        &self.input_layer
    }

    /// All grid units, in index order.
    #[inline]
    pub fn units(&self) -> &[Unit] {
        self.grid_layer.units()
    }

    /// Gets a grid unit by id, or `None` if out of range.
    #[inline]
    pub fn unit(&self, id: usize) -> Option<&Unit> {
        self.grid_layer.get(id)
    }

    /// The grid unit that won the last activation.
    pub fn winner_unit(&self) -> &Unit {
        &self.grid_layer.units()[self.winner_id]
    }

    /// Kernel exponent between two grid units: `-0.5 * |pos(a) - pos(b)|^2`.
    pub fn neighbour_distance(&self, a: usize, b: usize) -> Option<f64> {
        self.unit(a)?.neighbour_distances().get(b).copied()
    }

    /// `height` rows of `width` zeros with a 1 at the winner's position.
    pub fn identity_matrix(&self) -> Vec<Vec<f64>> {
        let mut matrix = vec![vec![0.0; self.config.width]; self.config.height];
        if let Some(p) = self.winner_unit().position() {
            matrix[p.y][p.x] = 1.0;
        }
        matrix
    }

    /// One-hot vector over all grid units, set at the winner.
    pub fn identity_output(&self) -> Vec<f64> {
        let mut output = vec![0.0; self.grid_layer.len()];
        output[self.winner_id] = 1.0;
        output
    }

    /// `height` rows of `width` unit states, min-max normalized across the grid.
    pub fn heatmap(&self) -> Vec<Vec<f64>> {
        let mut matrix = vec![vec![0.0; self.config.width]; self.config.height];
        let (min, max) = state_range(self.grid_layer.units());
        if max <= min {
            debug!("Heatmap over uniform states; all cells are 0");
        }
        for unit in self.grid_layer.units() {
            if let Some(p) = unit.position() {
                matrix[p.y][p.x] = rescale(unit.state, min, max);
            }
        }
        matrix
    }

    /// Snapshot of topology and weights, the only persisted representation.
    pub fn serialize(&self) -> MapState {
        MapState {
            input_size: self.config.input_size,
            width: self.config.width,
            height: self.config.height,
            weights: self
                .grid_layer
                .units()
                .iter()
                .map(|unit| unit.weights.clone())
                .collect(),
        }
    }
}

fn validate_weights(config: &MapConfig, weights: &[Vec<f64>]) -> Result<()> {
    if weights.len() != config.total_units() {
        return Err(KohonenError::Config(format!(
            "expected {} weight vectors for a {}x{} grid, got {}",
            config.total_units(),
            config.width,
            config.height,
            weights.len()
        )));
    }
    for (id, w) in weights.iter().enumerate() {
        if w.len() != config.input_size {
            return Err(KohonenError::Config(format!(
                "weight vector {} has length {}, expected {}",
                id,
                w.len(),
                config.input_size
            )));
        }
        if w.iter().any(|v| !v.is_finite()) {
            return Err(KohonenError::Config(format!(
                "weight vector {} contains a non-finite value",
                id
            )));
        }
    }
    Ok(())
}

fn assign_neighbour_distances(grid: &mut Layer) {
    let positions: Vec<Position> = grid.units().iter().filter_map(Unit::position).collect();
    let rows: Vec<Vec<f64>> = positions
        .par_iter()
        .map(|a| positions.iter().map(|b| -0.5 * a.distance_squared(b)).collect())
        .collect();

    for (unit, row) in grid.units_mut().iter_mut().zip(rows) {
        unit.set_neighbour_distances(row);
    }
}

fn state_range(units: &[Unit]) -> (f64, f64) {
    units
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), u| {
            (min.min(u.state), max.max(u.state))
        })
}

#[inline]
fn rescale(state: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    if range > 0.0 {
        (state - min) / range
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn seeded(input_size: usize, width: usize, height: usize) -> Map {
        let mut config = MapConfig::new(input_size, width, height);
        config.seed = Some(42);
        Map::new(&config).unwrap()
    }

    fn with_weights(width: usize, height: usize, weights: Vec<Vec<f64>>) -> Map {
        let state = MapState {
            input_size: weights[0].len(),
            width,
            height,
            weights,
        };
        Map::from_serialized_state_with_rng(&state, ChaCha8Rng::seed_from_u64(0)).unwrap()
    }

    #[test]
    fn test_map_creation() {
        let map = seeded(3, 4, 2);
        assert_eq!(map.units().len(), 8);
        assert_eq!(map.input_layer().len(), 3);
        assert_eq!(map.winner_id(), 0);
        assert!((map.lambda() - 8f64.sqrt() / 2.0).abs() < 1e-12);
        for unit in map.units() {
            assert_eq!(unit.weights.len(), 3);
            assert!(unit.weights.iter().all(|w| *w > -1.0 && *w < 1.0));
        }
    }

    #[test]
    fn test_unit_positions() {
        let map = seeded(2, 3, 2);
        for (id, unit) in map.units().iter().enumerate() {
            let p = unit.position().unwrap();
            assert_eq!(p.y * 3 + p.x, id);
        }
        assert_eq!(map.unit(4).unwrap().position(), Some(Position { x: 1, y: 1 }));
    }

    #[test]
    fn test_neighbour_distances_symmetric() {
        let map = seeded(2, 3, 3);
        let n = map.units().len();
        for a in 0..n {
            assert_eq!(map.neighbour_distance(a, a), Some(0.0));
            for b in 0..n {
                let ab = map.neighbour_distance(a, b).unwrap();
                assert_eq!(ab, map.neighbour_distance(b, a).unwrap());
                assert!(ab <= 0.0);
            }
        }
        // (0,0) to (2,2): -0.5 * 8
        assert_eq!(map.neighbour_distance(0, 8), Some(-4.0));
        assert_eq!(map.neighbour_distance(0, 9), None);
    }

    #[test]
    fn test_invalid_dimensions() {
        assert!(Map::from_dimensions(2, 0, 3).is_err());
        assert!(Map::from_dimensions(0, 3, 3).is_err());
    }

    #[test]
    fn test_overflowing_grid_is_rejected() {
        assert!(matches!(
            Map::from_dimensions(1, usize::MAX, 2),
            Err(KohonenError::Config(_))
        ));

        let state = MapState {
            input_size: 1,
            width: usize::MAX,
            height: 3,
            weights: Vec::new(),
        };
        assert!(matches!(
            Map::from_serialized_state(&state),
            Err(KohonenError::Config(_))
        ));
    }

    #[test]
    fn test_activate_selects_nearest() {
        let mut map = with_weights(
            2,
            2,
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
        );
        map.activate(&[0.9, 0.1]).unwrap();
        assert_eq!(map.winner_id(), 1);
        assert_eq!(map.winner_unit().id(), 1);

        let states: Vec<f64> = map.units().iter().map(|u| u.state).collect();
        assert_eq!(states[1], 0.0);
        assert_eq!(states[2], 1.0);
        assert!(states.iter().all(|s| (0.0..=1.0).contains(s)));
    }

    #[test]
    fn test_activate_tie_goes_to_lowest_index() {
        let mut map = with_weights(3, 1, vec![vec![1.0], vec![-1.0], vec![1.0]]);
        map.activate(&[0.0]).unwrap();
        assert_eq!(map.winner_id(), 0);

        map.activate(&[1.0]).unwrap();
        assert_eq!(map.winner_id(), 0);
    }

    #[test]
    fn test_activate_degenerate_states() {
        let mut map = with_weights(2, 1, vec![vec![0.5, 0.5], vec![0.5, 0.5]]);
        map.activate(&[0.0, 1.0]).unwrap();
        assert_eq!(map.winner_id(), 0);
        assert!(map.units().iter().all(|u| u.state == 0.0));

        let mut single = seeded(2, 1, 1);
        single.activate(&[3.0, 4.0]).unwrap();
        assert_eq!(single.units()[0].state, 0.0);
        assert_eq!(single.heatmap(), vec![vec![0.0]]);
    }

    #[test]
    fn test_activate_rejects_bad_input() {
        let mut map = seeded(3, 2, 2);
        match map.activate(&[0.0, f64::NAN, 1.0]) {
            Err(KohonenError::InvalidInput { index, .. }) => assert_eq!(index, 1),
            other => panic!("unexpected result: {:?}", other.map(|m| m.winner_id())),
        }
        assert!(matches!(
            map.activate(&[0.0, 1.0]),
            Err(KohonenError::InputLength { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_identity_queries() {
        let mut map = with_weights(
            3,
            2,
            vec![
                vec![0.0],
                vec![1.0],
                vec![2.0],
                vec![3.0],
                vec![4.0],
                vec![5.0],
            ],
        );
        map.activate(&[4.1]).unwrap();
        assert_eq!(map.winner_id(), 4);

        let matrix = map.identity_matrix();
        assert_eq!(matrix.len(), 2);
        assert_eq!(matrix[0].len(), 3);
        assert_eq!(matrix[1][1], 1.0);
        let ones: f64 = matrix.iter().flatten().sum();
        assert_eq!(ones, 1.0);

        let output = map.identity_output();
        assert_eq!(output, vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_heatmap_layout() {
        let mut map = with_weights(2, 2, vec![vec![0.0], vec![1.0], vec![2.0], vec![4.0]]);
        map.activate(&[0.0]).unwrap();

        let heat = map.heatmap();
        assert_eq!(heat[0][0], 0.0);
        assert_eq!(heat[1][1], 1.0);
        assert!((heat[0][1] - 1.0 / 16.0).abs() < 1e-12);
        assert!((heat[1][0] - 4.0 / 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_unit_lookup_out_of_range() {
        let map = seeded(2, 2, 2);
        assert!(map.unit(3).is_some());
        assert!(map.unit(4).is_none());
        assert!(map.unit(usize::MAX).is_none());
    }

    #[test]
    fn test_hot_units_deduplicates() {
        let mut map = with_weights(2, 1, vec![vec![0.0], vec![10.0]]);
        let hot = map
            .hot_units(&[[0.1], [0.2], [9.9], [0.0]])
            .unwrap();
        let ids: Vec<usize> = hot.iter().map(|u| u.id()).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(map.winner_id(), 0);
    }

    #[test]
    fn test_winners() {
        let mut map = with_weights(2, 1, vec![vec![0.0], vec![10.0]]);
        let winners = map.winners(&[vec![9.0], vec![1.0]]).unwrap();
        assert_eq!(winners, vec![1, 0]);
    }

    #[test]
    fn test_restore_rejects_mismatched_weights() {
        let state = MapState {
            input_size: 2,
            width: 2,
            height: 1,
            weights: vec![vec![0.0, 0.0], vec![0.0]],
        };
        assert!(matches!(
            Map::from_serialized_state(&state),
            Err(KohonenError::Config(_))
        ));

        let short = MapState {
            weights: vec![vec![0.0, 0.0]],
            ..state
        };
        assert!(Map::from_serialized_state(&short).is_err());
    }

    #[test]
    fn test_serialize_round_trip() {
        let map = seeded(3, 3, 2);
        let state = map.serialize();
        let restored = Map::from_serialized_state(&state).unwrap();
        assert_eq!(restored.serialize(), state);
    }

    #[test]
    fn test_set_min_distance() {
        let mut map = seeded(2, 2, 2);
        map.set_min_distance(0.5).unwrap();
        assert_eq!(map.min_distance(), 0.5);
        assert!(map.set_min_distance(0.0).is_err());
        assert_eq!(map.min_distance(), 0.5);
    }
}
