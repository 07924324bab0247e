//! Competitive-learning training loop.

use crate::config::{MapConfig, TrainConfig};
use crate::error::{KohonenError, Result};
use crate::rng::RandomSource;
use crate::som::Map;
use log::info;

/// Linear neighbourhood radius schedule, from the grid diagonal down to the
/// configured minimum distance.
#[derive(Debug, Clone, Copy)]
pub struct LinearDecay {
    start: f64,
    end: f64,
    iterations: usize,
}

impl LinearDecay {
    /// The default schedule for a map trained over `iterations` passes.
    pub fn for_map(config: &MapConfig, iterations: usize) -> Self {
        Self {
            start: config.diagonal_radius(),
            end: config.min_distance,
            iterations,
        }
    }

    /// Radius at the given iteration.
    #[inline]
    pub fn at(&self, iteration: usize) -> f64 {
        let t = iteration as f64 / self.iterations.max(1) as f64;
        self.start - (self.start - self.end) * t
    }
}

/// Options for a training run.
pub struct TrainOptions<'a> {
    /// Iterations, progress interval and learning rate.
    pub config: TrainConfig,
    lambda: Option<Box<dyn Fn(usize) -> f64 + 'a>>,
}

impl Default for TrainOptions<'_> {
    fn default() -> Self {
        Self::from(TrainConfig::default())
    }
}

impl From<TrainConfig> for TrainOptions<'_> {
    fn from(config: TrainConfig) -> Self {
        Self {
            config,
            lambda: None,
        }
    }
}

impl<'a> TrainOptions<'a> {
    /// Sets the number of passes over the dataset.
    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.config.iterations = iterations;
        self
    }

    /// Sets the learning rate.
    pub fn with_rate(mut self, rate: f64) -> Self {
        self.config.rate = rate;
        self
    }

    /// Sets the progress interval; `None` silences progress.
    pub fn with_log(mut self, log: Option<usize>) -> Self {
        self.config.log = log;
        self
    }

    /// Replaces the default radius schedule with `f(iteration)`.
    ///
    /// The returned radius must stay positive and finite.
    pub fn with_lambda<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) -> f64 + 'a,
    {
        self.lambda = Some(Box::new(f));
        self
    }
}

/// Progress notification emitted every `log` iterations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainProgress {
    /// Iteration just completed (0-based).
    pub iteration: usize,
    /// Total iterations in the run.
    pub iterations: usize,
    /// Neighbourhood radius used for this iteration.
    pub lambda: f64,
}

impl<R: RandomSource> Map<R> {
    /// Trains the map on `dataset`.
    ///
    /// See [`Map::train_with_progress`].
    pub fn train<D: AsRef<[f64]>>(
        &mut self,
        dataset: &[D],
        options: &TrainOptions<'_>,
    ) -> Result<&mut Self> {
        self.train_with_progress(dataset, options, |_| {})
    }

    /// Trains the map on `dataset`, calling `progress` every `log` iterations.
    ///
    /// Each iteration visits the whole dataset in a fresh random order. Every
    /// sample is activated to find the winner, then every grid unit moves
    /// towards the sample by `rate * exp(d / lambda^2)`, where `d` is its
    /// kernel exponent relative to the winner. A malformed sample aborts the
    /// whole run.
    pub fn train_with_progress<D, F>(
        &mut self,
        dataset: &[D],
        options: &TrainOptions<'_>,
        mut progress: F,
    ) -> Result<&mut Self>
    where
        D: AsRef<[f64]>,
        F: FnMut(TrainProgress),
    {
        if dataset.is_empty() {
            return Err(KohonenError::Training("No training samples provided".to_string()));
        }
        let rate = options.config.rate;
        if !rate.is_finite() {
            return Err(KohonenError::Config(format!("learning rate must be finite, got {}", rate)));
        }

        let iterations = options.config.iterations;
        let schedule = LinearDecay::for_map(&self.config, iterations);

        info!(
            "Training map: {} samples, {}x{} grid, {} iterations, rate={}",
            dataset.len(),
            self.config.width,
            self.config.height,
            iterations,
            rate
        );

        for iteration in 0..iterations {
            let lambda = match &options.lambda {
                Some(f) => f(iteration),
                None => schedule.at(iteration),
            };
            let lambda_sq = lambda * lambda;
            // The kernel divides by lambda^2, which must not underflow or overflow.
            if !lambda.is_finite() || lambda <= 0.0 || !lambda_sq.is_normal() {
                return Err(KohonenError::Training(format!(
                    "Neighbourhood radius must be positive and finite, got {} at iteration {}",
                    lambda, iteration
                )));
            }
            self.lambda = lambda;

            for idx in self.rng.permutation(dataset.len()) {
                let input = dataset[idx].as_ref();
                self.activate(input)?;
                self.pull_neighbourhood(input, lambda_sq, rate);
            }

            if options.config.should_log(iteration) {
                info!("Iteration {}/{}: lambda={:.4}", iteration, iterations, lambda);
                progress(TrainProgress {
                    iteration,
                    iterations,
                    lambda,
                });
            }
        }

        info!("Map training completed");
        Ok(self)
    }

    fn pull_neighbourhood(&mut self, input: &[f64], lambda_sq: f64, rate: f64) {
        let winner = self.winner_id;
        for unit in self.grid_layer.units_mut() {
            // The distance matrix is symmetric, so each unit reads its own row.
            let kernel = (unit.neighbour_distances()[winner] / lambda_sq).exp();
            unit.pull_towards(input, kernel * rate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MapState;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn seeded(input_size: usize, width: usize, height: usize) -> Map {
        let mut config = MapConfig::new(input_size, width, height);
        config.seed = Some(42);
        Map::new(&config).unwrap()
    }

    #[test]
    fn test_linear_decay() {
        let config = MapConfig::new(2, 3, 4);
        let schedule = LinearDecay::for_map(&config, 10);

        assert!((schedule.at(0) - 5.0).abs() < 1e-12);
        assert!((schedule.at(5) - 3.5).abs() < 1e-12);
        assert!(schedule.at(9) > 2.0);
        assert!(schedule.at(9) < schedule.at(0));
    }

    #[test]
    fn test_default_options() {
        let options = TrainOptions::default();
        assert_eq!(options.config.iterations, 100);
        assert_eq!(options.config.log, Some(10));
        assert!((options.config.rate - 0.3).abs() < 1e-12);
        assert!(options.lambda.is_none());
    }

    #[test]
    fn test_single_step_update() {
        let state = MapState {
            input_size: 1,
            width: 2,
            height: 1,
            weights: vec![vec![0.0], vec![4.0]],
        };
        let mut map =
            Map::from_serialized_state_with_rng(&state, ChaCha8Rng::seed_from_u64(1)).unwrap();

        let options = TrainOptions::default()
            .with_iterations(1)
            .with_rate(0.5)
            .with_log(None)
            .with_lambda(|_| 1.0);
        map.train(&[[1.0]], &options).unwrap();

        let units = map.units();
        // Winner moves half way; its neighbour by 0.5 * exp(-0.5).
        assert!((units[0].weights[0] - 0.5).abs() < 1e-12);
        let expected = 4.0 + (1.0 - 4.0) * 0.5 * (-0.5f64).exp();
        assert!((units[1].weights[0] - expected).abs() < 1e-12);
        assert_eq!(map.lambda(), 1.0);
    }

    #[test]
    fn test_progress_cadence() {
        let mut map = seeded(2, 2, 2);
        let options = TrainOptions::default().with_iterations(25).with_log(Some(10));

        let mut seen = Vec::new();
        map.train_with_progress(&[[0.0, 0.0], [1.0, 1.0]], &options, |p| {
            seen.push(p.iteration)
        })
        .unwrap();
        assert_eq!(seen, vec![0, 10, 20]);
    }

    #[test]
    fn test_rejects_bad_lambda() {
        let mut map = seeded(2, 2, 2);
        let options = TrainOptions::default().with_lambda(|i| 1.0 - i as f64);
        let result = map.train(&[[0.0, 0.0]], &options);
        assert!(matches!(result, Err(KohonenError::Training(_))));

        for tiny in [1e-200, f64::MIN_POSITIVE] {
            let mut map = seeded(1, 2, 1);
            let options = TrainOptions::default().with_lambda(move |_| tiny);
            let result = map.train(&[[0.5]], &options);
            assert!(matches!(result, Err(KohonenError::Training(_))));
            assert!(map
                .units()
                .iter()
                .all(|u| u.weights.iter().all(|w| w.is_finite())));
        }

        let mut map = seeded(1, 2, 1);
        let options = TrainOptions::default().with_lambda(|_| 1e200);
        assert!(map.train(&[[0.5]], &options).is_err());
    }

    #[test]
    fn test_default_schedule_reaches_final_radius() {
        let mut config = MapConfig::new(2, 3, 2);
        config.seed = Some(8);
        let mut map = Map::new(&config).unwrap();

        let options = TrainOptions::default().with_iterations(12).with_log(None);
        map.train(&[[0.0, 0.0], [1.0, 1.0]], &options).unwrap();

        let expected = LinearDecay::for_map(&config, 12).at(11);
        assert_eq!(map.lambda(), expected);
        assert!(expected > config.min_distance);
        assert!(expected < config.diagonal_radius());
    }

    #[test]
    fn test_bad_sample_aborts() {
        let mut map = seeded(2, 2, 2);
        let dataset = vec![vec![0.0, 0.0], vec![f64::NAN, 0.0]];
        let result = map.train(&dataset, &TrainOptions::default().with_iterations(3));
        assert!(matches!(
            result,
            Err(KohonenError::InvalidInput { index: 0, .. })
        ));
    }

    #[test]
    fn test_empty_dataset() {
        let mut map = seeded(2, 2, 2);
        let empty: Vec<Vec<f64>> = Vec::new();
        assert!(map.train(&empty, &TrainOptions::default()).is_err());
    }

    #[test]
    fn test_seeded_training_is_deterministic() {
        let dataset = [[0.0, 0.0], [0.0, 1.0], [1.0, 0.0], [1.0, 1.0]];
        let options = TrainOptions::default().with_iterations(20).with_log(None);

        let mut a = seeded(2, 3, 3);
        let mut b = seeded(2, 3, 3);
        a.train(&dataset, &options).unwrap();
        b.train(&dataset, &options).unwrap();
        assert_eq!(a.serialize(), b.serialize());
    }
}
