//! Random sources for weight initialization and dataset shuffling.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Uniform};

/// Source of randomness used by the map.
///
/// Blanket-implemented for every [`rand::Rng`], so any seeded generator can be
/// injected for deterministic runs.
pub trait RandomSource {
    /// Draws a weight uniformly from the open interval (-1, 1).
    fn uniform_weight(&mut self) -> f64;

    /// Returns a fresh random permutation of `0..len`.
    fn permutation(&mut self, len: usize) -> Vec<usize>;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn uniform_weight(&mut self) -> f64 {
        let dist = Uniform::new(-1.0, 1.0);
        loop {
            // Uniform is half-open; reject the lower bound.
            let w: f64 = dist.sample(self);
            if w > -1.0 {
                return w;
            }
        }
    }

    fn permutation(&mut self, len: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..len).collect();
        order.shuffle(self);
        order
    }
}

/// Creates the default generator, seeded if a seed is given.
pub fn seeded_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}
