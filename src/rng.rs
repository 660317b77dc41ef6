//! The simulation's single seeded randomness adapter.
//!
//! Grounded on `util/rng.h`/`rng.cpp`'s `SharedRand`, reworked from a
//! `call_once` process-wide singleton into an owned value threaded
//! explicitly through the simulator and planner (idiomatic Rust has no need
//! for the original's singleton machinery — see spec.md §5's "single
//! adapter" requirement and DESIGN.md's Open Question decision).

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Owned, seedable source of uniform and weighted-index draws.
///
/// `seed == 0` means "seed from OS entropy", matching
/// `SharedRand::setRandSeed`'s `if (new_rand_seed == 0) { use random_device }`.
#[derive(Debug, Clone)]
pub struct SpicompRng {
    seed: u32,
    rng: SmallRng,
}

impl SpicompRng {
    pub fn new(seed: u32) -> Self {
        let (seed, rng) = if seed == 0 {
            let mut os_seeded = SmallRng::from_os_rng();
            (os_seeded.random::<u32>().max(1), os_seeded)
        } else {
            (seed, SmallRng::seed_from_u64(seed as u64))
        };
        SpicompRng { seed, rng }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    /// A uniform integer in `[0, range)`. `range` must be positive.
    pub fn uniform_range(&mut self, range: i32) -> i32 {
        assert!(range > 0, "uniform_range requires a positive range");
        self.rng.random_range(0..range)
    }

    /// A uniform `f64` in `[0.0, 1.0)`.
    pub fn uniform_f64(&mut self) -> f64 {
        self.rng.random::<f64>()
    }

    /// A uniform `f64` in `[lo, hi)`.
    pub fn uniform_in(&mut self, lo: f64, hi: f64) -> f64 {
        self.rng.random_range(lo..hi)
    }

    /// Picks an index into `weights` with probability proportional to each
    /// weight. `weights` must be non-empty and contain at least one
    /// positive value.
    pub fn weighted_index(&mut self, weights: &[f64]) -> usize {
        WeightedIndex::new(weights)
            .expect("weights must be non-empty with at least one positive entry")
            .sample(&mut self.rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_produces_same_sequence() {
        let mut a = SpicompRng::new(42);
        let mut b = SpicompRng::new(42);
        for _ in 0..10 {
            assert_eq!(a.uniform_range(1000), b.uniform_range(1000));
        }
    }

    #[test]
    fn different_seeds_diverge() {
        let mut a = SpicompRng::new(1);
        let mut b = SpicompRng::new(2);
        let seq_a: Vec<i32> = (0..20).map(|_| a.uniform_range(1_000_000)).collect();
        let seq_b: Vec<i32> = (0..20).map(|_| b.uniform_range(1_000_000)).collect();
        assert_ne!(seq_a, seq_b);
    }

    #[test]
    fn weighted_index_respects_zero_weight() {
        let mut rng = SpicompRng::new(7);
        for _ in 0..50 {
            let idx = rng.weighted_index(&[0.0, 1.0, 0.0]);
            assert_eq!(idx, 1);
        }
    }
}
