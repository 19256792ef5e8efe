//! Per-tree random streams.
//!
//! Branching decisions and elongation-rate deviates come from separate
//! seeded streams, so a tree grows identically for a given seed no
//! matter which thread advances it.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;

#[derive(Debug, Clone)]
pub struct GrowthRng {
    branching: ChaCha8Rng,
    elongation: ChaCha8Rng,
}

impl GrowthRng {
    /// Both streams share the seed but use distinct ChaCha stream ids,
    /// so neighbouring seeds in a population never overlap.
    pub fn seed_from_u64(seed: u64) -> Self {
        let mut elongation = ChaCha8Rng::seed_from_u64(seed);
        elongation.set_stream(1);
        Self {
            branching: ChaCha8Rng::seed_from_u64(seed),
            elongation,
        }
    }

    /// Uniform draw in `[0, 1)` for a branching test.
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.branching.random::<f64>()
    }

    /// Standard-normal elongation-rate deviate `e` such that the
    /// resulting rate `cv * rate * e + rate` is strictly positive.
    ///
    /// ### Panics
    /// Loops forever unless `rate > 0`; configuration validation rules
    /// that out before any tree is built.
    pub fn rate_deviate(&mut self, rate: f32, cv: f32) -> f32 {
        debug_assert!(rate > 0.0, "mean elongation rate must be positive");
        loop {
            let deviate: f64 = self.elongation.sample(StandardNormal);
            let deviate = deviate as f32;
            if cv * rate * deviate + rate > 0.0 {
                return deviate;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_gives_same_streams() {
        let mut a = GrowthRng::seed_from_u64(7);
        let mut b = GrowthRng::seed_from_u64(7);
        for _ in 0..32 {
            assert_eq!(a.uniform(), b.uniform());
            assert_eq!(a.rate_deviate(0.22, 0.28), b.rate_deviate(0.22, 0.28));
        }
    }

    #[test]
    fn uniform_stays_in_unit_interval() {
        let mut rng = GrowthRng::seed_from_u64(1);
        for _ in 0..1000 {
            let u = rng.uniform();
            assert!((0.0..1.0).contains(&u));
        }
    }

    #[test]
    fn rate_deviate_always_gives_positive_growth() {
        let mut rng = GrowthRng::seed_from_u64(3);
        // A large CV makes rejections frequent.
        for _ in 0..1000 {
            let e = rng.rate_deviate(0.5, 2.0);
            assert!(2.0 * 0.5 * e + 0.5 > 0.0);
        }
    }

    #[test]
    fn branching_draws_do_not_disturb_elongation_stream() {
        let mut a = GrowthRng::seed_from_u64(11);
        let mut b = GrowthRng::seed_from_u64(11);
        for _ in 0..5 {
            a.uniform();
        }
        assert_eq!(a.rate_deviate(1.0, 0.1), b.rate_deviate(1.0, 0.1));
    }
}
