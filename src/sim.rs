//! Injectable randomness for simulated external systems.
//!
//! Step routers never call into `rand` directly; the engine draws one
//! uniform roll per evaluation from a [`RandomSource`] and hands it to the
//! step through its context. Tests swap in [`FixedRandom`] to force either
//! side of a probabilistic branch.

use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

/// Source of uniform rolls in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    fn roll(&self) -> f64;
}

/// Production source backed by the thread-local RNG.
#[derive(Debug, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn roll(&self) -> f64 {
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

/// Deterministic source returning a fixed value until changed.
///
/// `set()` takes effect for every subsequent roll, so a test can force the
/// "unavailable" branch for one evaluation and the happy path afterwards.
#[derive(Debug)]
pub struct FixedRandom {
    bits: AtomicU64,
}

impl FixedRandom {
    pub fn new(value: f64) -> Self {
        Self {
            bits: AtomicU64::new(value.to_bits()),
        }
    }

    pub fn set(&self, value: f64) {
        self.bits.store(value.to_bits(), Ordering::SeqCst);
    }
}

impl RandomSource for FixedRandom {
    fn roll(&self) -> f64 {
        f64::from_bits(self.bits.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thread_random_stays_in_unit_interval() {
        let source = ThreadRandom;
        for _ in 0..100 {
            let roll = source.roll();
            assert!((0.0..1.0).contains(&roll));
        }
    }

    #[test]
    fn fixed_random_returns_configured_value() {
        let source = FixedRandom::new(0.05);
        assert_eq!(source.roll(), 0.05);
        assert_eq!(source.roll(), 0.05);

        source.set(0.95);
        assert_eq!(source.roll(), 0.95);
    }
}
