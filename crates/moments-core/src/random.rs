//! Injectable randomness.
//!
//! Every random decision in the scheduler (posting intervals, reaction
//! delays, like/comment/reply draws) goes through a single
//! [`RandomSource`], so tests can pin behavior with a [`SequenceRandom`]
//! and operators can reproduce a run with a [`SeededRandom`].

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// A source of uniform draws in `[0, 1)`.
pub trait RandomSource: Send + Sync {
    /// Return the next uniform value in `[0, 1)`.
    fn next_unit(&self) -> f64;
}

/// Draw once and report whether the draw falls below `chance`.
///
/// A chance of `0.0` never succeeds and a chance of `1.0` always does,
/// since draws are strictly below one.
pub fn roll(random: &dyn RandomSource, chance: f64) -> bool {
    random.next_unit() < chance
}

/// Draw a duration uniformly from `[min, max]`.
///
/// Swapped bounds are tolerated. Equal bounds still consume one draw so
/// the sequence of draws does not depend on configuration values.
pub fn uniform_duration(random: &dyn RandomSource, min: Duration, max: Duration) -> Duration {
    let (low, high) = if min <= max { (min, max) } else { (max, min) };
    let unit = random.next_unit().clamp(0.0, 1.0);
    low.saturating_add(high.saturating_sub(low).mul_f64(unit))
}

/// Thread-local RNG from `rand`. The production default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn next_unit(&self) -> f64 {
        rand::rng().random::<f64>()
    }
}

/// Deterministic RNG seeded once, for reproducible runs.
#[derive(Debug)]
pub struct SeededRandom {
    rng: Mutex<SmallRng>,
}

impl SeededRandom {
    /// Create a generator from `seed`.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(SmallRng::seed_from_u64(seed)),
        }
    }
}

impl RandomSource for SeededRandom {
    fn next_unit(&self) -> f64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .random::<f64>()
    }
}

/// Replays a fixed sequence of values, cycling when exhausted.
///
/// Values are clamped into `[0, 1)`. An empty sequence yields `0.0`.
#[derive(Debug)]
pub struct SequenceRandom {
    values: Vec<f64>,
    cursor: AtomicUsize,
}

impl SequenceRandom {
    /// Largest value the sequence will hand out.
    const BELOW_ONE: f64 = 1.0 - f64::EPSILON;

    /// Replay `values` in order.
    pub fn new(values: Vec<f64>) -> Self {
        Self {
            values,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Always return `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    /// Number of draws taken so far.
    pub fn draws(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }
}

impl RandomSource for SequenceRandom {
    fn next_unit(&self) -> f64 {
        let position = self.cursor.fetch_add(1, Ordering::AcqRel);
        let Some(index) = position.checked_rem(self.values.len()) else {
            return 0.0;
        };
        self.values
            .get(index)
            .copied()
            .map_or(0.0, |v| if v.is_nan() { 0.0 } else { v.clamp(0.0, Self::BELOW_ONE) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_cycles_and_clamps() {
        let random = SequenceRandom::new(vec![0.25, 2.0, -1.0]);
        assert!((random.next_unit() - 0.25).abs() < 1e-9);
        assert!(random.next_unit() < 1.0);
        assert!(random.next_unit().abs() < 1e-9);
        assert!((random.next_unit() - 0.25).abs() < 1e-9);
        assert_eq!(random.draws(), 4);
    }

    #[test]
    fn empty_sequence_yields_zero() {
        let random = SequenceRandom::new(Vec::new());
        assert!(random.next_unit().abs() < 1e-9);
    }

    #[test]
    fn roll_edges() {
        let high = SequenceRandom::constant(0.999);
        assert!(roll(&high, 1.0));
        assert!(!roll(&high, 0.5));

        let low = SequenceRandom::constant(0.0);
        assert!(!roll(&low, 0.0));
        assert!(roll(&low, 0.01));
    }

    #[test]
    fn uniform_duration_interpolates() {
        let random = SequenceRandom::constant(0.5);
        let d = uniform_duration(&random, Duration::from_secs(10), Duration::from_secs(20));
        assert_eq!(d, Duration::from_secs(15));

        let swapped = uniform_duration(&random, Duration::from_secs(20), Duration::from_secs(10));
        assert_eq!(swapped, Duration::from_secs(15));
    }

    #[test]
    fn equal_bounds_still_consume_a_draw() {
        let random = SequenceRandom::constant(0.3);
        let d = uniform_duration(&random, Duration::from_secs(5), Duration::from_secs(5));
        assert_eq!(d, Duration::from_secs(5));
        assert_eq!(random.draws(), 1);
    }

    #[test]
    fn seeded_random_is_reproducible_and_in_range() {
        let a = SeededRandom::new(7);
        let b = SeededRandom::new(7);
        for _ in 0..100 {
            let x = a.next_unit();
            let y = b.next_unit();
            assert!((0.0..1.0).contains(&x));
            assert!((x - y).abs() < f64::EPSILON);
        }
    }
}
