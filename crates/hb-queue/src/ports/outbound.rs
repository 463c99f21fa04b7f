//! Outbound (Driven) ports for the queue subsystem.
//!
//! Clock and randomness are injected so that wait-time estimates and the
//! simulator can run deterministically under test.

use crate::domain::Timestamp;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Time source for consistent timestamp handling.
///
/// Abstracted to allow testing with deterministic time.
pub trait TimeSource: Send + Sync {
    /// Returns the current wall-clock time.
    fn now(&self) -> Timestamp;
}

/// Default system time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Timestamp {
        chrono::Utc::now()
    }
}

/// Source of the jitter and probabilities used by wait-time estimation and
/// the simulator.
pub trait RandomSource: Send {
    /// Returns a uniformly distributed integer in `min..=max`.
    ///
    /// Returns `min` when `max <= min`.
    fn range_inclusive(&mut self, min: u32, max: u32) -> u32;

    /// Returns true with the given probability.
    fn chance(&mut self, probability: f64) -> bool;
}

/// `RandomSource` backed by a `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R> RngSource<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Reproducible generator for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Generator seeded from the operating system.
    pub fn from_entropy() -> Self {
        Self::new(StdRng::from_entropy())
    }
}

impl<R: Rng + Send> RandomSource for RngSource<R> {
    fn range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        self.rng.gen_range(min..=max)
    }

    fn chance(&mut self, probability: f64) -> bool {
        // Also rejects NaN.
        if !(probability > 0.0) {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.gen_bool(probability)
    }
}

/// Deterministic `RandomSource` that always yields the same value.
///
/// `range_inclusive` returns `value` clamped into the requested range and
/// `chance` returns `hit` regardless of probability (except for
/// non-positive probabilities, which never hit).
#[derive(Debug, Clone, Copy)]
pub struct FixedRandom {
    value: u32,
    hit: bool,
}

impl FixedRandom {
    pub fn new(value: u32, hit: bool) -> Self {
        Self { value, hit }
    }

    /// No jitter, no random events.
    pub fn zero() -> Self {
        Self::new(0, false)
    }
}

impl RandomSource for FixedRandom {
    fn range_inclusive(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            return min;
        }
        self.value.clamp(min, max)
    }

    fn chance(&mut self, probability: f64) -> bool {
        probability > 0.0 && self.hit
    }
}

/// Mock time source for testing.
#[cfg(test)]
pub struct MockTimeSource {
    time: parking_lot::Mutex<Timestamp>,
}

#[cfg(test)]
impl MockTimeSource {
    pub fn new(initial: Timestamp) -> Self {
        Self {
            time: parking_lot::Mutex::new(initial),
        }
    }

    pub fn advance_minutes(&self, minutes: i64) {
        let mut time = self.time.lock();
        *time += chrono::Duration::minutes(minutes);
    }
}

#[cfg(test)]
impl TimeSource for MockTimeSource {
    fn now(&self) -> Timestamp {
        *self.time.lock()
    }
}
