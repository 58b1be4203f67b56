// Copyright (c) 2024 Mike Tsao

//! Time is measured in wall-clock milliseconds. The automation subsystem never
//! reads a clock itself; every operation that cares about time takes a
//! timestamp, and the [Engine](crate::Engine) mints those timestamps from a
//! [TimeSource]. Swapping in a [ManualTimeSource] makes every interpolation
//! deterministic and testable.

use core::ops::{Add, AddAssign, Sub};
use serde::{Deserialize, Serialize};
use std::{
    sync::{Arc, RwLock},
    time::Instant,
};

/// A timestamp or duration, in milliseconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Millis(pub f64);
impl Millis {
    /// Zero milliseconds.
    pub const fn zero() -> Millis {
        Millis(0.0)
    }

    /// Whether this duration is zero or negative, meaning "apply immediately."
    pub fn is_instant(&self) -> bool {
        self.0 <= 0.0
    }
}
impl From<f64> for Millis {
    fn from(value: f64) -> Self {
        Self(value)
    }
}
impl From<Millis> for f64 {
    fn from(value: Millis) -> Self {
        value.0
    }
}
impl Add for Millis {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}
impl AddAssign for Millis {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}
impl Sub for Millis {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

/// Something that can tell the engine what time it is.
pub trait TimeSource: core::fmt::Debug {
    /// The current time, relative to an origin that the implementation
    /// chooses. Only differences matter.
    fn now(&self) -> Millis;
}

/// A [TimeSource] backed by the system monotonic clock.
#[derive(Debug)]
pub struct SystemTimeSource {
    origin: Instant,
}
impl Default for SystemTimeSource {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}
impl TimeSource for SystemTimeSource {
    fn now(&self) -> Millis {
        Millis(self.origin.elapsed().as_secs_f64() * 1000.0)
    }
}

/// A [TimeSource] whose clock moves only when told to. Clones share the same
/// clock, so a test can keep one handle while the engine owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualTimeSource {
    now: Arc<RwLock<f64>>,
}
impl ManualTimeSource {
    /// Sets the absolute time.
    pub fn set(&self, now: Millis) {
        *self.now.write().unwrap() = now.0;
    }

    /// Moves the clock forward.
    pub fn advance(&self, delta: Millis) {
        *self.now.write().unwrap() += delta.0;
    }
}
impl TimeSource for ManualTimeSource {
    fn now(&self) -> Millis {
        Millis(*self.now.read().unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use more_asserts::assert_ge;

    #[test]
    fn system_time_source_is_monotonic() {
        let ts = SystemTimeSource::default();
        let a = ts.now();
        let b = ts.now();
        assert_ge!(b.0, a.0, "system time should never run backward");
    }

    #[test]
    fn manual_time_source_shares_clock_across_clones() {
        let ts = ManualTimeSource::default();
        let handle = ts.clone();
        handle.set(Millis(250.0));
        assert_eq!(ts.now(), Millis(250.0));
        handle.advance(Millis(50.0));
        assert_eq!(ts.now(), Millis(300.0));
    }
}
