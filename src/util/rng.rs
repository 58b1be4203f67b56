// Copyright (c) 2024 Mike Tsao

//! Provides a random-number generator for instance-id suffixes, parameter
//! randomization, and testing.

use byteorder::{BigEndian, ByteOrder};
use delegate::delegate;

/// A pseudorandom number generator (PRNG) for applications such as
/// digital-audio libraries that don't require cryptographically secure random
/// numbers.
#[derive(Debug)]
pub struct Rng(oorandom::Rand64);
impl Default for Rng {
    fn default() -> Self {
        // We want to panic if this fails, because it indicates that a core OS
        // facility isn't functioning.
        Self::new_with_seed(Self::generate_seed().unwrap())
    }
}
#[allow(missing_docs)]
impl Rng {
    /// Pass the same number to [Rng::new_with_seed()] to get the same stream
    /// back again. Good for reproducing test failures.
    pub fn new_with_seed(seed: u128) -> Self {
        Self(oorandom::Rand64::new(seed))
    }

    /// Create a sufficiently high-quality random number that's suitable for
    /// [Rng].
    pub fn generate_seed() -> anyhow::Result<u128> {
        let mut bytes = [0u8; 16];

        getrandom::getrandom(&mut bytes)?;
        Ok(BigEndian::read_u128(&bytes))
    }

    /// Returns a uniform value in the given inclusive range. Degenerate ranges
    /// (min >= max) return min.
    pub fn rand_float_in(&mut self, min: f64, max: f64) -> f64 {
        if min >= max {
            min
        } else {
            min + self.rand_float() * (max - min)
        }
    }

    delegate! {
        to self.0 {
            pub fn rand_u64(&mut self) -> u64;
            pub fn rand_i64(&mut self) -> i64;
            pub fn rand_float(&mut self) -> f64;
            pub fn rand_range(&mut self, range: core::ops::Range<u64>) -> u64;
        }
    }
}
