//! Random streams consumed by generator evaluation.
//!
//! The engine never owns a stream: callers pass one into every
//! evaluation, and batch generation forks and reseeds child streams
//! instead of storing state on nodes.

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};

/// Capability the engine needs from a random number source.
pub trait RandomSource: RngCore + Sized {
    /// Derives a fresh, independent stream from the current state.
    fn fork(&mut self) -> Self;

    /// Deterministically resets the state from a seed and an index.
    fn reseed(&mut self, seed: u64, index: u64);

    /// Uniform draw from `[0, bound)`. Returns 0 for non-positive bounds.
    fn next_double(&mut self, bound: f64) -> f64 {
        if bound > 0.0 {
            self.gen::<f64>() * bound
        } else {
            0.0
        }
    }

    /// Standard normal draw (mean 0, deviation 1), Box-Muller transform.
    fn next_gaussian(&mut self) -> f64 {
        // 1 - u keeps the logarithm argument in (0, 1].
        let u1 = 1.0 - self.gen::<f64>();
        let u2 = self.gen::<f64>();
        (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
    }
}

/// Default stream backed by `StdRng`.
#[derive(Debug, Clone)]
pub struct Stream {
    rng: StdRng,
}

impl Stream {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeds from operating system entropy.
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RngCore for Stream {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

impl RandomSource for Stream {
    fn fork(&mut self) -> Self {
        Self::new(self.rng.next_u64())
    }

    fn reseed(&mut self, seed: u64, index: u64) {
        self.rng = StdRng::seed_from_u64(mix(seed, index));
    }
}

/// Combines seed and index so that neighbouring indices land far apart.
fn mix(seed: u64, index: u64) -> u64 {
    let mut z = seed ^ index.wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
