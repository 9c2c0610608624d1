//! Seeded uniform random number generation.
//!
//! Every sampling path in the workspace takes an explicit `u64` seed so
//! simulation runs are reproducible.

use cvar_core::Real;
use rand_mt::Mt19937GenRand64;

/// A uniform pseudo-random number generator based on the Mersenne Twister
/// MT19937-64 algorithm.
pub struct MersenneTwisterUniformRng {
    rng: Mt19937GenRand64,
}

impl MersenneTwisterUniformRng {
    /// Create a new generator with the given seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mt19937GenRand64::new(seed),
        }
    }

    /// Generate the next uniform deviate in `[0, 1)`.
    pub fn next_real(&mut self) -> Real {
        let u: u64 = self.rng.next_u64();
        u as f64 / (u64::MAX as f64 + 1.0)
    }

    /// Generate the next uniform deviate in the open interval `(0, 1)`.
    ///
    /// Exact endpoint values are skipped so inverse-CDF transforms never
    /// produce ±∞.
    pub fn next_open01(&mut self) -> Real {
        loop {
            let u = self.next_real();
            if u > 0.0 && u < 1.0 {
                return u;
            }
        }
    }
}
