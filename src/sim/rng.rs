//! Seeded RNG for in-simulation randomness
//!
//! Every peer that creates a `SimRng` from the same seed and makes the same
//! calls gets the same numbers. The generator lives inside versioned state,
//! so rollback restores the stream position along with everything else.

use rand::{Rng, RngCore, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimRng {
    inner: Pcg32,
}

impl SimRng {
    /// Seed 0 is fine: PCG's seeding scrambles it into a full-period stream.
    pub fn new(seed: u32) -> Self {
        Self {
            inner: Pcg32::seed_from_u64(u64::from(seed)),
        }
    }

    pub fn next_u32(&mut self) -> u32 {
        self.inner.next_u32()
    }

    /// Uniform integer in `[lo, hi)`; an empty range yields `lo`
    pub fn next_range(&mut self, lo: i32, hi: i32) -> i32 {
        if hi <= lo {
            return lo;
        }
        self.inner.random_range(lo..hi)
    }

    /// Uniform float in `[0, 1)`
    pub fn next_unit(&mut self) -> f32 {
        // 24 high bits map exactly onto the f32 mantissa
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}
