//! # RNG Module
//!
//! The per-shard generator behind [`Source`](crate::Source).
//!
//! ## Design Choices
//!
//! **Generator**: PCG with 128-bit state and XSL-RR 128/64 output
//! - One 128-bit LCG step per draw, then a xorshift-low + random rotation
//!   permutation down to 64 bits
//! - Period 2^128; passes BigCrush; a few nanoseconds per draw
//! - Not cryptographically secure
//!
//! **Seeding**: `seed(x)` places `x` in both halves of the state. Adjacent
//! seeds (`x`, `x + 1`, ...) therefore start far apart in the output
//! sequence after the first step's multiply, which is what the sharded
//! source relies on when it hands consecutive seeds to its shards.
//!
//! **No `Copy`**: Copying an RNG duplicates the stream, causing identical
//! "random" output from two places. Use `Clone` explicitly when needed.
//!
//! ## Thread Safety
//!
//! NOT thread-safe. `next_u64` takes `&mut self`; the sharded source puts
//! each instance behind its own mutex.

/// LCG multiplier (128-bit).
const MULTIPLIER: u128 = 0x2360_ED05_1FC6_5DA4_4385_DF64_9FCC_F645;

/// LCG increment (128-bit, odd).
const INCREMENT: u128 = 0x5851_F42D_4C95_7F2D_1405_7B7E_F767_814F;

/// Deterministic 128-bit PCG generator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Pcg128 {
    state: u128,
}

impl Pcg128 {
    /// Create a generator from a 64-bit seed.
    #[inline]
    pub fn new(seed: u64) -> Self {
        let mut rng = Self { state: 0 };
        rng.seed(seed);
        rng
    }

    /// Reset the state from a 64-bit seed.
    #[inline]
    pub fn seed(&mut self, seed: u64) {
        self.state = ((seed as u128) << 64) | seed as u128;
    }

    /// Advance one step and return 64 output bits.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(MULTIPLIER)
            .wrapping_add(INCREMENT);
        let hi = (self.state >> 64) as u64;
        let lo = self.state as u64;
        // Top 6 bits pick the rotation.
        (hi ^ lo).rotate_right((hi >> 58) as u32)
    }

    /// Current internal state, for checkpointing and tests.
    #[inline]
    pub fn state(&self) -> u128 {
        self.state
    }
}
