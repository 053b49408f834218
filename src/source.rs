//! Sharded source of uniform `u64` values.
//!
//! # Design
//!
//! One [`Pcg128`] per shard, each behind its own mutex in its own padded
//! slot. A draw resolves the caller's shard, locks it, steps the generator
//! once and unlocks. The critical section is a single 128-bit multiply-add,
//! and with one shard per processor the lock is almost never contended.
//!
//! # Seeding
//!
//! A source is seeded from one 64-bit value, either drawn from the OS
//! entropy source or supplied explicitly. Shard `i` receives `seed + i`
//! (wrapping), handed out by an atomically incremented counter in index
//! order. [`reseed`](Source::reseed) repeats the derivation under each
//! shard's lock.
//!
//! # Non-determinism
//!
//! A `Source` is deliberately not reproducible. Even with an explicit seed
//! the *per-shard* streams are fixed, but which shard serves which call
//! depends on where threads happen to run, so the global output order
//! varies from run to run. Use [`Pcg128`] directly when a reproducible
//! stream is needed.
//!
//! # Distributions
//!
//! `&Source` implements [`rand_core::RngCore`], so everything in `rand`'s
//! [`Rng`](rand::Rng) and in `rand_distr` works on it:
//!
//! ```
//! use rand::Rng;
//!
//! let source = percpu::Source::with_seed(7);
//! let mut rng = &source;
//! let roll: u32 = rng.random_range(1..=6);
//! assert!((1..=6).contains(&roll));
//! ```

#[cfg(loom)]
use loom::sync::Mutex;
#[cfg(not(loom))]
use std::sync::Mutex;

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use rand_core::RngCore;

use crate::entropy;
use crate::error::PercpuError;
use crate::parallelism::ParallelismDegree;
use crate::rng::Pcg128;
use crate::shard_index::{CpuShardIndex, ShardIndexProvider};
use crate::values::ShardedValues;

/// Generator state of one shard. Only touched while its mutex is held.
struct ShardRng {
    /// Seed this shard was last (re)seeded with.
    seed: u64,
    pcg: Pcg128,
}

impl ShardRng {
    fn new(seed: u64) -> Self {
        Self {
            seed,
            pcg: Pcg128::new(seed),
        }
    }
}

/// Returns a closure yielding `seed, seed + 1, ...` (wrapping).
fn derived_seeds(seed: u64) -> impl FnMut() -> u64 {
    let next = AtomicU64::new(seed);
    move || next.fetch_add(1, Ordering::Relaxed)
}

/// A source of uniformly distributed pseudo-random `u64` values that many
/// threads can draw from without contending on one lock.
pub struct Source<S = CpuShardIndex> {
    shards: ShardedValues<Mutex<ShardRng>, S>,
}

impl Source {
    /// Creates a source with a seed from the OS entropy source and one
    /// shard per usable processor.
    ///
    /// # Errors
    ///
    /// Returns [`PercpuError::Entropy`] if the entropy source is unavailable.
    pub fn new() -> Result<Self, PercpuError> {
        Self::with_parallelism(ParallelismDegree::detect())
    }

    /// Entropy-seeded source with exactly `parallelism` shards.
    pub fn with_parallelism(parallelism: ParallelismDegree) -> Result<Self, PercpuError> {
        Self::with_provider(parallelism, CpuShardIndex::new())
    }

    /// Creates a source from an explicit seed.
    ///
    /// The per-shard seeds are reproducible; the global output order is not.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_seed_and_parallelism(seed, ParallelismDegree::detect())
    }

    /// Explicitly seeded source with exactly `parallelism` shards.
    pub fn with_seed_and_parallelism(seed: u64, parallelism: ParallelismDegree) -> Self {
        Self::with_seed_and_provider(seed, parallelism, CpuShardIndex::new())
    }
}

impl<S: ShardIndexProvider> Source<S> {
    /// Entropy-seeded source whose shards are selected through `provider`.
    pub fn with_provider(parallelism: ParallelismDegree, provider: S) -> Result<Self, PercpuError> {
        let seed = entropy::random_seed()?;
        let source = Self::with_seed_and_provider(seed, parallelism, provider);
        tracing::debug!(shards = parallelism.get(), "seeded random source from entropy");
        Ok(source)
    }

    /// Explicitly seeded source whose shards are selected through `provider`.
    pub fn with_seed_and_provider(seed: u64, parallelism: ParallelismDegree, provider: S) -> Self {
        let mut next_seed = derived_seeds(seed);
        Self {
            shards: ShardedValues::with_provider(parallelism, provider, || {
                Mutex::new(ShardRng::new(next_seed()))
            }),
        }
    }

    /// Returns a pseudo-random `u64` from the caller's shard.
    #[inline]
    pub fn next_u64(&self) -> u64 {
        let mut shard = self
            .shards
            .get()
            .lock()
            .unwrap_or_else(|p| p.into_inner());
        shard.pcg.next_u64()
    }

    /// Re-seeds every shard: shard `i` restarts from `seed + i`.
    ///
    /// Shards are updated one at a time, each under its own lock. Draws on
    /// other shards proceed meanwhile and may see the old or new state.
    pub fn reseed(&self, seed: u64) {
        let mut next_seed = derived_seeds(seed);
        self.shards.for_each(|shard| {
            let mut shard = shard.lock().unwrap_or_else(|p| p.into_inner());
            *shard = ShardRng::new(next_seed());
        });
        tracing::debug!(seed, shards = self.shard_count(), "reseeded random source");
    }

    /// Seeds currently installed in each shard, in shard order.
    pub fn shard_seeds(&self) -> Vec<u64> {
        let mut seeds = Vec::with_capacity(self.shard_count());
        self.shards.for_each(|shard| {
            seeds.push(shard.lock().unwrap_or_else(|p| p.into_inner()).seed);
        });
        seeds
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.shard_count()
    }
}

impl<S: ShardIndexProvider> RngCore for &Source<S> {
    #[inline]
    fn next_u32(&mut self) -> u32 {
        // High bits: the rotation makes them the best-mixed.
        (Source::next_u64(*self) >> 32) as u32
    }

    #[inline]
    fn next_u64(&mut self) -> u64 {
        Source::next_u64(*self)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        rand_core::impls::fill_bytes_via_next(self, dst);
    }
}

impl<S: ShardIndexProvider> fmt::Debug for Source<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Source")
            .field("shards", &self.shard_count())
            .finish_non_exhaustive()
    }
}


// ---------------------------------------------------------------------------
// Loom concurrency tests
// ---------------------------------------------------------------------------

#[cfg(loom)]
mod loom_tests {
    use super::*;
    use loom::sync::Arc;
    use loom::thread;

    fn single_shard(seed: u64) -> Source<impl ShardIndexProvider> {
        Source::with_seed_and_provider(seed, ParallelismDegree::ONE, || 0usize)
    }

    /// Two threads drawing from one shard get the first two outputs of its
    /// stream, each exactly once.
    #[test]
    fn concurrent_draws_share_one_stream() {
        loom::model(|| {
            let source = Arc::new(single_shard(9));
            let s2 = source.clone();

            let h = thread::spawn(move || s2.next_u64());
            let a = source.next_u64();
            let b = h.join().unwrap();

            let mut reference = Pcg128::new(9);
            let first = reference.next_u64();
            let second = reference.next_u64();
            assert!(
                (a == first && b == second) || (a == second && b == first),
                "a = {a:#x}, b = {b:#x}"
            );
        });
    }

    /// A draw racing a reseed sees either the old stream or the new one,
    /// never a torn state.
    #[test]
    fn reseed_races_draw() {
        loom::model(|| {
            let source = Arc::new(single_shard(1));
            let s2 = source.clone();

            let h = thread::spawn(move || s2.next_u64());
            source.reseed(2);
            let raced = h.join().unwrap();
            let after = source.next_u64();

            let old_first = Pcg128::new(1).next_u64();
            let mut fresh = Pcg128::new(2);
            let new_first = fresh.next_u64();
            let new_second = fresh.next_u64();

            if raced == old_first {
                assert_eq!(after, new_first);
            } else {
                assert_eq!(raced, new_first);
                assert_eq!(after, new_second);
            }
            assert_eq!(source.shard_seeds(), vec![2]);
        });
    }
}
