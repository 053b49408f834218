//! Sharded `i64` counter for many concurrent writers.
//!
//! # Design
//!
//! One `AtomicI64` per shard, each in its own padded slot. `add` touches a
//! single shard with one lock-free `fetch_add`; `load` and `reset` walk
//! every shard. Writers on different processors therefore never contend on
//! a cache line, and readers pay `O(P)`.
//!
//! # Consistency
//!
//! `load` and `reset` are not atomic across shards. They do not observe a
//! single instant if they run concurrently with `add`. What does hold: every
//! unit added is counted exactly once across the sequence of `reset`s and a
//! final `load`.
//!
//! Suppose thread A runs
//!
//! ```text
//! counter.add(1);
//! counter.add(2);
//! ```
//!
//! while thread B runs
//!
//! ```text
//! let t0 = counter.reset();
//! // wait for A to finish
//! let t1 = counter.load();
//! ```
//!
//! `t0` may be any of 0, 1, 2, or 3, and so may `t1`, but `t0 + t1 == 3`.
//! `reset` swaps each shard to zero, so a unit is either taken by the swap
//! or left behind for the later load, never both.
//!
//! # Ordering
//!
//! All operations are `Relaxed`. Each shard is a single atomic location, so
//! its modification order already linearizes adds and swaps on it; callers
//! that need "add completed before load" establish that edge themselves
//! (thread join, channel, lock), which carries the shard write with it.

#[cfg(loom)]
use loom::sync::atomic::{AtomicI64, Ordering};
#[cfg(not(loom))]
use std::sync::atomic::{AtomicI64, Ordering};

use std::fmt;

use crate::parallelism::ParallelismDegree;
use crate::shard_index::{CpuShardIndex, ShardIndexProvider};
use crate::values::ShardedValues;

/// An `i64` counter that may be efficiently updated by many threads.
pub struct Counter<S = CpuShardIndex> {
    shards: ShardedValues<AtomicI64, S>,
}

impl Counter {
    /// Returns a fresh counter, initialized to zero, with one shard per
    /// usable processor.
    pub fn new() -> Self {
        Self::with_parallelism(ParallelismDegree::detect())
    }

    /// Returns a fresh counter with exactly `parallelism` shards.
    pub fn with_parallelism(parallelism: ParallelismDegree) -> Self {
        Self::with_provider(parallelism, CpuShardIndex::new())
    }
}

impl Default for Counter {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: ShardIndexProvider> Counter<S> {
    /// Returns a fresh counter whose shards are selected through `provider`.
    pub fn with_provider(parallelism: ParallelismDegree, provider: S) -> Self {
        Self {
            shards: ShardedValues::with_provider(parallelism, provider, || AtomicI64::new(0)),
        }
    }

    /// Adds `delta` to the total. Never blocks.
    #[inline]
    pub fn add(&self, delta: i64) {
        self.shards.get().fetch_add(delta, Ordering::Relaxed);
    }

    /// Returns the sum of all shards, read one shard at a time.
    pub fn load(&self) -> i64 {
        let mut sum = 0i64;
        self.shards
            .for_each(|shard| sum = sum.wrapping_add(shard.load(Ordering::Relaxed)));
        sum
    }

    /// Sets the counter to zero and returns the value it held.
    ///
    /// Each shard is swapped to zero individually; see the module docs for
    /// what this guarantees when adds run concurrently.
    pub fn reset(&self) -> i64 {
        let mut sum = 0i64;
        self.shards
            .for_each(|shard| sum = sum.wrapping_add(shard.swap(0, Ordering::Relaxed)));
        sum
    }

    /// Number of shards.
    pub fn shard_count(&self) -> usize {
        self.shards.shard_count()
    }
}

impl<S: ShardIndexProvider> fmt::Debug for Counter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("total", &self.load())
            .field("shards", &self.shard_count())
            .finish()
    }
}


// ---------------------------------------------------------------------------
// Loom concurrency tests
// ---------------------------------------------------------------------------

#[cfg(loom)]
mod loom_tests {
    use super::*;
    use loom::sync::atomic::AtomicUsize;
    use loom::sync::Arc;
    use loom::thread;

    fn round_robin(p: usize) -> Counter<impl ShardIndexProvider> {
        let next = AtomicUsize::new(0);
        Counter::with_provider(ParallelismDegree::new(p).unwrap(), move || {
            next.fetch_add(1, Ordering::Relaxed)
        })
    }

    /// Reset racing two adds, then a load after join: every unit is counted
    /// exactly once.
    #[test]
    fn reset_then_load_conserves_total() {
        loom::model(|| {
            let c = Arc::new(round_robin(2));
            let c2 = c.clone();

            let h = thread::spawn(move || {
                c2.add(1);
                c2.add(2);
            });

            let t0 = c.reset();
            h.join().unwrap();
            let t1 = c.load();

            assert!((0..=3).contains(&t0), "t0 = {t0}");
            assert_eq!(t0 + t1, 3, "t0 = {t0}, t1 = {t1}");
        });
    }

    /// Two writers on the same shard never lose an update.
    #[test]
    fn same_shard_adds_are_not_lost() {
        loom::model(|| {
            let c = Arc::new(Counter::with_provider(
                ParallelismDegree::ONE,
                || 0usize,
            ));
            let c2 = c.clone();

            let h = thread::spawn(move || c2.add(5));
            c.add(7);
            h.join().unwrap();

            assert_eq!(c.load(), 12);
        });
    }

    /// Two concurrent resets split the total without double counting.
    #[test]
    fn concurrent_resets_split_total() {
        loom::model(|| {
            let c = Arc::new(round_robin(2));
            c.add(4);
            c.add(6);
            let c2 = c.clone();

            let h = thread::spawn(move || c2.reset());
            let a = c.reset();
            let b = h.join().unwrap();

            assert_eq!(a + b, 10);
            assert_eq!(c.load(), 0);
        });
    }
}
