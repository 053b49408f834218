//! [`ShardedValues`]: a fixed array of cache-line-padded per-shard slots.
//!
//! # Invariants
//! - The shard array is built once with exactly `P` slots and never resized,
//!   reallocated or reordered, so concurrent lookups never race on it.
//! - Every slot sits in its own [`CachePadded`] cell; no two slots share a
//!   cache line, and slots are only reachable through the container.
//! - Shard lookup always lands in `[0, P)`: provider hints are reduced
//!   modulo `P` instead of being trusted.
//!
//! # Synchronization
//! None at the container level. Two threads may resolve the same slot at
//! the same time; the slot type supplies its own discipline (atomics for
//! [`Counter`](crate::Counter), a mutex for [`Source`](crate::Source)).
//!
//! # Visiting
//! [`for_each`](ShardedValues::for_each) walks slots in index order on the
//! calling thread. It is not a snapshot: each slot is observed at the moment
//! it is visited.

use std::fmt;

use crossbeam_utils::CachePadded;

use crate::parallelism::ParallelismDegree;
use crate::shard_index::{CpuShardIndex, ShardIndexProvider};

/// A sharded set of values with an affinity for the current processor.
pub struct ShardedValues<T, S = CpuShardIndex> {
    shards: Box<[CachePadded<T>]>,
    provider: S,
}

impl<T> ShardedValues<T> {
    /// Builds one slot per usable processor with the default provider.
    ///
    /// `factory` runs exactly `P` times, in index order.
    pub fn new(factory: impl FnMut() -> T) -> Self {
        Self::with_parallelism(ParallelismDegree::detect(), factory)
    }

    /// Builds `parallelism` slots with the default provider.
    pub fn with_parallelism(parallelism: ParallelismDegree, factory: impl FnMut() -> T) -> Self {
        Self::with_provider(parallelism, CpuShardIndex::new(), factory)
    }
}

impl<T, S: ShardIndexProvider> ShardedValues<T, S> {
    /// Builds `parallelism` slots that are selected through `provider`.
    pub fn with_provider(
        parallelism: ParallelismDegree,
        provider: S,
        mut factory: impl FnMut() -> T,
    ) -> Self {
        let shards = (0..parallelism.get())
            .map(|_| CachePadded::new(factory()))
            .collect();
        Self { shards, provider }
    }

    /// Fallible variant of [`with_provider`](Self::with_provider).
    ///
    /// Stops at the first factory error and drops the slots built so far;
    /// a partially built container is never returned.
    pub fn try_with_provider<E>(
        parallelism: ParallelismDegree,
        provider: S,
        mut factory: impl FnMut() -> Result<T, E>,
    ) -> Result<Self, E> {
        let shards = (0..parallelism.get())
            .map(|_| factory().map(CachePadded::new))
            .collect::<Result<Box<[_]>, E>>()?;
        Ok(Self { shards, provider })
    }

    /// Number of shards. Fixed for the container's lifetime.
    #[inline]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// Index of the slot the calling thread would use right now.
    ///
    /// Always `< self.shard_count()`.
    #[inline]
    pub fn shard_index(&self) -> usize {
        let len = self.shards.len();
        let hint = self.provider.shard_index();
        if hint < len {
            hint
        } else {
            hint % len
        }
    }

    /// Returns the slot for the calling thread.
    ///
    /// The slot tends to belong to the current processor, but threads can
    /// migrate at any time and another thread may hold the same slot
    /// concurrently. Access to its contents needs further synchronization.
    #[inline]
    pub fn get(&self) -> &T {
        &self.shards[self.shard_index()]
    }

    /// Runs `visit` on every slot, once each, in index order.
    pub fn for_each(&self, mut visit: impl FnMut(&T)) {
        for shard in self.shards.iter() {
            visit(shard);
        }
    }

    /// Iterates slots in index order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &T> + '_ {
        self.shards.iter().map(|shard| &**shard)
    }

    /// The provider used for shard selection.
    pub fn provider(&self) -> &S {
        &self.provider
    }
}

impl<T: fmt::Debug, S> fmt::Debug for ShardedValues<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.shards.iter().map(|shard| &**shard))
            .finish()
    }
}
