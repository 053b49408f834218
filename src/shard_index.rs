//! Best-effort mapping from the calling thread to a shard.
//!
//! # Contract
//!
//! A [`ShardIndexProvider`] returns a *hint*: an integer that tends to be
//! stable for a thread and tends to differ between threads running on
//! different processors. The hint may be any `usize`; the container reduces
//! it into `[0, P)` before indexing, so a provider that returns values
//! `>= P` costs contention, never memory safety.
//!
//! Providers must be cheap (no allocation, no blocking, no syscall on the
//! common path) because they run on every sharded operation.
//!
//! # Providers
//!
//! | Provider | Hint | Notes |
//! |----------|------|-------|
//! | [`CpuShardIndex`] | rank of the executing CPU in the allowed set | default; Linux only, else thread ordinal |
//! | [`ThreadShardIndex`] | per-thread ordinal, round-robin | portable, never changes for a thread |
//! | [`WorkerShardIndex`] | id registered via [`set_current_worker_id`] | for executors with their own worker numbering |
//!
//! Any `Fn() -> usize + Send + Sync` closure is also a provider.

use std::cell::Cell;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::affinity;

/// Source of shard-selection hints.
pub trait ShardIndexProvider: Send + Sync {
    /// Returns a shard hint for the calling thread.
    ///
    /// Need not be below the shard count; callers reduce it.
    fn shard_index(&self) -> usize;
}

impl<F> ShardIndexProvider for F
where
    F: Fn() -> usize + Send + Sync,
{
    #[inline]
    fn shard_index(&self) -> usize {
        self()
    }
}

// ---------------------------------------------------------------------------
// Thread ordinals
// ---------------------------------------------------------------------------

/// Next ordinal handed to a thread on its first sharded access.
static NEXT_THREAD_ORDINAL: AtomicUsize = AtomicUsize::new(0);

/// Sentinel value indicating no worker ID is set.
const NO_WORKER: usize = usize::MAX;

thread_local! {
    static THREAD_ORDINAL: usize = NEXT_THREAD_ORDINAL.fetch_add(1, Ordering::Relaxed);
    static WORKER_ID: Cell<usize> = const { Cell::new(NO_WORKER) };
}

/// Returns this thread's ordinal, assigning one on first use.
///
/// Ordinals are handed out round-robin, so `P` threads that start touching
/// sharded state one after another land on `P` distinct shards. During
/// thread teardown (TLS already destroyed) this returns 0.
#[inline]
pub fn thread_ordinal() -> usize {
    THREAD_ORDINAL.try_with(|o| *o).unwrap_or(0)
}

/// Portable provider: the calling thread's ordinal.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadShardIndex;

impl ShardIndexProvider for ThreadShardIndex {
    #[inline]
    fn shard_index(&self) -> usize {
        thread_ordinal()
    }
}

// ---------------------------------------------------------------------------
// Worker ids
// ---------------------------------------------------------------------------

/// Registers (or with `None`, clears) the worker id of the calling thread.
///
/// Executors call this once when a worker thread starts and once before it
/// exits. Single thread-local write.
#[inline]
pub fn set_current_worker_id(id: Option<usize>) {
    WORKER_ID.with(|c| c.set(id.unwrap_or(NO_WORKER)));
}

/// Returns the worker id registered on this thread, if any.
#[inline]
pub fn current_worker_id() -> Option<usize> {
    WORKER_ID
        .try_with(|c| c.get())
        .ok()
        .filter(|&v| v != NO_WORKER)
}

/// Provider for callers that number their own workers.
///
/// Uses the id from [`set_current_worker_id`]; threads that never
/// registered one fall back to their thread ordinal.
#[derive(Clone, Copy, Debug, Default)]
pub struct WorkerShardIndex;

impl ShardIndexProvider for WorkerShardIndex {
    #[inline]
    fn shard_index(&self) -> usize {
        current_worker_id().unwrap_or_else(thread_ordinal)
    }
}

// ---------------------------------------------------------------------------
// CPU ranks
// ---------------------------------------------------------------------------

/// Default provider: the executing CPU, ranked within the allowed set.
///
/// Raw CPU numbers are a poor shard index inside a cpuset: a process
/// allowed on CPUs `{0, 2, 4, 6}` with four shards would only ever touch
/// shards 0 and 2 under `cpu % 4`. The table built at construction maps
/// each allowed CPU to its rank (`0 -> 0, 2 -> 1, 4 -> 2, 6 -> 3`). CPUs
/// outside the table (affinity widened later) pass through unchanged.
///
/// When the platform cannot report the current CPU the thread ordinal is
/// used instead.
#[derive(Clone, Debug)]
pub struct CpuShardIndex {
    ranks: Box<[usize]>,
}

impl CpuShardIndex {
    /// Builds the rank table from the process's current allowed CPU set.
    pub fn new() -> Self {
        match affinity::allowed_cpus() {
            Ok(set) => Self::from_cpus(set.iter()),
            Err(err) => {
                if err.kind() != std::io::ErrorKind::Unsupported {
                    tracing::warn!(error = %err, "allowed CPU query failed, using identity CPU ranks");
                }
                Self {
                    ranks: Box::default(),
                }
            }
        }
    }

    /// Builds the rank table from an explicit list of CPUs.
    ///
    /// Duplicates are ignored; ranks follow ascending CPU number.
    pub fn from_cpus(cpus: impl IntoIterator<Item = usize>) -> Self {
        let mut cpus: Vec<usize> = cpus.into_iter().collect();
        cpus.sort_unstable();
        cpus.dedup();

        let len = cpus.last().map_or(0, |&max| max + 1);
        let mut ranks: Vec<usize> = (0..len).collect();
        for (rank, &cpu) in cpus.iter().enumerate() {
            ranks[cpu] = rank;
        }
        tracing::debug!(cpus = cpus.len(), "built CPU shard-index table");
        Self {
            ranks: ranks.into_boxed_slice(),
        }
    }

    /// Maps a CPU number to its shard hint.
    #[inline]
    pub fn rank_of(&self, cpu: usize) -> usize {
        self.ranks.get(cpu).copied().unwrap_or(cpu)
    }
}

impl Default for CpuShardIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl ShardIndexProvider for CpuShardIndex {
    #[inline]
    fn shard_index(&self) -> usize {
        match affinity::current_cpu() {
            Some(cpu) => self.rank_of(cpu),
            None => thread_ordinal(),
        }
    }
}
