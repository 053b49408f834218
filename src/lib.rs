//! Best-effort CPU-local sharded state.
//!
//! ## Scope
//! Many threads updating one counter, or drawing from one random generator,
//! fight over a single cache line. This crate splits such values into `P`
//! shards (one per usable processor), routes each access to the shard of
//! the processor the caller is running on, and aggregates on read.
//!
//! ## Key invariants
//! - A container's shard count `P` is fixed at construction and never
//!   requeried; shard lookups always land in `[0, P)` whatever the
//!   selection hint says.
//! - Shards live in separate cache lines and are synchronized individually
//!   (an atomic per counter shard, a mutex per generator shard). There is no
//!   cross-shard lock anywhere.
//! - Aggregates are not snapshots, but nothing is lost: every unit added to
//!   a [`Counter`] is returned by exactly one `reset` or final `load`.
//! - Processor affinity only affects contention. Correctness never depends
//!   on which shard a call lands on.
//!
//! ## Components (leaves first)
//! `ShardIndexProvider -> ShardedValues<T> -> { Counter, Source } -> global`
//!
//! ## Notable entry points
//! - [`ShardedValues`]: generic padded per-shard storage.
//! - [`Counter`]: sharded `i64` with `add` / `load` / `reset`.
//! - [`Source`]: sharded PCG generator; `&Source` is a `rand_core::RngCore`.
//! - [`global`]: process-wide default `Source` and convenience draws.
//! - [`ShardIndexProvider`]: pluggable shard selection
//!   ([`CpuShardIndex`], [`ThreadShardIndex`], [`WorkerShardIndex`]).
//!
//! ## Configuration
//! The shard count defaults to the number of usable processors and can be
//! pinned with the `PERCPU_SHARDS` environment variable (see
//! [`ParallelismDegree::detect`]).

pub mod affinity;
pub mod counter;
pub mod entropy;
pub mod error;
#[cfg(not(loom))]
pub mod global;
pub mod parallelism;
pub mod rng;
pub mod shard_index;
pub mod source;
pub mod values;

pub use counter::Counter;
pub use error::PercpuError;
pub use parallelism::{ParallelismDegree, SHARDS_ENV};
pub use rng::Pcg128;
pub use shard_index::{
    current_worker_id, set_current_worker_id, CpuShardIndex, ShardIndexProvider,
    ThreadShardIndex, WorkerShardIndex,
};
pub use source::Source;
pub use values::ShardedValues;
