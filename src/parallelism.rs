//! Shard-count configuration.
//!
//! A [`ParallelismDegree`] is the fixed number of shards `P` a container is
//! built with. It is snapshotted once at construction and never requeried:
//! if the processor count changes later, existing containers keep their
//! shape and shard selection simply reduces out-of-range hints.
//!
//! ## Resolution order (`detect`)
//!
//! | Source | When used |
//! |--------|-----------|
//! | `PERCPU_SHARDS` env var | set to a positive integer |
//! | `affinity::num_cpus()` | otherwise (or when the env var is malformed) |

use std::fmt;
use std::num::NonZeroUsize;

use crate::affinity;
use crate::error::PercpuError;

/// Environment variable that overrides the detected shard count.
pub const SHARDS_ENV: &str = "PERCPU_SHARDS";

/// Number of shards in a sharded container. Always at least 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ParallelismDegree(NonZeroUsize);

impl ParallelismDegree {
    /// A single shard: correct everywhere, uncontended nowhere.
    pub const ONE: Self = Self(NonZeroUsize::MIN);

    /// Creates a degree of exactly `n` shards.
    ///
    /// # Errors
    ///
    /// Returns [`PercpuError::ZeroParallelism`] if `n == 0`.
    pub fn new(n: usize) -> Result<Self, PercpuError> {
        NonZeroUsize::new(n)
            .map(Self)
            .ok_or(PercpuError::ZeroParallelism)
    }

    /// Resolves the shard count for this process.
    ///
    /// Honors [`SHARDS_ENV`] when it holds a positive integer; otherwise
    /// uses the number of logical processors usable by the process. A
    /// malformed override is reported and ignored rather than failing,
    /// since detection always yields a usable value.
    pub fn detect() -> Self {
        match Self::from_env() {
            Ok(Some(p)) => {
                tracing::debug!(shards = p.get(), source = SHARDS_ENV, "parallelism degree resolved");
                return p;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(error = %err, var = SHARDS_ENV, "ignoring shard-count override");
            }
        }
        let p = Self::from_cpus(affinity::num_cpus());
        tracing::debug!(shards = p.get(), source = "available_parallelism", "parallelism degree resolved");
        p
    }

    /// Reads the [`SHARDS_ENV`] override.
    ///
    /// Returns `Ok(None)` when the variable is unset or empty.
    ///
    /// # Errors
    ///
    /// - [`PercpuError::InvalidParallelism`] if the value is not an integer.
    /// - [`PercpuError::ZeroParallelism`] if the value is `0`.
    pub fn from_env() -> Result<Option<Self>, PercpuError> {
        match std::env::var(SHARDS_ENV) {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Ok(None),
        }
    }

    fn parse(raw: &str) -> Result<Option<Self>, PercpuError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let n: usize = trimmed
            .parse()
            .map_err(|_| PercpuError::InvalidParallelism {
                value: raw.to_string(),
            })?;
        Self::new(n).map(Some)
    }

    fn from_cpus(cpus: usize) -> Self {
        Self(NonZeroUsize::new(cpus).unwrap_or(NonZeroUsize::MIN))
    }

    /// Returns the shard count.
    #[inline]
    pub const fn get(self) -> usize {
        self.0.get()
    }
}

impl Default for ParallelismDegree {
    fn default() -> Self {
        Self::detect()
    }
}

impl From<NonZeroUsize> for ParallelismDegree {
    fn from(n: NonZeroUsize) -> Self {
        Self(n)
    }
}

impl fmt::Display for ParallelismDegree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
