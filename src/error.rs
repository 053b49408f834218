//! Error types for sharded-state construction.
//!
//! Only construction can fail: once a container, counter or source exists,
//! every operation on it succeeds. Variants distinguish an unavailable
//! entropy source (fatal for random-source construction) from rejected
//! parallelism configuration.

use std::fmt;

/// Errors from building sharded state.
///
/// This enum is intentionally non-exhaustive so new configuration checks
/// can be introduced without breaking downstream matches.
#[derive(Debug)]
#[non_exhaustive]
pub enum PercpuError {
    /// The platform's unpredictable-byte source failed.
    ///
    /// There is no degraded fallback: a predictable seed would silently
    /// weaken every source built from it.
    Entropy(getrandom::Error),
    /// The shard-count override could not be parsed.
    InvalidParallelism { value: String },
    /// A parallelism degree of zero was requested.
    ZeroParallelism,
}

impl PercpuError {
    /// Creates an entropy error variant.
    #[inline]
    pub fn entropy(err: getrandom::Error) -> Self {
        Self::Entropy(err)
    }

    /// Returns true if this error came from the entropy source.
    pub fn is_entropy(&self) -> bool {
        matches!(self, Self::Entropy(_))
    }
}

impl fmt::Display for PercpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Entropy(err) => write!(f, "entropy source unavailable: {err}"),
            Self::InvalidParallelism { value } => {
                write!(f, "invalid parallelism degree {value:?} (expected a positive integer)")
            }
            Self::ZeroParallelism => write!(f, "parallelism degree must be at least 1"),
        }
    }
}

impl std::error::Error for PercpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Entropy(err) => Some(err),
            _ => None,
        }
    }
}

impl From<getrandom::Error> for PercpuError {
    fn from(err: getrandom::Error) -> Self {
        Self::Entropy(err)
    }
}
