//! Unpredictable seed material from the operating system.
//!
//! A thin wrapper over `getrandom`. Failure is surfaced, never papered
//! over: callers building a random source must not continue with a
//! predictable seed.

use crate::error::PercpuError;

/// Fills `buf` with unpredictable bytes from the platform source.
///
/// # Errors
///
/// Returns [`PercpuError::Entropy`] if the platform source is unavailable.
pub fn fill_random(buf: &mut [u8]) -> Result<(), PercpuError> {
    getrandom::fill(buf)?;
    Ok(())
}

/// Draws a 64-bit seed from the platform source (big-endian).
pub fn random_seed() -> Result<u64, PercpuError> {
    let mut bytes = [0u8; 8];
    fill_random(&mut bytes)?;
    Ok(u64::from_be_bytes(bytes))
}
