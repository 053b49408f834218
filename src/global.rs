//! Process-wide default [`Source`] and convenience draws over it.
//!
//! # Lifecycle
//!
//! The global source is created once, either explicitly by [`init`] (the
//! recommended start-up point, which reports entropy failure as an error)
//! or implicitly by the first call to [`source`] or any draw function here.
//! It lives for the rest of the process and is never reseeded by this
//! module. It has one shard per usable processor and an entropy seed.
//!
//! Code that needs isolation or reproducible per-shard seeds should build
//! its own [`Source`] instead of sharing this one.
//!
//! # Panics
//!
//! - Every draw panics if the global source has to be created and the OS
//!   entropy source is unavailable. Call [`init`] first to handle that case.
//! - Range-bounded draws panic when the bound is not positive.

use std::sync::OnceLock;

use rand::seq::SliceRandom;
use rand::Rng;
use rand_core::RngCore;
use rand_distr::{Exp1, StandardNormal};

use crate::error::PercpuError;
use crate::source::Source;

static GLOBAL: OnceLock<Source> = OnceLock::new();

/// Creates the global source if it does not exist yet and returns it.
///
/// Idempotent; concurrent first calls agree on a single instance.
///
/// # Errors
///
/// Returns [`PercpuError::Entropy`] if the source had to be created and the
/// OS entropy source is unavailable. A later call may retry.
pub fn init() -> Result<&'static Source, PercpuError> {
    if let Some(source) = GLOBAL.get() {
        return Ok(source);
    }
    let fresh = Source::new()?;
    Ok(GLOBAL.get_or_init(|| {
        tracing::debug!(shards = fresh.shard_count(), "initialized global random source");
        fresh
    }))
}

/// Returns the global source, creating it on first use.
///
/// # Panics
///
/// Panics if the source must be created and entropy is unavailable.
pub fn source() -> &'static Source {
    match init() {
        Ok(source) => source,
        Err(err) => panic!("global random source unavailable: {err}"),
    }
}

/// Returns a pseudo-random `u64`.
#[inline]
pub fn next_u64() -> u64 {
    source().next_u64()
}

/// Returns a pseudo-random `u32`.
#[inline]
pub fn next_u32() -> u32 {
    let mut rng = source();
    rng.next_u32()
}

/// Returns a non-negative pseudo-random 63-bit integer as an `i64`.
#[inline]
pub fn next_i63() -> i64 {
    (source().next_u64() >> 1) as i64
}

/// Returns a pseudo-random `f64` in `[0.0, 1.0)`.
pub fn next_f64() -> f64 {
    let mut rng = source();
    rng.random()
}

/// Returns a pseudo-random `f32` in `[0.0, 1.0)`.
pub fn next_f32() -> f32 {
    let mut rng = source();
    rng.random()
}

/// Returns a pseudo-random `u64` in `[0, n)`.
///
/// # Panics
///
/// Panics if `n == 0`.
pub fn below(n: u64) -> u64 {
    assert!(n > 0, "below: n must be > 0");
    let mut rng = source();
    rng.random_range(0..n)
}

/// Returns a pseudo-random `i64` in `[0, n)`.
///
/// # Panics
///
/// Panics if `n <= 0`.
pub fn below_i64(n: i64) -> i64 {
    assert!(n > 0, "below_i64: n must be > 0, got {n}");
    let mut rng = source();
    rng.random_range(0..n)
}

/// Returns a pseudo-random `usize` in `[0, n)`.
///
/// # Panics
///
/// Panics if `n == 0`.
pub fn below_usize(n: usize) -> usize {
    assert!(n > 0, "below_usize: n must be > 0");
    let mut rng = source();
    rng.random_range(0..n)
}

/// Returns an exponentially distributed `f64` with rate 1 (mean 1).
///
/// For rate `lambda`, divide the result by `lambda`.
pub fn exp_f64() -> f64 {
    let mut rng = source();
    rng.sample(Exp1)
}

/// Returns a standard normal `f64` (mean 0, standard deviation 1).
///
/// For other parameters use `normal_f64() * std_dev + mean`.
pub fn normal_f64() -> f64 {
    let mut rng = source();
    rng.sample(StandardNormal)
}

/// Returns a pseudo-random permutation of `0..n`.
pub fn perm(n: usize) -> Vec<usize> {
    let mut out: Vec<usize> = (0..n).collect();
    shuffle(&mut out);
    out
}

/// Shuffles `slice` in place (Fisher-Yates).
pub fn shuffle<T>(slice: &mut [T]) {
    let mut rng = source();
    slice.shuffle(&mut rng);
}

/// Fills `buf` with pseudo-random bytes. Not suitable for key material.
pub fn fill_bytes(buf: &mut [u8]) {
    let mut rng = source();
    rng.fill_bytes(buf);
}
