//! Multi-threaded integration tests for sharded counters and sources.
//!
//! Run with: `cargo test --test integration`

mod counter;
mod values;
