//! Property-based tests against sequential models.
//!
//! Run with: `cargo test --test property`

mod counter_model;
mod shard_selection;
