//! Rollout storage and minibatch feed generation.

pub mod rollout_buffer;

pub use rollout_buffer::{feed_keys, RolloutBuffer};
