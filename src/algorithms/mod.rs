//! Algorithm-facing interfaces and advantage estimation.
//!
//! - [`Objective`]: the loss-surface collaborator (terms + gradients in
//!   one evaluation pass)
//! - [`GaeEstimator`] / [`compute_gae`]: Generalized Advantage Estimation
//!   over rollout buffers

pub mod gae;
pub mod objective;

pub use gae::{compute_gae, normalize_advantages, AdvantageEstimate, GaeEstimator};
pub use objective::{EvalError, Evaluation, Objective};
