//! Collective optimization: gradient averaging and parameter sync.
//!
//! - [`CollectiveOptimizer`]: wraps a [`LocalOptimizer`] so every update
//!   applies the group-averaged gradient
//! - [`ParamSynchronizer`]: broadcasts the root worker's variable values
//!   to the group
//! - [`Sgd`] / [`MomentumSgd`]: shipped local optimizers

pub mod collective;
pub mod optimizer;
pub mod sgd;
pub mod sync;

pub use collective::{CollectiveOptimizer, TrainError};
pub use optimizer::LocalOptimizer;
pub use sgd::{MomentumSgd, Sgd};
pub use sync::ParamSynchronizer;
