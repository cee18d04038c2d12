//! Minibatch update loop for policy-gradient training.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::algorithms::gae::GaeEstimator;
use crate::algorithms::objective::Objective;
use crate::buffers::RolloutBuffer;
use crate::comm::Communicator;
use crate::core::{Feed, VarStore};
use crate::optim::{CollectiveOptimizer, LocalOptimizer, TrainError};

/// Auxiliary terms requested from the objective for every update, in
/// result order: actor loss, explained variance, entropy, clip count.
pub const UPDATE_TERMS: [&str; 4] = [
    "actor_loss",
    "explained_variance",
    "entropy",
    "clipped",
];

/// Configuration validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A count parameter must be positive.
    InvalidCount { field: &'static str, value: usize },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidCount { field, value } => {
                write!(f, "{} must be > 0, got {}", field, value)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for one pass of minibatch updates over a rollout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateLoopConfig {
    /// Maximum number of `minimize` calls per pass.
    pub max_iters: usize,
    /// Minibatch size; `None` trains on the full rollout as one batch.
    pub batch_size: Option<usize>,
}

impl Default for UpdateLoopConfig {
    fn default() -> Self {
        Self {
            max_iters: 12,
            batch_size: None,
        }
    }
}

impl UpdateLoopConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the iteration cap.
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Set the minibatch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = Some(batch_size);
        self
    }

    /// Check parameter consistency.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iters == 0 {
            return Err(ConfigError::InvalidCount {
                field: "max_iters",
                value: 0,
            });
        }
        if self.batch_size == Some(0) {
            return Err(ConfigError::InvalidCount {
                field: "batch_size",
                value: 0,
            });
        }
        Ok(())
    }
}

/// Group-averaged diagnostics for one minibatch update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UpdateStats {
    /// Mean actor (policy surrogate) loss.
    pub actor_loss: f64,
    /// Mean explained variance of the value function.
    pub explained_variance: f64,
    /// Mean policy entropy.
    pub entropy: f64,
    /// Mean number of clipped samples in the batch.
    pub clipped: f64,
}

/// Run one `minimize` call per feed, stopping at the iteration cap or
/// when the feeds run out, whichever comes first.
///
/// The optional `log` callback receives one formatted line per batch and
/// is invoked only on the root worker. All workers must iterate the same
/// feeds in the same order; the loop itself is group-synchronous because
/// every `minimize` is.
///
/// Returns the per-batch stats, in iteration order.
pub fn run_update_loop<O, P, C, I, F>(
    optimizer: &mut CollectiveOptimizer<O, P, C>,
    store: &mut VarStore,
    feeds: I,
    config: &UpdateLoopConfig,
    mut log: Option<F>,
) -> Result<Vec<UpdateStats>, TrainError>
where
    O: Objective,
    P: LocalOptimizer,
    C: Communicator,
    I: IntoIterator<Item = Feed>,
    F: FnMut(&str),
{
    let mut results = Vec::new();
    for feed in feeds {
        if results.len() == config.max_iters {
            break;
        }
        let terms = optimizer.minimize(store, &feed, &UPDATE_TERMS)?;
        let stats = UpdateStats {
            actor_loss: terms[0],
            explained_variance: terms[1],
            entropy: terms[2],
            clipped: terms[3],
        };
        if let Some(log) = log.as_mut() {
            if optimizer.comm().is_root() {
                log(&format!(
                    "batch {}: actor={:.6} explained={:.6} entropy={:.6} clipped={:.0}",
                    results.len(),
                    -stats.actor_loss,
                    stats.explained_variance,
                    stats.entropy,
                    stats.clipped
                ));
            }
        }
        results.push(stats);
    }
    Ok(results)
}

/// Estimate advantages for `rollouts`, split them into shuffled minibatch
/// feeds, and run the update loop over them.
///
/// Workers that must visit batches in the same order (the usual case)
/// should seed `rng` identically.
pub fn run_ppo_updates<O, P, C, R, F>(
    optimizer: &mut CollectiveOptimizer<O, P, C>,
    store: &mut VarStore,
    rollouts: &RolloutBuffer,
    estimator: &GaeEstimator,
    config: &UpdateLoopConfig,
    rng: &mut R,
    log: Option<F>,
) -> Result<Vec<UpdateStats>, TrainError>
where
    O: Objective,
    P: LocalOptimizer,
    C: Communicator,
    R: Rng,
    F: FnMut(&str),
{
    let estimate = estimator.estimate(rollouts);
    let feeds = rollouts.minibatch_feeds(config.batch_size, &estimate, rng);
    run_update_loop(optimizer, store, feeds, config, log)
}
