//! Generalized Advantage Estimation.
//!
//! λ trades bias for variance: λ = 0 is one-step TD, λ = 1 is Monte Carlo,
//! values in between interpolate.
//!
//! A_t = Σ_{l≥0} (γλ)^l δ_{t+l}, with δ_t = r_t + γ V(s_{t+1}) - V(s_t).
//!
//! Reference: Schulman et al., "High-Dimensional Continuous Control Using
//! Generalized Advantage Estimation" (2016).

use crate::buffers::RolloutBuffer;

/// Compute advantages and value targets for one trajectory.
///
/// `last_value` bootstraps past the final step (pass 0.0 if the trajectory
/// ended on a terminal state). Episode boundaries inside the trajectory are
/// marked by `dones`; the recurrence does not bleed across them.
///
/// Returns `(advantages, targets)`, both of length `rewards.len()`.
pub fn compute_gae(
    rewards: &[f32],
    values: &[f32],
    dones: &[bool],
    last_value: f32,
    gamma: f32,
    lambda: f32,
) -> (Vec<f32>, Vec<f32>) {
    let n = rewards.len();
    assert_eq!(values.len(), n);
    assert_eq!(dones.len(), n);

    let mut advantages = vec![0.0f32; n];
    let mut targets = vec![0.0f32; n];

    let mut running = 0.0f32;
    let mut next_value = last_value;

    for t in (0..n).rev() {
        let carry = if dones[t] { 0.0 } else { 1.0 };
        let delta = rewards[t] + gamma * next_value * carry - values[t];
        running = delta + gamma * lambda * carry * running;
        advantages[t] = running;
        targets[t] = running + values[t];
        next_value = values[t];
    }

    (advantages, targets)
}

/// Shift and scale advantages to zero mean and unit variance, in place.
///
/// Empty input is a no-op; a single element becomes 0.0.
pub fn normalize_advantages(advantages: &mut [f32]) {
    if advantages.len() < 2 {
        if let Some(only) = advantages.first_mut() {
            *only = 0.0;
        }
        return;
    }

    let n = advantages.len() as f32;
    let mean = advantages.iter().sum::<f32>() / n;
    let variance = advantages.iter().map(|a| (a - mean).powi(2)).sum::<f32>() / n;
    let std = (variance + 1e-8).sqrt();

    for a in advantages.iter_mut() {
        *a = (*a - mean) / std;
    }
}

/// Advantages and value targets for one rollout buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvantageEstimate {
    /// Per-step advantage estimates.
    pub advantages: Vec<f32>,
    /// Per-step value-function regression targets.
    pub targets: Vec<f32>,
}

/// GAE estimator over rollout buffers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaeEstimator {
    /// Discount factor.
    pub gamma: f32,
    /// GAE λ parameter.
    pub lambda: f32,
    /// Whether to normalize advantages after estimation.
    pub normalize: bool,
}

impl Default for GaeEstimator {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            lambda: 0.95,
            normalize: false,
        }
    }
}

impl GaeEstimator {
    /// Create an estimator with the given discount and λ.
    pub fn new(gamma: f32, lambda: f32) -> Self {
        Self {
            gamma,
            lambda,
            normalize: false,
        }
    }

    /// Enable or disable advantage normalization.
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Estimate advantages and targets for every step in `rollouts`.
    pub fn estimate(&self, rollouts: &RolloutBuffer) -> AdvantageEstimate {
        let (mut advantages, targets) = compute_gae(
            rollouts.rewards(),
            rollouts.values(),
            rollouts.dones(),
            rollouts.last_value(),
            self.gamma,
            self.lambda,
        );
        if self.normalize {
            normalize_advantages(&mut advantages);
        }
        AdvantageEstimate {
            advantages,
            targets,
        }
    }
}
