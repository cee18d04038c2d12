//! Flat per-step rollout storage and minibatch feed generation.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::algorithms::gae::AdvantageEstimate;
use crate::core::Feed;

/// Feed binding names produced by [`RolloutBuffer::minibatch_feeds`].
pub mod feed_keys {
    /// Flattened observation rows, `[batch * obs_size]`.
    pub const OBSERVATIONS: &str = "observations";
    /// Actions taken, `[batch]`.
    pub const ACTIONS: &str = "actions";
    /// Behavior-policy log-probabilities at collection time, `[batch]`.
    pub const OLD_LOG_PROBS: &str = "old_log_probs";
    /// Advantage estimates, `[batch]`.
    pub const ADVANTAGES: &str = "advantages";
    /// Value-function regression targets, `[batch]`.
    pub const TARGETS: &str = "targets";
}

/// Trajectory storage for one worker, structure-of-arrays layout.
///
/// Steps are appended in time order; `last_value` holds the bootstrap
/// value estimate for the state following the final step. Discrete actions
/// are stored as their index cast to f32.
#[derive(Debug, Clone, Default)]
pub struct RolloutBuffer {
    obs_size: usize,
    observations: Vec<f32>,
    actions: Vec<f32>,
    rewards: Vec<f32>,
    values: Vec<f32>,
    log_probs: Vec<f32>,
    dones: Vec<bool>,
    last_value: f32,
}

impl RolloutBuffer {
    /// Create an empty buffer for observations of `obs_size` elements.
    pub fn new(obs_size: usize) -> Self {
        Self {
            obs_size,
            ..Self::default()
        }
    }

    /// Observation width.
    pub fn obs_size(&self) -> usize {
        self.obs_size
    }

    /// Append one step.
    pub fn push(
        &mut self,
        observation: &[f32],
        action: f32,
        reward: f32,
        value: f32,
        log_prob: f32,
        done: bool,
    ) {
        assert_eq!(observation.len(), self.obs_size);
        self.observations.extend_from_slice(observation);
        self.actions.push(action);
        self.rewards.push(reward);
        self.values.push(value);
        self.log_probs.push(log_prob);
        self.dones.push(done);
    }

    /// Number of stored steps.
    pub fn len(&self) -> usize {
        self.rewards.len()
    }

    /// Whether the buffer holds no steps.
    pub fn is_empty(&self) -> bool {
        self.rewards.is_empty()
    }

    /// Set the bootstrap value for the state after the final step.
    pub fn set_last_value(&mut self, value: f32) {
        self.last_value = value;
    }

    /// Bootstrap value for the state after the final step.
    pub fn last_value(&self) -> f32 {
        self.last_value
    }

    /// Per-step rewards.
    pub fn rewards(&self) -> &[f32] {
        &self.rewards
    }

    /// Per-step value estimates.
    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Per-step episode-end flags.
    pub fn dones(&self) -> &[bool] {
        &self.dones
    }

    /// Per-step behavior-policy log-probabilities.
    pub fn log_probs(&self) -> &[f32] {
        &self.log_probs
    }

    /// Per-step actions.
    pub fn actions(&self) -> &[f32] {
        &self.actions
    }

    /// Flattened observations, `[len * obs_size]`.
    pub fn observations(&self) -> &[f32] {
        &self.observations
    }

    /// Drop all stored steps and reset the bootstrap value.
    pub fn clear(&mut self) {
        self.observations.clear();
        self.actions.clear();
        self.rewards.clear();
        self.values.clear();
        self.log_probs.clear();
        self.dones.clear();
        self.last_value = 0.0;
    }

    /// Split the buffer into shuffled minibatch feeds.
    ///
    /// `batch_size: None` yields a single feed over every step (the final
    /// chunk may be short otherwise). `estimate` must cover this buffer's
    /// steps. Workers that must visit batches in the same order should
    /// seed their rngs identically.
    pub fn minibatch_feeds<R: Rng>(
        &self,
        batch_size: Option<usize>,
        estimate: &AdvantageEstimate,
        rng: &mut R,
    ) -> Vec<Feed> {
        let n = self.len();
        if n == 0 {
            return Vec::new();
        }
        assert_eq!(estimate.advantages.len(), n);
        assert_eq!(estimate.targets.len(), n);

        let mut indices: Vec<usize> = (0..n).collect();
        indices.shuffle(rng);

        let chunk = batch_size.unwrap_or(n).max(1);
        indices
            .chunks(chunk)
            .map(|batch| self.feed_for(batch, estimate))
            .collect()
    }

    fn feed_for(&self, batch: &[usize], estimate: &AdvantageEstimate) -> Feed {
        let mut observations = Vec::with_capacity(batch.len() * self.obs_size);
        let mut actions = Vec::with_capacity(batch.len());
        let mut log_probs = Vec::with_capacity(batch.len());
        let mut advantages = Vec::with_capacity(batch.len());
        let mut targets = Vec::with_capacity(batch.len());

        for &i in batch {
            let row = i * self.obs_size;
            observations.extend_from_slice(&self.observations[row..row + self.obs_size]);
            actions.push(self.actions[i]);
            log_probs.push(self.log_probs[i]);
            advantages.push(estimate.advantages[i]);
            targets.push(estimate.targets[i]);
        }

        Feed::new()
            .with(feed_keys::OBSERVATIONS, observations)
            .with(feed_keys::ACTIONS, actions)
            .with(feed_keys::OLD_LOG_PROBS, log_probs)
            .with(feed_keys::ADVANTAGES, advantages)
            .with(feed_keys::TARGETS, targets)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn filled_buffer(steps: usize) -> RolloutBuffer {
        let mut buffer = RolloutBuffer::new(2);
        for i in 0..steps {
            buffer.push(
                &[i as f32, -(i as f32)],
                i as f32,
                1.0,
                0.5,
                -0.1 * i as f32,
                false,
            );
        }
        buffer.set_last_value(0.5);
        buffer
    }

    fn estimate_for(steps: usize) -> AdvantageEstimate {
        AdvantageEstimate {
            advantages: (0..steps).map(|i| i as f32 * 10.0).collect(),
            targets: (0..steps).map(|i| i as f32 * 100.0).collect(),
        }
    }

    #[test]
    fn push_and_accessors() {
        let buffer = filled_buffer(3);
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.obs_size(), 2);
        assert_eq!(buffer.observations().len(), 6);
        assert_eq!(buffer.actions(), &[0.0, 1.0, 2.0]);
        assert_eq!(buffer.last_value(), 0.5);
    }

    #[test]
    fn full_batch_when_size_is_none() {
        let buffer = filled_buffer(4);
        let estimate = estimate_for(4);
        let mut rng = StdRng::seed_from_u64(7);

        let feeds = buffer.minibatch_feeds(None, &estimate, &mut rng);
        assert_eq!(feeds.len(), 1);
        assert_eq!(feeds[0].get(feed_keys::ACTIONS).unwrap().len(), 4);
        assert_eq!(feeds[0].get(feed_keys::OBSERVATIONS).unwrap().len(), 8);
    }

    #[test]
    fn minibatches_cover_every_step_once() {
        let buffer = filled_buffer(10);
        let estimate = estimate_for(10);
        let mut rng = StdRng::seed_from_u64(42);

        let feeds = buffer.minibatch_feeds(Some(3), &estimate, &mut rng);
        assert_eq!(feeds.len(), 4); // 3 + 3 + 3 + 1

        let mut seen: Vec<f32> = feeds
            .iter()
            .flat_map(|f| f.get(feed_keys::ACTIONS).unwrap().to_vec())
            .collect();
        seen.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let expected: Vec<f32> = (0..10).map(|i| i as f32).collect();
        assert_eq!(seen, expected);
    }

    #[test]
    fn identical_seeds_give_identical_batches() {
        let buffer = filled_buffer(8);
        let estimate = estimate_for(8);

        let mut rng_a = StdRng::seed_from_u64(123);
        let mut rng_b = StdRng::seed_from_u64(123);
        let feeds_a = buffer.minibatch_feeds(Some(4), &estimate, &mut rng_a);
        let feeds_b = buffer.minibatch_feeds(Some(4), &estimate, &mut rng_b);

        for (a, b) in feeds_a.iter().zip(feeds_b.iter()) {
            assert_eq!(a.get(feed_keys::ACTIONS), b.get(feed_keys::ACTIONS));
            assert_eq!(a.get(feed_keys::ADVANTAGES), b.get(feed_keys::ADVANTAGES));
        }
    }

    #[test]
    fn advantages_pair_with_their_steps() {
        let buffer = filled_buffer(6);
        let estimate = estimate_for(6);
        let mut rng = StdRng::seed_from_u64(99);

        let feeds = buffer.minibatch_feeds(Some(2), &estimate, &mut rng);
        for feed in feeds {
            let actions = feed.get(feed_keys::ACTIONS).unwrap();
            let advantages = feed.get(feed_keys::ADVANTAGES).unwrap();
            let targets = feed.get(feed_keys::TARGETS).unwrap();
            for (j, &a) in actions.iter().enumerate() {
                assert_eq!(advantages[j], a * 10.0);
                assert_eq!(targets[j], a * 100.0);
            }
        }
    }

    #[test]
    fn empty_buffer_yields_no_feeds() {
        let buffer = RolloutBuffer::new(2);
        let estimate = AdvantageEstimate {
            advantages: vec![],
            targets: vec![],
        };
        let mut rng = StdRng::seed_from_u64(0);
        assert!(buffer.minibatch_feeds(Some(4), &estimate, &mut rng).is_empty());
    }

    #[test]
    fn clear_resets_storage() {
        let mut buffer = filled_buffer(3);
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.last_value(), 0.0);
        assert!(buffer.observations().is_empty());
    }
}
