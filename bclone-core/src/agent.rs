use crate::env::Env;
use crate::error::{Error, Result};
use crate::policy::{ImitationPolicy, PolicyConfig};
use crate::replay_buffer::{ReplayBuffer, Rollout};
use crate::tensors::{ActionBatch, ObservationBatch};
use candle_core::{Device, Tensor};
use std::path::Path;

/// The surface the rollout/training driver talks to: a policy approximator
/// plus the replay store feeding it. An inference-only agent carries no
/// replay store at all.
pub struct ImitationAgent {
    policy: ImitationPolicy,
    replay_buffer: Option<ReplayBuffer>,
}

impl ImitationAgent {
    /// Trainable agent with a fresh policy and an empty replay store.
    pub fn trainable(
        config: PolicyConfig,
        replay_capacity: usize,
        device: Device,
    ) -> Result<Self> {
        let replay_buffer = ReplayBuffer::new(replay_capacity, config.obs_dim, config.action_dim);
        let policy = ImitationPolicy::trainable(config, device)?;
        Ok(Self {
            policy,
            replay_buffer: Some(replay_buffer),
        })
    }

    /// Inference-only agent restored from a checkpoint.
    pub fn restore(path: &Path, device: Device) -> Result<Self> {
        let policy = ImitationPolicy::restore(path, device)?;
        Ok(Self {
            policy,
            replay_buffer: None,
        })
    }

    pub fn policy(&self) -> &ImitationPolicy {
        &self.policy
    }

    /// One gradient step on a batch of expert-labeled data; returns the
    /// realized loss.
    pub fn train(&mut self, observations: &Tensor, action_labels: &Tensor) -> Result<f32> {
        self.policy.train_step(observations, action_labels)
    }

    /// Action prediction for a live observation (single vector or batch).
    pub fn predict_from_observation(&self, observation: &Tensor) -> Result<Tensor> {
        self.policy.predict(observation)
    }

    /// Action prediction for the current state of the given environment.
    pub fn predict_from_env(&self, env: &impl Env) -> Result<Tensor> {
        let observation = env.get_state()?;
        self.policy.predict(&observation)
    }

    /// Appends collected rollouts to the replay store.
    pub fn add_to_replay_buffer(&mut self, rollouts: Vec<Rollout>) -> Result<()> {
        let Some(replay_buffer) = self.replay_buffer.as_mut() else {
            return Err(Error::InvalidMode(
                "rollouts added to an inference-only agent",
            ));
        };
        replay_buffer.add_rollouts(rollouts)
    }

    /// Samples an aligned training batch from the replay store.
    pub fn sample_data(&self, batch_size: usize) -> Result<(ObservationBatch, ActionBatch)> {
        let Some(replay_buffer) = self.replay_buffer.as_ref() else {
            return Err(Error::InvalidMode(
                "sampling from an inference-only agent",
            ));
        };
        replay_buffer.sample_batch(batch_size)
    }

    pub fn replay_buffer(&self) -> Option<&ReplayBuffer> {
        self.replay_buffer.as_ref()
    }

    /// Persists the policy parameters under `path`.
    pub fn save_network(&self, path: &Path) -> Result<()> {
        self.policy.save(path)
    }
}
