use bclone_core::Result;
use bclone_core::agent::ImitationAgent;
use bclone_core::env::EnvironmentDescription;
use bclone_core::policy::PolicyConfig;
use candle_core::Device;
use std::path::Path;

/// Builder for trainable imitation agents. Restores go through
/// [`ImitationBuilder::restore`], which takes no hyperparameters at all:
/// the checkpoint is the single source of structure.
pub struct ImitationBuilder {
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    /// When set, the network predicts distribution parameters and actions
    /// are sampled. Off by default: the expert is imitated point for point.
    pub stochastic: bool,
    pub replay_capacity: usize,
}

impl Default for ImitationBuilder {
    fn default() -> Self {
        Self {
            hidden_layers: vec![64, 64],
            learning_rate: 3e-4,
            stochastic: false,
            replay_capacity: 1_000_000,
        }
    }
}

impl ImitationBuilder {
    pub fn build(
        &self,
        device: &Device,
        env_description: &EnvironmentDescription,
    ) -> Result<ImitationAgent> {
        self.build_with_dims(
            device,
            env_description.observation_size(),
            env_description.action_size(),
        )
    }

    pub fn build_with_dims(
        &self,
        device: &Device,
        obs_dim: usize,
        action_dim: usize,
    ) -> Result<ImitationAgent> {
        let config = PolicyConfig {
            obs_dim,
            action_dim,
            hidden_layers: self.hidden_layers.clone(),
            learning_rate: self.learning_rate,
            stochastic: self.stochastic,
        };
        ImitationAgent::trainable(config, self.replay_capacity, device.clone())
    }

    /// Inference-only agent rebound from a checkpoint.
    pub fn restore(device: &Device, path: &Path) -> Result<ImitationAgent> {
        ImitationAgent::restore(path, device.clone())
    }
}
