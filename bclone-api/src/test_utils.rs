use bclone_core::Result;
use bclone_core::env::{Env, EnvironmentDescription, Space};
use bclone_core::replay_buffer::Rollout;
use candle_core::{Device, Tensor};

/// Expert controller applying a fixed linear map to the observation, one
/// weight row per action component. The data it labels is separable, so an
/// imitating policy should drive its regression loss to near zero.
pub struct LinearExpert {
    pub weights: Vec<Vec<f32>>,
}

impl LinearExpert {
    pub fn obs_dim(&self) -> usize {
        self.weights.first().map(Vec::len).unwrap_or(0)
    }

    pub fn action_dim(&self) -> usize {
        self.weights.len()
    }

    pub fn action(&self, observation: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .map(|row| row.iter().zip(observation).map(|(w, x)| w * x).sum())
            .collect()
    }

    /// One rollout of `steps` expert-labeled transitions on random
    /// observations.
    pub fn collect_rollout(&self, steps: usize, device: &Device) -> Result<Rollout> {
        let mut rollout = Rollout::default();
        for _ in 0..steps {
            let observation = Tensor::randn(0f32, 1., self.obs_dim(), device)?;
            let action = self.action(&observation.to_vec1::<f32>()?);
            let action = Tensor::from_vec(action, self.action_dim(), device)?;
            rollout.push_step(observation, action);
        }
        Ok(rollout)
    }
}

/// An environment frozen in a single state; enough for exercising the
/// predict-from-env path.
pub struct StaticEnv {
    pub state: Tensor,
    pub action_dim: usize,
}

impl Env for StaticEnv {
    fn get_state(&self) -> Result<Tensor> {
        Ok(self.state.clone())
    }

    fn env_description(&self) -> EnvironmentDescription {
        EnvironmentDescription::new(
            Space::Continuous {
                size: self.state.elem_count(),
            },
            Space::Continuous {
                size: self.action_dim,
            },
        )
    }
}
