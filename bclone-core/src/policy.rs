use crate::checkpoint::{self, CheckpointMeta, POLICY_SCOPE};
use crate::distributions::{ActionHead, ActionHeadKind};
use crate::error::{Error, Result};
use crate::network::{PolicyNet, build_policy_net};
use candle_core::{DType, Device, Tensor};
use candle_nn::{AdamW, Module, Optimizer, ParamsAdamW, VarBuilder, VarMap};
use std::path::Path;
use tracing::debug;

/// Construction parameters for a fresh, trainable approximator. A restored
/// one takes none of these; everything is recovered from the checkpoint.
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    pub obs_dim: usize,
    pub action_dim: usize,
    pub hidden_layers: Vec<usize>,
    pub learning_rate: f64,
    pub stochastic: bool,
}

/// Training-only state. Lives on trainable instances and nowhere else; the
/// optimizer moments inside never reach a checkpoint.
#[derive(Debug)]
struct Trainer {
    optimizer: AdamW,
}

/// The policy approximator: an MLP from observations to either actions
/// (deterministic) or action distribution parameters (stochastic), with the
/// prediction head deciding between the two. Built either fresh for
/// training or rebound from a checkpoint for inference only.
#[derive(Debug)]
pub struct ImitationPolicy {
    device: Device,
    net: PolicyNet,
    head: ActionHeadKind,
    obs_dim: usize,
    action_dim: usize,
    trainer: Option<Trainer>,
}

impl ImitationPolicy {
    /// Fresh network with randomly initialized parameters and a bound
    /// optimizer.
    pub fn trainable(config: PolicyConfig, device: Device) -> Result<Self> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let head = ActionHeadKind::for_mode(config.stochastic, config.action_dim);
        let layers = [&config.hidden_layers[..], &[head.output_size()]].concat();
        let net = build_policy_net(config.obs_dim, &layers, &vb, POLICY_SCOPE)?;
        let optimizer = AdamW::new(
            varmap.all_vars(),
            ParamsAdamW {
                lr: config.learning_rate,
                ..Default::default()
            },
        )?;
        Ok(Self {
            device,
            net,
            head,
            obs_dim: config.obs_dim,
            action_dim: config.action_dim,
            trainer: Some(Trainer { optimizer }),
        })
    }

    /// Inference-only instance rebound from a saved checkpoint. No
    /// optimizer, loss, or label state exists on the result.
    pub fn restore(path: &Path, device: Device) -> Result<Self> {
        let (meta, net) = checkpoint::load(path, &device)?;
        let head = ActionHeadKind::for_mode(meta.stochastic, meta.action_dim);
        Ok(Self {
            device,
            net,
            head,
            obs_dim: meta.obs_dim,
            action_dim: meta.action_dim,
            trainer: None,
        })
    }

    pub fn obs_dim(&self) -> usize {
        self.obs_dim
    }

    pub fn action_dim(&self) -> usize {
        self.action_dim
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    pub fn is_trainable(&self) -> bool {
        self.trainer.is_some()
    }

    pub fn is_stochastic(&self) -> bool {
        matches!(self.head, ActionHeadKind::DiagGaussian(..))
    }

    /// Predicts actions for a single observation or a batch of them. A
    /// rank-1 input is promoted to a singleton batch and the singleton
    /// result returned unwrapped.
    pub fn predict(&self, observation: &Tensor) -> Result<Tensor> {
        let (batched, was_single) = ensure_batched(observation)?;
        let obs_dim = batched.dim(1)?;
        if obs_dim != self.obs_dim {
            return Err(Error::DimensionMismatch {
                what: "observation",
                expected: self.obs_dim,
                got: obs_dim,
            });
        }
        let raw_output = self.net.forward(&batched)?;
        let actions = self.head.predict(&raw_output)?;
        if was_single {
            Ok(actions.squeeze(0)?)
        } else {
            Ok(actions)
        }
    }

    /// One gradient step on the given batch of expert-labeled data.
    /// Returns the realized loss for caller side logging.
    pub fn train_step(&mut self, observations: &Tensor, action_labels: &Tensor) -> Result<f32> {
        if self.trainer.is_none() {
            return Err(Error::InvalidMode(
                "train called on an inference-only policy",
            ));
        }
        if observations.rank() != 2 {
            return Err(Error::DimensionMismatch {
                what: "observation batch rank",
                expected: 2,
                got: observations.rank(),
            });
        }
        let (batch_size, obs_dim) = observations.dims2()?;
        if obs_dim != self.obs_dim {
            return Err(Error::DimensionMismatch {
                what: "observation",
                expected: self.obs_dim,
                got: obs_dim,
            });
        }
        let labels = self.reshape_labels(action_labels, batch_size)?;
        let raw_output = self.net.forward(observations)?;
        let loss = self.head.loss(&raw_output, &labels)?;
        let grads = loss.backward()?;
        if let Some(trainer) = self.trainer.as_mut() {
            trainer.optimizer.step(&grads)?;
        }
        let loss = loss.to_scalar::<f32>()?;
        debug!(loss, "imitation train step");
        Ok(loss)
    }

    /// Writes the policy parameters and structural description under
    /// `path`. Repeated saves overwrite.
    pub fn save(&self, path: &Path) -> Result<()> {
        let meta = CheckpointMeta {
            obs_dim: self.obs_dim,
            action_dim: self.action_dim,
            hidden_layers: self.net.hidden_sizes()?,
            stochastic: self.is_stochastic(),
        };
        checkpoint::save(path, &meta, &self.net)
    }

    // Labels arrive from callers in whatever layout their collector used;
    // anything with the right element count is accepted and reshaped.
    fn reshape_labels(&self, action_labels: &Tensor, batch_size: usize) -> Result<Tensor> {
        let expected = batch_size * self.action_dim;
        let count = action_labels.elem_count();
        if count != expected {
            return Err(Error::DimensionMismatch {
                what: "action labels",
                expected,
                got: count,
            });
        }
        Ok(action_labels.reshape((batch_size, self.action_dim))?)
    }
}

/// Boundary normalization for the predict entry point: a rank-1 observation
/// becomes a batch of one, a rank-2 batch passes through. The flag reports
/// whether promotion happened so the caller can unwrap the result.
pub fn ensure_batched(observation: &Tensor) -> Result<(Tensor, bool)> {
    match observation.rank() {
        1 => Ok((observation.unsqueeze(0)?, true)),
        2 => Ok((observation.clone(), false)),
        rank => Err(Error::DimensionMismatch {
            what: "observation rank",
            expected: 2,
            got: rank,
        }),
    }
}
