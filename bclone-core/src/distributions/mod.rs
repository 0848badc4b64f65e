pub mod diag_gaussian;

use candle_core::{Result, Tensor};
use diag_gaussian::DiagGaussianHead;
use enum_dispatch::enum_dispatch;

/// Turns the raw network output into actions and losses. The head is the
/// only place where the deterministic and stochastic regimes differ: the
/// network below it is the same MLP, only wider on the output in the
/// stochastic case.
#[enum_dispatch]
pub trait ActionHead {
    /// Batch of predicted actions for a batch of raw outputs.
    fn predict(&self, raw_output: &Tensor) -> Result<Tensor>;

    /// Scalar training loss between raw outputs and expert labels.
    fn loss(&self, raw_output: &Tensor, action_labels: &Tensor) -> Result<Tensor>;

    /// Width of the raw output this head consumes.
    fn output_size(&self) -> usize;
}

/// Predicted action is the raw output, unmodified. Trained with mean
/// squared error against the expert labels.
#[derive(Debug)]
pub struct DeterministicHead {
    pub action_dim: usize,
}

impl ActionHead for DeterministicHead {
    fn predict(&self, raw_output: &Tensor) -> Result<Tensor> {
        Ok(raw_output.clone())
    }

    fn loss(&self, raw_output: &Tensor, action_labels: &Tensor) -> Result<Tensor> {
        (action_labels - raw_output)?.sqr()?.mean_all()
    }

    fn output_size(&self) -> usize {
        self.action_dim
    }
}

#[enum_dispatch(ActionHead)]
#[derive(Debug)]
pub enum ActionHeadKind {
    Deterministic(DeterministicHead),
    DiagGaussian(DiagGaussianHead),
}

impl ActionHeadKind {
    pub fn for_mode(stochastic: bool, action_dim: usize) -> Self {
        if stochastic {
            Self::DiagGaussian(DiagGaussianHead { action_dim })
        } else {
            Self::Deterministic(DeterministicHead { action_dim })
        }
    }
}
