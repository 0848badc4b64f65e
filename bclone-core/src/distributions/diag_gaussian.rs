use super::ActionHead;
use candle_core::{Result, Tensor};
use std::f32;

/// Diagonal gaussian over the action space, parameterized per forward pass
/// by the raw network output: the first `action_dim` columns are the mean,
/// the rest the log variance of each action component. Log variance rather
/// than raw variance keeps the density defined for any network output.
pub struct DiagGaussianDistribution {
    mean: Tensor,
    log_var: Tensor,
}

impl DiagGaussianDistribution {
    pub fn from_raw_output(raw_output: &Tensor, action_dim: usize) -> Result<Self> {
        let mean = raw_output.narrow(1, 0, action_dim)?;
        let log_var = raw_output.narrow(1, action_dim, action_dim)?;
        Ok(Self { mean, log_var })
    }

    /// One sample per batch row.
    pub fn sample(&self) -> Result<Tensor> {
        let std = (self.log_var.clone() * 0.5)?.exp()?;
        let noise = Tensor::randn(0f32, 1., self.mean.shape(), self.mean.device())?;
        let sample = (&self.mean + std.mul(&noise)?)?;
        Ok(sample.detach())
    }

    /// Per-row log likelihood of the given actions, summed over the action
    /// components.
    pub fn log_prob(&self, actions: &Tensor) -> Result<Tensor> {
        let var = self.log_var.exp()?;
        let log_sqrt_2pi = f32::ln(f32::sqrt(2f32 * f32::consts::PI));
        let log_sqrt_2pi = Tensor::full(log_sqrt_2pi, self.mean.shape(), self.mean.device())?;
        let log_probs = ((((actions - &self.mean)?.sqr()? / (2. * var)?)?.neg()?
            - (self.log_var.clone() * 0.5)?)?
            - log_sqrt_2pi)?;
        log_probs.sum(1)
    }
}

/// Stochastic prediction head: the action is a single draw from the derived
/// gaussian, and training minimizes the negative mean log likelihood of the
/// expert actions under it.
#[derive(Debug)]
pub struct DiagGaussianHead {
    pub action_dim: usize,
}

impl ActionHead for DiagGaussianHead {
    fn predict(&self, raw_output: &Tensor) -> Result<Tensor> {
        let dist = DiagGaussianDistribution::from_raw_output(raw_output, self.action_dim)?;
        dist.sample()
    }

    fn loss(&self, raw_output: &Tensor, action_labels: &Tensor) -> Result<Tensor> {
        let dist = DiagGaussianDistribution::from_raw_output(raw_output, self.action_dim)?;
        let log_likelihood = dist.log_prob(action_labels)?;
        log_likelihood.mean_all()?.neg()
    }

    fn output_size(&self) -> usize {
        2 * self.action_dim
    }
}
