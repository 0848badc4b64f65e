use crate::error::{Error, Result};
use crate::rng::RNG;
use crate::tensors::{ActionBatch, ObservationBatch};
use candle_core::Tensor;
use rand::Rng;
use rand::seq::index;
use std::collections::VecDeque;

/// One expert-labeled observation/action pair. Immutable once stored.
#[derive(Debug, Clone)]
pub struct Transition {
    pub observation: Tensor,
    pub action: Tensor,
}

/// One episode worth of expert transitions, pushed step by step by the
/// rollout driver and handed to the replay buffer as a unit.
#[derive(Debug, Default)]
pub struct Rollout {
    pub observations: Vec<Tensor>,
    pub actions: Vec<Tensor>,
}

impl Rollout {
    pub fn push_step(&mut self, observation: Tensor, action: Tensor) {
        self.observations.push(observation);
        self.actions.push(action);
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Capacity-bounded FIFO store of expert transitions. Rollouts keep
/// arriving while training samples from it; appending evicts the oldest
/// transitions once the capacity is reached, and sampling only ever sees
/// the transitions live at call time.
pub struct ReplayBuffer {
    transitions: VecDeque<Transition>,
    capacity: usize,
    obs_dim: usize,
    action_dim: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize, obs_dim: usize, action_dim: usize) -> Self {
        Self {
            transitions: VecDeque::new(),
            capacity,
            obs_dim,
            action_dim,
        }
    }

    pub fn len(&self) -> usize {
        self.transitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transitions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Flattens the rollouts into transitions and appends them, evicting
    /// the oldest transitions past the capacity bound. Every vector is
    /// validated against the configured dimensions before anything is
    /// stored.
    pub fn add_rollouts(&mut self, rollouts: Vec<Rollout>) -> Result<()> {
        for rollout in &rollouts {
            if rollout.observations.len() != rollout.actions.len() {
                return Err(Error::DimensionMismatch {
                    what: "rollout action count",
                    expected: rollout.observations.len(),
                    got: rollout.actions.len(),
                });
            }
            for observation in &rollout.observations {
                check_vector(observation, "observation", self.obs_dim)?;
            }
            for action in &rollout.actions {
                check_vector(action, "action", self.action_dim)?;
            }
        }
        for rollout in rollouts {
            for (observation, action) in rollout.observations.into_iter().zip(rollout.actions) {
                self.transitions.push_back(Transition {
                    observation,
                    action,
                });
                if self.transitions.len() > self.capacity {
                    self.transitions.pop_front();
                }
            }
        }
        Ok(())
    }

    /// Draws `batch_size` transitions uniformly at random and stacks them
    /// into aligned rank-2 batches. Sampling is without replacement, unless
    /// the store holds fewer transitions than requested.
    pub fn sample_batch(&self, batch_size: usize) -> Result<(ObservationBatch, ActionBatch)> {
        if self.transitions.is_empty() {
            return Err(Error::InsufficientData);
        }
        let indices: Vec<usize> = if self.transitions.len() >= batch_size {
            RNG.with_borrow_mut(|rng| index::sample(rng, self.transitions.len(), batch_size))
                .into_vec()
        } else {
            RNG.with_borrow_mut(|rng| {
                (0..batch_size)
                    .map(|_| rng.random_range(0..self.transitions.len()))
                    .collect()
            })
        };
        let observations: Vec<&Tensor> = indices
            .iter()
            .map(|idx| &self.transitions[*idx].observation)
            .collect();
        let actions: Vec<&Tensor> = indices
            .iter()
            .map(|idx| &self.transitions[*idx].action)
            .collect();
        let observations = Tensor::stack(&observations, 0)?;
        let actions = Tensor::stack(&actions, 0)?;
        Ok((ObservationBatch(observations), ActionBatch(actions)))
    }
}

fn check_vector(tensor: &Tensor, what: &'static str, expected: usize) -> Result<()> {
    if tensor.rank() != 1 {
        return Err(Error::DimensionMismatch {
            what,
            expected: 1,
            got: tensor.rank(),
        });
    }
    let len = tensor.dim(0)?;
    if len != expected {
        return Err(Error::DimensionMismatch {
            what,
            expected,
            got: len,
        });
    }
    Ok(())
}
