use candle_core::Tensor;
use derive_more::{Deref, DerefMut};

/// Rank-2 `batch x obs_dim` tensor sampled from the replay buffer.
#[derive(Deref, DerefMut, Debug)]
pub struct ObservationBatch(pub Tensor);

/// Rank-2 `batch x action_dim` tensor aligned with an [`ObservationBatch`]:
/// row i of both belongs to the same transition.
#[derive(Deref, DerefMut, Debug)]
pub struct ActionBatch(pub Tensor);
