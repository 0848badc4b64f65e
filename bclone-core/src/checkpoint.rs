//! The persistence gateway. A checkpoint is a directory holding the
//! `model.ckpt` family: a bincode structural description and a safetensors
//! parameter blob. Only policy parameters are ever written; optimizer state
//! never reaches disk, so an inference-only restore cannot pull it in.

use crate::error::{Error, Result};
use crate::network::{LinearLayer, PolicyNet};
use bincode::{Decode, Encode};
use candle_core::{Device, Tensor};
use safetensors::serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

pub const META_FILE: &str = "model.ckpt.meta";
pub const DATA_FILE: &str = "model.ckpt.data";

/// Parameter name prefix shared by the builder and the loader; layer `i`
/// owns `policy{i}.weight` and `policy{i}.bias`.
pub const POLICY_SCOPE: &str = "policy";

/// Structural description of the persisted network. Everything needed to
/// rebuild the approximator lives here, so a restore takes no construction
/// hyperparameters.
#[derive(Encode, Decode, Debug, Clone, PartialEq)]
pub struct CheckpointMeta {
    pub obs_dim: usize,
    pub action_dim: usize,
    pub hidden_layers: Vec<usize>,
    pub stochastic: bool,
}

impl CheckpointMeta {
    /// Widths of every linear layer, output included.
    pub fn layer_sizes(&self) -> Vec<usize> {
        let output_size = if self.stochastic {
            2 * self.action_dim
        } else {
            self.action_dim
        };
        let mut sizes = self.hidden_layers.clone();
        sizes.push(output_size);
        sizes
    }
}

/// Writes the checkpoint pair under `dir`, overwriting previous saves.
pub fn save(dir: &Path, meta: &CheckpointMeta, net: &PolicyNet) -> Result<()> {
    fs::create_dir_all(dir)?;
    let encoded_meta = bincode::encode_to_vec(meta, bincode::config::standard())
        .map_err(candle_core::Error::wrap)?;
    fs::write(dir.join(META_FILE), encoded_meta)?;
    let params = net.named_parameters()?;
    let data = serialize(
        params.iter().map(|(name, tensor)| (name, tensor)),
        None,
    )
    .map_err(candle_core::Error::wrap)?;
    fs::write(dir.join(DATA_FILE), data)?;
    info!(path = %dir.display(), "saved policy checkpoint");
    Ok(())
}

/// Restores the structural description and rebinds the network from the
/// parameter blob. Every expected parameter is looked up by name and shape
/// checked against the metadata; any absence or mismatch fails before any
/// state is bound.
pub fn load(dir: &Path, device: &Device) -> Result<(CheckpointMeta, PolicyNet)> {
    let load_error = |reason: String| Error::CheckpointLoad {
        path: dir.to_path_buf(),
        reason,
    };
    let meta_bytes = fs::read(dir.join(META_FILE))
        .map_err(|err| load_error(format!("cannot read {META_FILE}: {err}")))?;
    let (meta, _): (CheckpointMeta, usize) =
        bincode::decode_from_slice(&meta_bytes, bincode::config::standard())
            .map_err(|err| load_error(format!("cannot decode {META_FILE}: {err}")))?;
    let mut tensors: HashMap<String, Tensor> =
        candle_core::safetensors::load(dir.join(DATA_FILE), device)
            .map_err(|err| load_error(format!("cannot read {DATA_FILE}: {err}")))?;

    let mut linears = vec![];
    let mut in_dim = meta.obs_dim;
    for (layer_idx, out_dim) in meta.layer_sizes().into_iter().enumerate() {
        let layer_name = format!("{POLICY_SCOPE}{layer_idx}");
        let weight = take_tensor(&mut tensors, &format!("{layer_name}.weight"), &load_error)?;
        let bias = take_tensor(&mut tensors, &format!("{layer_name}.bias"), &load_error)?;
        let weight_dims = weight
            .dims2()
            .map_err(|_| load_error(format!("{layer_name}.weight is not rank 2")))?;
        if weight_dims != (out_dim, in_dim) {
            return Err(load_error(format!(
                "{layer_name}.weight has shape {weight_dims:?}, expected ({out_dim}, {in_dim})"
            )));
        }
        let bias_dim = bias
            .dims1()
            .map_err(|_| load_error(format!("{layer_name}.bias is not rank 1")))?;
        if bias_dim != out_dim {
            return Err(load_error(format!(
                "{layer_name}.bias has length {bias_dim}, expected {out_dim}"
            )));
        }
        linears.push(LinearLayer::from_tensors(weight, bias, &layer_name));
        in_dim = out_dim;
    }
    info!(path = %dir.display(), "restored policy checkpoint");
    Ok((meta, PolicyNet::from_linears(linears)))
}

fn take_tensor(
    tensors: &mut HashMap<String, Tensor>,
    name: &str,
    load_error: &impl Fn(String) -> Error,
) -> Result<Tensor> {
    tensors
        .remove(name)
        .ok_or_else(|| load_error(format!("missing tensor {name}")))
}
