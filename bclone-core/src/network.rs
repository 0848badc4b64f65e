use candle_core::{Result, Tensor, bail};
use candle_nn::{Activation, Linear, Module, VarBuilder, linear};
use either::Either;

/// A linear layer that remembers the names of its parameters. The names
/// double as the checkpoint roles: the persistence gateway looks layers up
/// by them when rebinding a restored network.
#[derive(Debug, Clone)]
pub struct LinearLayer {
    layer: Linear,
    weight_name: String,
    bias_name: String,
}

impl LinearLayer {
    pub fn new(in_dim: usize, out_dim: usize, vb: &VarBuilder, name: &str) -> Result<Self> {
        let layer = linear(in_dim, out_dim, vb.pp(name))?;
        Ok(Self {
            layer,
            weight_name: format!("{name}.weight"),
            bias_name: format!("{name}.bias"),
        })
    }

    /// Rebinds a layer from restored tensors. Shape validation happens at
    /// the checkpoint layer, before this is called.
    pub fn from_tensors(weight: Tensor, bias: Tensor, name: &str) -> Self {
        Self {
            layer: Linear::new(weight, Some(bias)),
            weight_name: format!("{name}.weight"),
            bias_name: format!("{name}.bias"),
        }
    }

    pub fn named_parameters(&self) -> Result<Vec<(String, Tensor)>> {
        let Some(bias) = self.layer.bias() else {
            bail!("linear layer {} has no bias", self.weight_name)
        };
        Ok(vec![
            (self.weight_name.clone(), self.layer.weight().clone()),
            (self.bias_name.clone(), bias.clone()),
        ])
    }

    /// `(in_dim, out_dim)` of this layer, read off the weight shape.
    pub fn dims(&self) -> Result<(usize, usize)> {
        let (out_dim, in_dim) = self.layer.weight().dims2()?;
        Ok((in_dim, out_dim))
    }
}

impl Module for LinearLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.layer.forward(xs)
    }
}

#[derive(Debug, Clone)]
pub struct NetLayer(pub Either<LinearLayer, Activation>);

impl NetLayer {
    pub fn linear(linear: LinearLayer) -> Self {
        Self(Either::Left(linear))
    }

    pub fn activation(activation: Activation) -> Self {
        Self(Either::Right(activation))
    }
}

impl Module for NetLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match &self.0 {
            Either::Left(linear) => linear.forward(xs),
            Either::Right(activation) => activation.forward(xs),
        }
    }
}

/// The policy MLP: named linear layers with ReLU between the hidden ones
/// and a bare linear output.
#[derive(Default, Debug, Clone)]
pub struct PolicyNet {
    layers: Vec<NetLayer>,
}

impl PolicyNet {
    fn add_layer(mut self, layer: NetLayer) -> Self {
        self.layers.push(layer);
        self
    }

    /// Assembles a network from restored linear layers, reinserting the
    /// activations the checkpoint does not store.
    pub fn from_linears(linears: Vec<LinearLayer>) -> Self {
        let num_layers = linears.len();
        let mut nn = Self::default();
        for (layer_idx, layer) in linears.into_iter().enumerate() {
            nn = nn.add_layer(NetLayer::linear(layer));
            if layer_idx != num_layers - 1 {
                nn = nn.add_layer(NetLayer::activation(Activation::Relu));
            }
        }
        nn
    }

    /// All trainable parameters with their checkpoint names. Activations
    /// carry none, so this is exactly the persisted set.
    pub fn named_parameters(&self) -> Result<Vec<(String, Tensor)>> {
        let mut params = vec![];
        for layer in &self.layers {
            if let Either::Left(linear) = &layer.0 {
                params.extend(linear.named_parameters()?);
            }
        }
        Ok(params)
    }

    /// `(in_dim, out_dim)` per linear layer, in forward order.
    pub fn linear_dims(&self) -> Result<Vec<(usize, usize)>> {
        self.layers
            .iter()
            .filter_map(|layer| match &layer.0 {
                Either::Left(linear) => Some(linear.dims()),
                Either::Right(_) => None,
            })
            .collect()
    }

    /// Output widths of the hidden layers, i.e. everything but the last
    /// linear layer.
    pub fn hidden_sizes(&self) -> Result<Vec<usize>> {
        let mut sizes: Vec<usize> = self
            .linear_dims()?
            .into_iter()
            .map(|(_, out_dim)| out_dim)
            .collect();
        sizes.pop();
        Ok(sizes)
    }
}

impl Module for PolicyNet {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for layer in self.layers.iter() {
            xs = layer.forward(&xs)?;
        }
        Ok(xs)
    }
}

pub fn build_policy_net(
    input_dim: usize,
    layers: &[usize],
    vb: &VarBuilder,
    prefix: &str,
) -> Result<PolicyNet> {
    let mut last_dim = input_dim;
    let mut nn = PolicyNet::default();
    let num_layers = layers.len();
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_name = format!("{prefix}{layer_idx}");
        let layer = LinearLayer::new(last_dim, *layer_size, vb, &layer_name)?;
        if layer_idx == num_layers - 1 {
            nn = nn.add_layer(NetLayer::linear(layer));
        } else {
            nn = nn
                .add_layer(NetLayer::linear(layer))
                .add_layer(NetLayer::activation(Activation::Relu));
        }
        last_dim = *layer_size;
    }
    Ok(nn)
}
