//! Recurrent policy built from multilayer perceptrons.
use crate::model::{PolicyOutput, RecurrentPolicy, WindowInput};
use anyhow::Result;
use candle_core::{DType, Device, IndexOp, Tensor, D};
use candle_nn::{linear, linear_no_bias, ops::softmax, Linear, Module, VarBuilder};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
/// Configuration of [`RecurrentMlp`].
pub struct RecurrentMlpConfig {
    /// Dimension of a frame input.
    pub in_dim: usize,

    /// Units of the hidden layers of the frame encoder.
    pub units: Vec<usize>,

    /// Size of the recurrent state.
    pub hidden_dim: usize,

    /// The number of base actions.
    pub n_base: usize,

    /// The number of cells of a spatial sub-choice, 0 for none.
    pub n_cells: usize,
}

impl RecurrentMlpConfig {
    /// Creates configuration of the network.
    pub fn new(in_dim: usize, units: Vec<usize>, hidden_dim: usize, n_base: usize) -> Self {
        Self {
            in_dim,
            units,
            hidden_dim,
            n_base,
            n_cells: 0,
        }
    }

    /// Sets the number of cells of a spatial sub-choice.
    pub fn n_cells(mut self, v: usize) -> Self {
        self.n_cells = v;
        self
    }
}

/// An MLP frame encoder followed by a tanh recurrent cell and three heads:
/// base action, spatial sub-choices and state value.
pub struct RecurrentMlp {
    config: RecurrentMlpConfig,
    device: Device,
    encoder: Vec<Linear>,
    cell_x: Linear,
    cell_h: Linear,
    base_head: Linear,
    spatial_head: Option<Linear>,
    value_head: Linear,
}

impl RecurrentMlp {
    fn encode(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for layer in self.encoder.iter() {
            xs = layer.forward(&xs)?.relu()?;
        }
        Ok(xs)
    }
}

impl RecurrentPolicy for RecurrentMlp {
    type Config = RecurrentMlpConfig;

    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self> {
        let device = vb.device().clone();
        let vb = vb.pp("policy");

        let mut encoder = vec![];
        let mut in_dim = config.in_dim;
        for (i, &units) in config.units.iter().enumerate() {
            encoder.push(linear(in_dim, units, vb.pp(format!("enc{}", i)))?);
            in_dim = units;
        }
        let cell_x = linear(in_dim, config.hidden_dim, vb.pp("cell_x"))?;
        let cell_h = linear_no_bias(config.hidden_dim, config.hidden_dim, vb.pp("cell_h"))?;
        let base_head = linear(config.hidden_dim, config.n_base, vb.pp("base"))?;
        let spatial_head = match config.n_cells {
            0 => None,
            n => Some(linear(config.hidden_dim, 2 * n, vb.pp("spatial"))?),
        };
        let value_head = linear(config.hidden_dim, 1, vb.pp("value"))?;

        Ok(Self {
            config,
            device,
            encoder,
            cell_x,
            cell_h,
            base_head,
            spatial_head,
            value_head,
        })
    }

    fn hidden_dim(&self) -> usize {
        self.config.hidden_dim
    }

    fn init_hidden(&self, batch: usize) -> Result<Tensor> {
        Ok(Tensor::zeros(
            (batch, self.config.hidden_dim),
            DType::F32,
            &self.device,
        )?)
    }

    fn forward(&self, input: &WindowInput, hidden: &Tensor) -> Result<PolicyOutput> {
        let (batch, history, _) = input.frames.dims3()?;
        let mut state = hidden.to_device(&self.device)?;

        for t in 0..history {
            let xs = input.frames.i((.., t, ..))?.contiguous()?;
            let xs = self.encode(&xs)?;
            let cand = (self.cell_x.forward(&xs)? + self.cell_h.forward(&state)?)?.tanh()?;
            let r = input.relevant.i((.., t))?.unsqueeze(1)?;
            let keep = r.affine(-1.0, 1.0)?;
            state = (cand.broadcast_mul(&r)? + state.broadcast_mul(&keep)?)?;
        }

        // unavailable actions get a large negative logit
        let mask = input.avail.affine(1e9, -1e9)?;
        let base_logits = (self.base_head.forward(&state)? + mask)?;
        let base_probs = softmax(&base_logits, D::Minus1)?;

        let spatial_probs = match &self.spatial_head {
            None => None,
            Some(head) => {
                let logits = head
                    .forward(&state)?
                    .reshape((batch, 2, self.config.n_cells))?;
                Some(softmax(&logits, D::Minus1)?)
            }
        };

        let value = self.value_head.forward(&state)?.squeeze(D::Minus1)?;

        Ok(PolicyOutput {
            base_probs,
            spatial_probs,
            value,
            hidden: state,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;

    fn build(n_cells: usize) -> Result<(VarMap, RecurrentMlp)> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let config = RecurrentMlpConfig::new(5, vec![8], 6, 3).n_cells(n_cells);
        let net = RecurrentMlp::build(vb, config)?;
        Ok((varmap, net))
    }

    fn input(batch: usize, history: usize, relevant: f32, avail: &[f32]) -> Result<WindowInput> {
        let frames = Tensor::ones((batch, history, 5), DType::F32, &Device::Cpu)?;
        let relevant = (Tensor::ones((batch, history), DType::F32, &Device::Cpu)? * relevant as f64)?;
        let avail = Tensor::from_slice(avail, (1, 3), &Device::Cpu)?.repeat((batch, 1))?;
        Ok(WindowInput {
            frames,
            relevant,
            avail,
        })
    }

    #[test]
    fn test_output_shapes() -> Result<()> {
        let (_varmap, net) = build(4)?;
        let hidden = net.init_hidden(2)?;
        let out = net.forward(&input(2, 3, 1.0, &[1.0, 1.0, 1.0])?, &hidden)?;
        assert_eq!(out.base_probs.dims(), &[2, 3]);
        assert_eq!(out.spatial_probs.as_ref().unwrap().dims(), &[2, 2, 4]);
        assert_eq!(out.value.dims(), &[2]);
        assert_eq!(out.hidden.dims(), &[2, 6]);

        let sums = out.base_probs.sum(D::Minus1)?.to_vec1::<f32>()?;
        assert!(sums.iter().all(|s| (s - 1.0).abs() < 1e-5));
        Ok(())
    }

    #[test]
    fn test_unavailable_actions_have_zero_probability() -> Result<()> {
        let (_varmap, net) = build(0)?;
        let hidden = net.init_hidden(1)?;
        let out = net.forward(&input(1, 1, 1.0, &[1.0, 0.0, 1.0])?, &hidden)?;
        let probs = out.base_probs.to_vec2::<f32>()?;
        assert!(probs[0][1] < 1e-6);
        assert!(out.spatial_probs.is_none());
        Ok(())
    }

    #[test]
    fn test_masked_frames_keep_hidden_state() -> Result<()> {
        let (_varmap, net) = build(0)?;
        let hidden = Tensor::from_slice(&[0.5f32, -0.5, 0.1, 0.2, 0.3, 0.4], (1, 6), &Device::Cpu)?;
        let out = net.forward(&input(1, 4, 0.0, &[1.0, 1.0, 1.0])?, &hidden)?;
        assert_eq!(out.hidden.to_vec2::<f32>()?, hidden.to_vec2::<f32>()?);
        Ok(())
    }
}
