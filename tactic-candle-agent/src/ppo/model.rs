//! Policy network with its parameter store and optimizer.
use crate::{
    model::{PolicyOutput, RecurrentPolicy, WindowInput},
    opt::{clip_grad_norm, Optimizer, OptimizerConfig},
    param_store::ParamSnapshot,
};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::{info, trace};
use std::path::Path;

/// A [`RecurrentPolicy`] owning its [`VarMap`] and optimizer.
pub struct PpoModel<P: RecurrentPolicy> {
    device: Device,
    varmap: VarMap,
    policy: P,
    opt: Optimizer,
    max_grad_norm: Option<f64>,
}

impl<P: RecurrentPolicy> PpoModel<P> {
    /// Constructs [`PpoModel`].
    pub fn build(
        config: P::Config,
        opt_config: &OptimizerConfig,
        max_grad_norm: Option<f64>,
        device: Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let policy = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
            P::build(vb, config)?
        };
        let opt = opt_config.build(varmap.all_vars())?;

        Ok(Self {
            device,
            varmap,
            policy,
            opt,
            max_grad_norm,
        })
    }

    /// Device holding the parameters.
    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Size of the recurrent state.
    pub fn hidden_dim(&self) -> usize {
        self.policy.hidden_dim()
    }

    /// Zero hidden state of the given batch size.
    pub fn init_hidden(&self, batch: usize) -> Result<Tensor> {
        self.policy.init_hidden(batch)
    }

    /// Runs the policy over a batch of windows.
    pub fn forward(&self, input: &WindowInput, hidden: &Tensor) -> Result<PolicyOutput> {
        self.policy.forward(input, hidden)
    }

    /// Takes a gradient step on `loss`, clipping the global norm of
    /// gradients if configured.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        match self.max_grad_norm {
            None => self.opt.backward_step(loss),
            Some(max_norm) => {
                let mut grads = loss.backward()?;
                let norm = clip_grad_norm(&mut grads, &self.varmap.all_vars(), max_norm)?;
                trace!("Gradient norm before clipping: {}", norm);
                self.opt.step(&grads)
            }
        }
    }

    /// Copies the parameters.
    pub fn snapshot(&self) -> Result<ParamSnapshot> {
        ParamSnapshot::snapshot(&self.varmap)
    }

    /// Overwrites the parameters with a snapshot.
    pub fn restore(&self, snapshot: &ParamSnapshot) -> Result<()> {
        snapshot.restore_into(&self.varmap)
    }

    /// Saves the parameters as a safetensors file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        self.varmap.save(&path)?;
        info!("Save policy parameters to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the parameters from a safetensors file.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.varmap.load(&path)?;
        info!("Load policy parameters from {:?}", path.as_ref());
        Ok(())
    }
}
