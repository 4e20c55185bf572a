//! Configuration of PPO agent.
use crate::{opt::OptimizerConfig, Device};
use anyhow::Result;
use log::info;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};
use tactic_core::{action_space::ActionSpace, trajectory_buffer::TrajectoryBufferConfig};

/// Configuration of [`Ppo`](super::Ppo) agent.
///
/// `C` is the configuration of the recurrent policy. Its input dimension
/// must be the feature dimension of the observations plus
/// [`prev_action_dim`](super::prev_action_dim) of the action space.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct PpoConfig<C> {
    /// Configuration of the policy network.
    pub model_config: Option<C>,

    /// Configuration of the optimizer.
    pub opt_config: OptimizerConfig,

    /// Configuration of the trajectory buffer.
    pub buffer_config: TrajectoryBufferConfig,

    /// Base actions and their spatial sub-choices.
    pub action_space: ActionSpace,

    /// Discount factor γ.
    pub discount_factor: f32,

    /// λ of generalized advantage estimation.
    pub gae_lambda: f32,

    /// Floor of the standard deviation in advantage normalization and of
    /// probabilities inside logarithms.
    pub eps_denom: f64,

    /// Weight of the value loss (c1).
    pub value_coef: f64,

    /// Weight of the entropy bonus (c2).
    pub entropy_coef: f64,

    /// Weight of the spatial entropy inside the bonus (c3).
    pub spatial_entropy_coef: f64,

    /// Weight of the base entropy inside the bonus (c4).
    pub base_entropy_coef: f64,

    /// Clipping range of the importance ratio.
    pub clip_ratio: f64,

    /// The number of passes over the buffer in a training call.
    pub epochs: usize,

    /// Maximum global norm of gradients, no clipping if `None`.
    pub max_grad_norm: Option<f64>,

    /// Exploration rate at the first frame.
    pub epsilon_max: f32,

    /// Exploration rate after `epsilon_duration` frames.
    pub epsilon_min: f32,

    /// The number of frames over which ε decays linearly.
    pub epsilon_duration: usize,

    /// Device of the networks, CPU if `None`.
    pub device: Option<Device>,

    /// Seed of the exploration and sampling random number generator.
    pub seed: u64,
}

impl<C> Default for PpoConfig<C> {
    fn default() -> Self {
        Self {
            model_config: None,
            opt_config: OptimizerConfig::default(),
            buffer_config: TrajectoryBufferConfig::default(),
            action_space: ActionSpace::discrete(1),
            discount_factor: 0.99,
            gae_lambda: 0.95,
            eps_denom: 1e-6,
            value_coef: 1.0,
            entropy_coef: 0.5,
            spatial_entropy_coef: 0.5,
            base_entropy_coef: 1.0,
            clip_ratio: 0.1,
            epochs: 3,
            max_grad_norm: None,
            epsilon_max: 1.0,
            epsilon_min: 0.05,
            epsilon_duration: 1_000_000,
            device: None,
            seed: 42,
        }
    }
}

impl<C> PpoConfig<C>
where
    C: Serialize + serde::de::DeserializeOwned,
{
    /// Sets the configuration of the policy network.
    pub fn model_config(mut self, v: C) -> Self {
        self.model_config = Some(v);
        self
    }

    /// Sets the optimizer configuration.
    pub fn opt_config(mut self, v: OptimizerConfig) -> Self {
        self.opt_config = v;
        self
    }

    /// Sets the configuration of the trajectory buffer.
    pub fn buffer_config(mut self, v: TrajectoryBufferConfig) -> Self {
        self.buffer_config = v;
        self
    }

    /// Sets the action space.
    pub fn action_space(mut self, v: ActionSpace) -> Self {
        self.action_space = v;
        self
    }

    /// Sets the discount factor.
    pub fn discount_factor(mut self, v: f32) -> Self {
        self.discount_factor = v;
        self
    }

    /// Sets λ of GAE.
    pub fn gae_lambda(mut self, v: f32) -> Self {
        self.gae_lambda = v;
        self
    }

    /// Sets the weight of the value loss.
    pub fn value_coef(mut self, v: f64) -> Self {
        self.value_coef = v;
        self
    }

    /// Sets the weight of the entropy bonus.
    pub fn entropy_coef(mut self, v: f64) -> Self {
        self.entropy_coef = v;
        self
    }

    /// Sets the clipping range of the importance ratio.
    pub fn clip_ratio(mut self, v: f64) -> Self {
        self.clip_ratio = v;
        self
    }

    /// Sets the number of epochs in a training call.
    pub fn epochs(mut self, v: usize) -> Self {
        self.epochs = v;
        self
    }

    /// Sets the maximum global norm of gradients.
    pub fn max_grad_norm(mut self, v: f64) -> Self {
        self.max_grad_norm = Some(v);
        self
    }

    /// Sets the ε schedule of exploration.
    pub fn epsilon(mut self, max: f32, min: f32, duration: usize) -> Self {
        self.epsilon_max = max;
        self.epsilon_min = min;
        self.epsilon_duration = duration;
        self
    }

    /// Sets device.
    pub fn device(mut self, device: candle_core::Device) -> Self {
        self.device = Some((&device).into());
        self
    }

    /// Sets the random seed of action sampling.
    pub fn seed(mut self, v: u64) -> Self {
        self.seed = v;
        self
    }

    /// Loads [`PpoConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path_ = path.as_ref().to_owned();
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        info!("Load config of PPO agent from {}", path_.display());
        Ok(b)
    }

    /// Saves [`PpoConfig`] to YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path_ = path.as_ref().to_owned();
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        info!("Save config of PPO agent into {}", path_.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recurrent_mlp::RecurrentMlpConfig;
    use tactic_core::action_space::SubChoice;
    use tempdir::TempDir;

    #[test]
    fn test_serde_ppo_config() -> Result<()> {
        let space = ActionSpace {
            n_base: 3,
            spatial_width: 4,
            applicable: vec![vec![], vec![SubChoice::Primary], vec![]],
        };
        let config = PpoConfig::default()
            .model_config(RecurrentMlpConfig::new(10, vec![16], 8, 3).n_cells(16))
            .buffer_config(TrajectoryBufferConfig::default().history_size(4))
            .action_space(space)
            .max_grad_norm(0.5)
            .epsilon(0.5, 0.1, 100)
            .device(candle_core::Device::Cpu);

        let dir = TempDir::new("ppo_config")?;
        let path = dir.path().join("ppo_config.yaml");
        config.save(&path)?;
        let config_ = PpoConfig::<RecurrentMlpConfig>::load(&path)?;
        assert_eq!(config, config_);
        assert_eq!(config_.device, Some(Device::Cpu));
        Ok(())
    }
}
