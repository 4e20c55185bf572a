//! Configuration of [`Trainer`](super::Trainer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`Trainer`](super::Trainer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrainerConfig {
    /// The number of training episodes.
    pub max_episodes: usize,

    /// Interval of optimization in decision steps.
    pub train_every: usize,

    /// Episodes longer than this are truncated.
    pub max_steps_per_episode: Option<usize>,

    /// Interval of evaluation in optimization steps, `0` disables evaluation.
    pub eval_interval: usize,

    /// Interval of saving model parameters in optimization steps, `0` disables saving.
    pub save_interval: usize,

    /// The number of recent episodes averaged in the reported return.
    pub averaging_window: usize,

    /// Interval of flushing records in episodes.
    pub flush_record_interval: usize,

    /// Where to save the trained model.
    pub model_dir: Option<String>,

    /// Name of the map or scenario, used as a subdirectory of `model_dir`.
    pub scenario: String,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        Self {
            max_episodes: 0,
            train_every: 1024,
            max_steps_per_episode: None,
            eval_interval: 0,
            save_interval: 0,
            averaging_window: 100,
            flush_record_interval: 10,
            model_dir: None,
            scenario: "default".to_string(),
        }
    }
}

impl TrainerConfig {
    /// Sets the number of training episodes.
    pub fn max_episodes(mut self, v: usize) -> Self {
        self.max_episodes = v;
        self
    }

    /// Sets the interval of optimization in decision steps.
    pub fn train_every(mut self, v: usize) -> Self {
        self.train_every = v;
        self
    }

    /// Sets the episode length cap.
    pub fn max_steps_per_episode(mut self, v: usize) -> Self {
        self.max_steps_per_episode = Some(v);
        self
    }

    /// Sets the interval of evaluation in optimization steps.
    pub fn eval_interval(mut self, v: usize) -> Self {
        self.eval_interval = v;
        self
    }

    /// Sets the interval of saving in optimization steps.
    pub fn save_interval(mut self, v: usize) -> Self {
        self.save_interval = v;
        self
    }

    /// Sets the number of episodes averaged in the reported return.
    pub fn averaging_window(mut self, v: usize) -> Self {
        self.averaging_window = v;
        self
    }

    /// Sets the interval of flushing records in episodes.
    pub fn flush_record_interval(mut self, v: usize) -> Self {
        self.flush_record_interval = v;
        self
    }

    /// Sets the directory the trained model is saved in.
    pub fn model_dir(mut self, v: impl Into<String>) -> Self {
        self.model_dir = Some(v.into());
        self
    }

    /// Sets the scenario name.
    pub fn scenario(mut self, v: impl Into<String>) -> Self {
        self.scenario = v.into();
        self
    }

    /// Constructs [`TrainerConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrainerConfig`].
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_serde_trainer_config() -> Result<()> {
        let config = TrainerConfig::default()
            .max_episodes(100)
            .train_every(512)
            .max_steps_per_episode(300)
            .eval_interval(10)
            .model_dir("some/directory")
            .scenario("DefeatRoaches");

        let dir = TempDir::new("trainer_config")?;
        let path = dir.path().join("trainer_config.yaml");
        config.save(&path)?;
        let config_ = TrainerConfig::load(&path)?;
        assert_eq!(config, config_);
        Ok(())
    }
}
