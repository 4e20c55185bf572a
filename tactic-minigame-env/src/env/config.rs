//! Configuration of [`SimEnv`](super::SimEnv).
use anyhow::Result;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`SimEnv`](super::SimEnv).
///
/// `SC` and `TC` are the configurations of the simulator and of the action
/// translator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimEnvConfig<SC, TC> {
    /// Configuration of the simulator.
    pub simulator: SC,

    /// Configuration of the action translator.
    pub translator: TC,

    /// Maximum number of ticks a single action may take.
    pub max_action_ticks: usize,

    /// Maximum number of helper actions between two decisions.
    pub max_helper_iterations: usize,
}

impl<SC, TC> SimEnvConfig<SC, TC> {
    /// Constructs a configuration with default limits.
    pub fn new(simulator: SC, translator: TC) -> Self {
        Self {
            simulator,
            translator,
            max_action_ticks: 64,
            max_helper_iterations: 32,
        }
    }

    /// Sets the maximum number of ticks of an action.
    pub fn max_action_ticks(mut self, v: usize) -> Self {
        self.max_action_ticks = v;
        self
    }

    /// Sets the maximum number of helper actions between two decisions.
    pub fn max_helper_iterations(mut self, v: usize) -> Self {
        self.max_helper_iterations = v;
        self
    }
}

impl<SC, TC> SimEnvConfig<SC, TC>
where
    SC: Serialize + DeserializeOwned,
    TC: Serialize + DeserializeOwned,
{
    /// Constructs [`SimEnvConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`SimEnvConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BuildMarinesConfig, MinigameActuatorConfig};
    use tempdir::TempDir;

    #[test]
    fn test_serde_sim_env_config() -> Result<()> {
        let dir = TempDir::new("sim_env_config")?;

        let config = SimEnvConfig::new("MoveToBeacon".to_string(), MinigameActuatorConfig::default())
            .max_action_ticks(3);
        let path = dir.path().join("minigame.yaml");
        config.save(&path)?;
        assert_eq!(config, SimEnvConfig::load(&path)?);

        let config = SimEnvConfig::new(0u32, BuildMarinesConfig::default().max_scvs(16))
            .max_helper_iterations(5);
        let path = dir.path().join("build_marines.yaml");
        config.save(&path)?;
        assert_eq!(config, SimEnvConfig::load(&path)?);
        Ok(())
    }
}
