//! Configuration of [`TrajectoryBuffer`](super::TrajectoryBuffer).
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{
    default::Default,
    fs::File,
    io::{BufReader, Write},
    path::Path,
};

/// Configuration of [`TrajectoryBuffer`](super::TrajectoryBuffer).
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct TrajectoryBufferConfig {
    /// The maximum number of transitions held.
    pub capacity: usize,

    /// The number of rows in a minibatch.
    pub batch_size: usize,

    /// The number of frames in a window, including the sampled one.
    pub history_size: usize,

    /// Seed of the random number generator shuffling indices.
    pub seed: u64,
}

impl Default for TrajectoryBufferConfig {
    fn default() -> Self {
        Self {
            capacity: 1024,
            batch_size: 32,
            history_size: 8,
            seed: 42,
        }
    }
}

impl TrajectoryBufferConfig {
    /// Sets the capacity of the buffer.
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the minibatch size.
    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Sets the length of the history window.
    pub fn history_size(mut self, history_size: usize) -> Self {
        self.history_size = history_size;
        self
    }

    /// Sets the random seed.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Constructs [`TrajectoryBufferConfig`] from YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let rdr = BufReader::new(file);
        let b = serde_yaml::from_reader(rdr)?;
        Ok(b)
    }

    /// Saves [`TrajectoryBufferConfig`] as a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut file = File::create(path)?;
        file.write_all(serde_yaml::to_string(&self)?.as_bytes())?;
        Ok(())
    }
}
