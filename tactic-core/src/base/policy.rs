//! Policy.
use super::Env;
use anyhow::Result;
use log::info;
use serde::de::DeserializeOwned;
use std::{fs::File, io::BufReader, path::Path};

/// Maps an observation at a decision point to an action.
pub trait Policy<E: Env> {
    /// Chooses an action for `obs`.
    ///
    /// Stateful policies, e.g. recurrent ones, advance their state here.
    fn sample(&mut self, obs: &E::Obs) -> Result<E::Act>;
}

/// An object built from a serializable configuration.
pub trait Configurable<E: Env> {
    /// Configuration.
    type Config: Clone + DeserializeOwned;

    /// Builds the object.
    fn build(config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Builds the object from the YAML configuration at `path`.
    fn build_from_path(path: impl AsRef<Path>) -> Result<Self>
    where
        Self: Sized,
    {
        let rdr = BufReader::new(File::open(&path)?);
        let config = serde_yaml::from_reader(rdr)?;
        info!("Build from configuration {:?}", path.as_ref());
        Self::build(config)
    }
}
