//! Environment.
use super::{Act, Info, Obs, Step};
use crate::record::Record;
use anyhow::Result;

/// Represents an environment with decision points, typically an MDP.
///
/// One call of [`Env::step`] may advance the underlying simulator by any
/// number of ticks. It returns when the next decision of the agent is
/// required, with the reward accumulated over those ticks.
pub trait Env {
    /// Configurations.
    type Config: Clone;

    /// Observation of the environment.
    type Obs: Obs;

    /// Action of the environment.
    type Act: Act;

    /// Information in the [`Step`] object.
    type Info: Info;

    /// Builds an environment with a given random seed.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Performes an environment step until the next decision point.
    fn step(&mut self, a: &Self::Act) -> Result<(Step<Self>, Record)>
    where
        Self: Sized;

    /// Resets the environment and returns the initial observation.
    fn reset(&mut self) -> Result<Self::Obs>;

    /// Resets the environment with a given index.
    ///
    /// The index is used in an arbitrary way, for example as a random seed
    /// of an evaluation episode. The default implementation ignores it.
    fn reset_with_index(&mut self, ix: usize) -> Result<Self::Obs> {
        let _ = ix;
        self.reset()
    }
}
