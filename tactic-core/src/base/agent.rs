//! Agent.
use super::{Env, Policy, Step};
use crate::record::Record;
use anyhow::Result;
use std::path::Path;

/// Represents a trainable on-policy agent on an environment.
///
/// The agent owns its experience. The driver loop calls
/// [`Policy::sample`] for an observation, steps the environment with the
/// returned action and hands the resulting [`Step`] back with
/// [`Agent::push_memory`]. Every so often it calls [`Agent::train`].
///
/// Sampling moves the agent from idle to *decided*, pushing the step moves
/// it back to idle. Pushing while idle is an error.
pub trait Agent<E: Env>: Policy<E> {
    /// Set the policy to training mode.
    fn train_mode(&mut self);

    /// Set the policy to evaluation mode.
    fn eval_mode(&mut self);

    /// Return if it is in training mode.
    fn is_train(&self) -> bool;

    /// Stores the outcome of the last sampled action.
    fn push_memory(&mut self, step: &Step<E>) -> Result<()>;

    /// Runs an optimization over the collected experience and returns
    /// some information about it.
    fn train(&mut self) -> Result<Record>;

    /// Save the parameters of the agent in the given directory.
    fn save_params(&self, path: &Path) -> Result<()>;

    /// Load the parameters of the agent from the given directory.
    fn load_params(&mut self, path: &Path) -> Result<()>;
}
