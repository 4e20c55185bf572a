//! Evaluation of agents.
use crate::{record::Record, Agent, Env};
use anyhow::Result;
mod default_evaluator;
pub use default_evaluator::DefaultEvaluator;

/// Runs evaluation episodes with an agent.
pub trait Evaluator<E: Env> {
    /// Runs the episodes and returns a record holding at least
    /// `"Episode return"`.
    ///
    /// The agent is expected to be in evaluation mode already; switching
    /// modes is left to the caller.
    fn evaluate<A: Agent<E>>(&mut self, agent: &mut A) -> Result<Record>;
}
