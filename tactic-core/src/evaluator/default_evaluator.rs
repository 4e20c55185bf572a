//! Default implementation of the [`Evaluator`] trait.
use super::Evaluator;
use crate::{record::Record, Agent, Env};
use anyhow::Result;

/// Runs a fixed number of episodes and reports the average return as
/// `"Episode return"`.
///
/// Steps are pushed to the agent so that it can keep its recurrent state in
/// sync with episode boundaries. Agents in evaluation mode do not store them.
pub struct DefaultEvaluator<E: Env> {
    n_episodes: usize,
    env: E,
}

impl<E: Env> Evaluator<E> for DefaultEvaluator<E> {
    fn evaluate<A: Agent<E>>(&mut self, agent: &mut A) -> Result<Record> {
        let mut r_total = 0f32;

        for ix in 0..self.n_episodes {
            let mut prev_obs = self.env.reset_with_index(ix)?;

            loop {
                let act = agent.sample(&prev_obs)?;
                let (step, _) = self.env.step(&act)?;
                r_total += step.reward;
                agent.push_memory(&step)?;
                if step.is_done() {
                    break;
                }
                prev_obs = step.obs;
            }
        }

        Ok(Record::from_scalar(
            "Episode return",
            r_total / self.n_episodes.max(1) as f32,
        ))
    }
}

impl<E: Env> DefaultEvaluator<E> {
    /// Constructs a new [`DefaultEvaluator`].
    ///
    /// * `config` - Configuration of the environment
    /// * `seed` - Random seed for environment initialization
    /// * `n_episodes` - Number of episodes to run during evaluation
    pub fn new(config: &E::Config, seed: i64, n_episodes: usize) -> Result<Self> {
        Ok(Self {
            n_episodes,
            env: E::build(config, seed)?,
        })
    }
}
