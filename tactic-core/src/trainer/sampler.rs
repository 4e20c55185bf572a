//! Experience collection.
use crate::{record::Record, Agent, Env};
use anyhow::Result;

/// Drives one environment with an agent, one decision at a time.
///
/// The sampler keeps the observation of the pending decision and resets
/// the environment when an episode ends. Episodes longer than
/// `max_steps_per_episode` are truncated: the step handed to the agent is
/// flagged `is_truncated`.
pub struct Sampler<E: Env> {
    env: E,
    prev_obs: Option<E::Obs>,
    max_steps_per_episode: Option<usize>,
    episode_steps: usize,
    episode_return: f32,
}

/// Summary of a finished episode.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpisodeSummary {
    /// Sum of rewards.
    pub episode_return: f32,

    /// The number of decisions.
    pub length: usize,
}

impl<E: Env> Sampler<E> {
    /// Creates a sampler.
    pub fn new(env: E, max_steps_per_episode: Option<usize>) -> Self {
        Self {
            env,
            prev_obs: None,
            max_steps_per_episode,
            episode_steps: 0,
            episode_return: 0.0,
        }
    }

    /// Samples an action, steps the environment and pushes the step to the agent.
    ///
    /// Returns the record emitted by the environment and a summary when the
    /// step ended the episode.
    pub fn sample_and_push<A: Agent<E>>(
        &mut self,
        agent: &mut A,
    ) -> Result<(Record, Option<EpisodeSummary>)> {
        let obs = match self.prev_obs.take() {
            Some(obs) => obs,
            None => {
                self.episode_steps = 0;
                self.episode_return = 0.0;
                self.env.reset()?
            }
        };

        let act = agent.sample(&obs)?;
        let (mut step, record) = self.env.step(&act)?;
        self.episode_steps += 1;
        self.episode_return += step.reward;

        if let Some(max_steps) = self.max_steps_per_episode {
            if self.episode_steps >= max_steps && !step.is_done() {
                step.is_truncated = true;
            }
        }

        agent.push_memory(&step)?;

        if step.is_done() {
            let summary = EpisodeSummary {
                episode_return: self.episode_return,
                length: self.episode_steps,
            };
            Ok((record, Some(summary)))
        } else {
            self.prev_obs = Some(step.obs);
            Ok((record, None))
        }
    }
}
