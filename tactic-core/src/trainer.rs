//! Train [`Agent`].
mod config;
mod sampler;
use crate::{
    record::{Record, RecordValue::Scalar, Recorder},
    Agent, Env, Evaluator,
};
use anyhow::Result;
pub use config::TrainerConfig;
use log::{info, warn};
pub use sampler::{EpisodeSummary, Sampler};
use std::{
    collections::VecDeque,
    path::{Path, PathBuf},
    time::SystemTime,
};

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Manages the training loop.
///
/// # Training loop
///
/// Collection and training strictly alternate in a single thread:
///
/// 0. Given an agent implementing [`Agent`], a recorder implementing
///    [`Recorder`] and an evaluator implementing [`Evaluator`].
/// 1. Build [`Env`] and wrap it with a [`Sampler`]. Reset the counters
///    `env_steps = 0`, `opt_steps = 0`, `episodes = 0`.
/// 2. Do a decision step with the [`Sampler`]: the agent samples an action,
///    the environment runs until its next decision point and the resulting
///    step is pushed back to the agent.
/// 3. `env_steps += 1`.
/// 4. If `env_steps % train_every == 0`:
///     1. Call [`Agent::train`] and write the returned record.
///     2. `opt_steps += 1`.
///     3. If `opt_steps % eval_interval == 0`, evaluate the agent. The
///        parameters of the best agent so far are saved in
///        `(model_dir)/(scenario)/best`.
///     4. If `opt_steps % save_interval == 0`, the parameters are saved in
///        `(model_dir)/(scenario)/(opt_steps)`.
/// 5. If the step ended an episode, store its return and the average over
///    the last `averaging_window` episodes. Flush the recorder every
///    `flush_record_interval` episodes. Stop after `max_episodes` episodes.
/// 6. Back to step 2.
///
/// ```mermaid
/// graph LR
///     A[Agent]-->|Env::Act|B[Env]
///     B -->|"Step&lt;E: Env&gt;"|A
///     A -->|Record|C[Recorder]
/// ```
pub struct Trainer<E: Env> {
    config: TrainerConfig,
    env_config: E::Config,
    seed: i64,
}

impl<E: Env> Trainer<E> {
    /// Constructs a trainer.
    pub fn build(config: TrainerConfig, env_config: E::Config) -> Self {
        Self {
            config,
            env_config,
            seed: 0,
        }
    }

    /// Sets the seed given to the training environment.
    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = seed;
        self
    }

    fn model_base(&self) -> Option<PathBuf> {
        self.config
            .model_dir
            .as_ref()
            .map(|dir| Path::new(dir).join(&self.config.scenario))
    }

    fn save_model<A: Agent<E>>(agent: &A, model_dir: PathBuf) {
        match agent.save_params(&model_dir) {
            Ok(()) => info!("Saved the model in {:?}.", &model_dir),
            Err(e) => warn!("Failed to save model in {:?}: {}", &model_dir, e),
        }
    }

    /// Train the agent.
    pub fn train<A, R, D>(&mut self, agent: &mut A, recorder: &mut R, evaluator: &mut D) -> Result<()>
    where
        A: Agent<E>,
        R: Recorder,
        D: Evaluator<E>,
    {
        let env = E::build(&self.env_config, self.seed)?;
        let mut sampler = Sampler::new(env, self.config.max_steps_per_episode);
        let train_every = self.config.train_every.max(1);
        let window = self.config.averaging_window.max(1);
        let flush_interval = self.config.flush_record_interval.max(1);
        let mut recent_returns = VecDeque::with_capacity(window);
        let mut max_eval_return = f32::MIN;
        let mut env_steps: usize = 0;
        let mut opt_steps: usize = 0;
        let mut episodes: usize = 0;
        agent.train_mode();

        info!(
            "Start training for {} episodes, optimizing every {} steps",
            self.config.max_episodes, train_every
        );

        while episodes < self.config.max_episodes {
            let (record, summary) = sampler.sample_and_push(agent)?;
            env_steps += 1;
            if !record.is_empty() {
                recorder.store(record);
            }

            if env_steps % train_every == 0 {
                let timer = SystemTime::now();
                let mut record = agent.train()?;
                opt_steps += 1;
                record.insert("opt_steps", Scalar(opt_steps as f32));
                record.insert("env_steps", Scalar(env_steps as f32));
                record.insert("opt_time_sec", Scalar(timer.elapsed()?.as_secs_f32()));

                if self.config.eval_interval > 0 && opt_steps % self.config.eval_interval == 0 {
                    info!("Starts evaluation of the trained model");
                    agent.eval_mode();
                    let eval_return = evaluator.evaluate(agent)?.get_scalar("Episode return")?;
                    agent.train_mode();
                    record.insert("eval_return", Scalar(eval_return));

                    if eval_return > max_eval_return {
                        max_eval_return = eval_return;
                        if let Some(base) = self.model_base() {
                            Self::save_model(agent, base.join("best"));
                        }
                    }
                }

                if self.config.save_interval > 0 && opt_steps % self.config.save_interval == 0 {
                    if let Some(base) = self.model_base() {
                        Self::save_model(agent, base.join(format!("{}", opt_steps)));
                    }
                }

                recorder.write(record);
            }

            if let Some(summary) = summary {
                episodes += 1;
                if recent_returns.len() == window {
                    recent_returns.pop_front();
                }
                recent_returns.push_back(summary.episode_return);
                let avg = recent_returns.iter().sum::<f32>() / recent_returns.len() as f32;
                recorder.store(Record::from_slice(&[
                    ("episode_return", Scalar(summary.episode_return)),
                    ("episode_return_avg", Scalar(avg)),
                    ("episode_length", Scalar(summary.length as f32)),
                ]));

                if episodes % flush_interval == 0 {
                    recorder.flush(episodes as _);
                }
            }
        }

        recorder.flush(episodes as _);
        info!(
            "Finished training: {} episodes, {} decisions, {} optimization steps",
            episodes, env_steps, opt_steps
        );

        Ok(())
    }
}
