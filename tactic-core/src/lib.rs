#![warn(missing_docs)]
//! Core of tactic, an on-policy reinforcement learning harness for
//! real-time strategy minigames.
//!
//! * [`Env`], [`Policy`] and [`Agent`] describe the interaction between an
//!   environment with decision points and an on-policy agent.
//! * [`trajectory_buffer`] stores rollouts and computes GAE targets.
//! * [`action_space`] describes structured actions with spatial sub-choices.
//! * [`Trainer`] runs the collect-then-train loop.
pub mod action_space;
pub mod error;
pub mod record;
pub mod trajectory_buffer;

mod base;
pub use base::{Act, Agent, Configurable, Env, ExperienceBufferBase, Info, Obs, Policy, Step};

mod evaluator;
pub use evaluator::{DefaultEvaluator, Evaluator};

mod trainer;
pub use trainer::{EpisodeSummary, Sampler, Trainer, TrainerConfig};
