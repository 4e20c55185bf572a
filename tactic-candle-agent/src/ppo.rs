//! PPO agent with a recurrent policy.
mod base;
mod config;
mod loss;
mod model;
pub use base::{prev_action_dim, Decision, Ppo};
pub use config::PpoConfig;
pub use loss::{clipped_surrogate, composite_log_prob, entropy, normalize_advantages};
pub use model::PpoModel;
