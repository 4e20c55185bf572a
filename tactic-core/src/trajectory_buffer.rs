//! On-policy trajectory buffer with Generalized Advantage Estimation.
//!
//! [`TrajectoryBuffer`] is a fixed-capacity ring of [`Transition`]s in
//! temporal order. After a rollout, [`TrajectoryBuffer::compute_targets`]
//! runs a single backward pass computing GAE(λ) advantages and value targets
//! into two arrays parallel to the ring. Training then draws minibatches with
//! [`TrajectoryBuffer::sample_minibatch`]: the valid indices are shuffled
//! once and cut into chunks of `batch_size`, every chunk is returned once and
//! a fresh permutation is drawn after the last one.
//!
//! Each sampled row carries a window of `history_size` frames ending at the
//! sampled transition, so that a recurrent policy can be warmed up. Frames
//! that belong to an earlier episode are masked.
mod base;
mod config;
mod minibatch;
pub use base::{TrajectoryBuffer, Transition};
pub use config::TrajectoryBufferConfig;
pub use minibatch::{Minibatch, WindowRow};
