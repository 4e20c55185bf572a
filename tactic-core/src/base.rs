//! Core functionalities.
mod agent;
mod buffer;
mod env;
mod policy;
mod step;
pub use agent::Agent;
pub use buffer::ExperienceBufferBase;
pub use env::Env;
pub use policy::{Configurable, Policy};
use std::fmt::Debug;
pub use step::{Info, Step};

/// An observation of an environment at a decision point.
///
/// The agent only needs a flat feature vector and the mask of legal
/// base actions; how the environment builds them is up to the environment.
pub trait Obs: Clone + Debug {
    /// Returns the observation as a flat feature vector.
    ///
    /// The length must be the same for every observation of an environment.
    fn features(&self) -> Vec<f32>;

    /// Returns the mask of base actions that are legal in this observation.
    fn avail_actions(&self) -> Vec<bool>;
}

/// An action of an environment.
pub trait Act: Clone + Debug {}
