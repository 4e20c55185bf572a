//! Interface to the simulator process.
use crate::{PrimitiveCommand, RawObs};
use anyhow::Result;

/// A tick-based simulator.
///
/// Transient faults of the connection to the simulator must be reported as
/// [`TacticError::SimulatorConnection`](tactic_core::error::TacticError::SimulatorConnection)
/// so that the environment adapter can absorb them. Any other error is
/// propagated to the caller.
pub trait Simulator {
    /// Configuration of the simulator.
    type Config: Clone;

    /// Launches the simulator or connects to it.
    fn build(config: &Self::Config, seed: i64) -> Result<Self>
    where
        Self: Sized;

    /// Starts a new episode and returns its first frame.
    fn reset(&mut self) -> Result<RawObs>;

    /// Executes a command for one tick and returns the resulting frame.
    fn step(&mut self, command: &PrimitiveCommand) -> Result<RawObs>;
}
