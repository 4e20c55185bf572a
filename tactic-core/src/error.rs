//! Errors in the library.
use thiserror::Error;

/// List of errors.
#[derive(Error, Debug)]
pub enum TacticError {
    /// A precondition on an action or call sequence was violated.
    ///
    /// This signals a bug in the caller and is not retried.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The simulator reached a state the adapter assumes to be impossible.
    #[error("Environment invariant violated: {0}")]
    EnvironmentInvariant(String),

    /// Transient fault of the connection to the simulator process.
    ///
    /// Environment adapters absorb this error by resetting the episode.
    #[error("Simulator connection fault: {0}")]
    SimulatorConnection(String),

    /// Record key error.
    #[error("Record key error: {0}")]
    RecordKeyError(String),

    /// Record value type error.
    #[error("Record value type error: {0}")]
    RecordValueTypeError(String),
}

impl TacticError {
    /// Returns `true` if the error is a simulator connection fault.
    pub fn is_connection_fault(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<TacticError>(),
            Some(TacticError::SimulatorConnection(_))
        )
    }
}
