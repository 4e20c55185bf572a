//! Utilities for testing environments without a simulator process.
mod scripted;
pub use scripted::{ScriptedSimulator, ScriptedSimulatorConfig};
