//! A simulator replaying scripted frames.
use crate::{PrimitiveCommand, RawObs, Simulator};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tactic_core::error::TacticError;

/// Configuration of [`ScriptedSimulator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptedSimulatorConfig {
    /// Frames of an episode. [`Simulator::reset`] returns the first one and
    /// every tick advances by one, repeating the last frame at the end.
    pub frames: Vec<RawObs>,

    /// Ticks, counted from construction, on which a connection fault is raised.
    pub faults_at: Vec<usize>,
}

impl ScriptedSimulatorConfig {
    /// Constructs a configuration replaying the given frames.
    pub fn new(frames: Vec<RawObs>) -> Self {
        Self {
            frames,
            faults_at: vec![],
        }
    }

    /// Raises a connection fault on the given tick.
    pub fn fault_at(mut self, tick: usize) -> Self {
        self.faults_at.push(tick);
        self
    }
}

/// A [`Simulator`] replaying scripted frames and recording received commands.
pub struct ScriptedSimulator {
    config: ScriptedSimulatorConfig,
    cursor: usize,
    ticks: usize,
    resets: usize,
    commands: Vec<PrimitiveCommand>,
}

impl ScriptedSimulator {
    /// Commands received since construction.
    pub fn commands(&self) -> &[PrimitiveCommand] {
        &self.commands
    }

    /// The number of resets since construction.
    pub fn resets(&self) -> usize {
        self.resets
    }

    fn frame(&self) -> Result<RawObs> {
        let last = self.config.frames.len().saturating_sub(1);
        self.config
            .frames
            .get(self.cursor.min(last))
            .cloned()
            .ok_or_else(|| TacticError::InvalidState("no frames are scripted".into()).into())
    }
}

impl Simulator for ScriptedSimulator {
    type Config = ScriptedSimulatorConfig;

    fn build(config: &Self::Config, _seed: i64) -> Result<Self> {
        Ok(Self {
            config: config.clone(),
            cursor: 0,
            ticks: 0,
            resets: 0,
            commands: vec![],
        })
    }

    fn reset(&mut self) -> Result<RawObs> {
        self.cursor = 0;
        self.resets += 1;
        self.frame()
    }

    fn step(&mut self, command: &PrimitiveCommand) -> Result<RawObs> {
        let tick = self.ticks;
        self.ticks += 1;
        if self.config.faults_at.contains(&tick) {
            return Err(TacticError::SimulatorConnection(format!("lost connection on tick {}", tick)).into());
        }
        self.commands.push(*command);
        self.cursor += 1;
        self.frame()
    }
}
