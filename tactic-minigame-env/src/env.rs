//! Environment adapter driving a [`Simulator`] with an [`ActionTranslator`].
mod config;
use crate::{
    ActionTranslator, BuildMarinesActuator, MinigameActuator, MinigameObs, PrimitiveCommand,
    RawObs, Simulator,
};
use anyhow::Result;
pub use config::SimEnvConfig;
use log::{debug, trace, warn};
use tactic_core::{
    error::TacticError,
    record::{Record, RecordValue},
    Env, Info, Step,
};

/// Information attached to every [`Step`] of [`SimEnv`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimEnvInfo {
    /// Simulator ticks since the previous decision point.
    pub ticks: usize,

    /// Connection faults absorbed since the previous decision point.
    pub connection_faults: usize,
}

impl Info for SimEnvInfo {}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// Turns a tick-based simulator into an environment with decision points.
///
/// ```mermaid
/// flowchart LR
///   A([agent action])-->B[translator]
///   B-->|command|C[simulator tick]
///   C-->D{translator idle?}
///   D-->|no|B
///   D-->|yes|E{helper action?}
///   E-->|yes|B
///   E-->|no|F([decision point])
/// ```
///
/// A call of [`Env::step`] runs the action of the agent until the translator
/// is idle, then runs helper actions until none applies, and returns the
/// reward summed over all ticks. Termination in the middle of a multi-step
/// action discards the rest of the action.
///
/// A [`TacticError::SimulatorConnection`] raised by the simulator is absorbed:
/// the simulator and the translator are reset and the step is reported as
/// truncated. The fresh observation of that step is the first observation of
/// the next episode, so the following [`Env::reset`] does not reset again.
pub struct SimEnv<S, T> {
    sim: S,
    translator: T,
    max_action_ticks: usize,
    max_helper_iterations: usize,
    prev: Option<RawObs>,
    curr: Option<RawObs>,
    terminal: bool,
    reward: f32,
    ticks: usize,
    faults: usize,
    reset_pending_fault: bool,
    total_faults: usize,
}

/// Environment of the combat and navigation minigames.
pub type MinigameEnv<S> = SimEnv<S, MinigameActuator>;

/// Environment of the BuildMarines minigame.
pub type BuildMarinesEnv<S> = SimEnv<S, BuildMarinesActuator>;

fn current(curr: &Option<RawObs>) -> Result<&RawObs> {
    curr.as_ref()
        .ok_or_else(|| TacticError::InvalidState("the environment has not been reset".into()).into())
}

impl<S, T> SimEnv<S, T>
where
    S: Simulator,
    T: ActionTranslator,
{
    /// The simulator.
    pub fn simulator(&self) -> &S {
        &self.sim
    }

    /// The action translator.
    pub fn translator(&self) -> &T {
        &self.translator
    }

    /// The number of connection faults absorbed since construction.
    pub fn total_connection_faults(&self) -> usize {
        self.total_faults
    }

    fn observe(&mut self, obs: RawObs) -> Result<()> {
        self.reward += obs.reward;
        self.terminal = obs.is_last;
        if !self.terminal {
            self.translator.check_invariants(&obs)?;
        }
        self.prev = self.curr.replace(obs);
        Ok(())
    }

    fn restart(&mut self) -> Result<()> {
        self.translator.reset();
        self.prev = None;
        self.curr = None;
        let obs = self.sim.reset()?;
        self.observe(obs)
    }

    /// Advances the simulator by a tick, absorbing connection faults.
    fn tick(&mut self, command: PrimitiveCommand) -> Result<()> {
        trace!("tick {}: {:?}", self.ticks, command);
        self.ticks += 1;
        match self.sim.step(&command) {
            Ok(obs) => self.observe(obs),
            Err(e) if TacticError::is_connection_fault(&e) => {
                warn!("{}, starting a new episode", e);
                self.faults += 1;
                self.total_faults += 1;
                self.reset_pending_fault = true;
                self.restart()
            }
            Err(e) => Err(e),
        }
    }

    /// Runs an action until the translator is idle or the episode ends.
    fn run_to_next(&mut self, action: T::Action) -> Result<()> {
        let command = self
            .translator
            .compute_primitive(action, current(&self.curr)?)?;
        self.tick(command)?;
        let mut n = 1;

        while !self.translator.is_idle() {
            if self.terminal {
                break;
            }
            if n >= self.max_action_ticks {
                return Err(TacticError::EnvironmentInvariant(format!(
                    "{:?} did not complete within {} ticks",
                    action, n
                ))
                .into());
            }
            let command = self
                .translator
                .compute_primitive(action, current(&self.curr)?)?;
            self.tick(command)?;
            n += 1;
        }

        if self.terminal {
            self.translator.discard_in_progress();
        }
        Ok(())
    }

    /// Runs helper actions until none applies or the episode ends.
    fn run_helpers(&mut self) -> Result<()> {
        let mut n = 0;
        while !self.terminal {
            let action = match self.translator.helper_action(current(&self.curr)?) {
                Some(action) => action,
                None => break,
            };
            if n >= self.max_helper_iterations {
                return Err(TacticError::EnvironmentInvariant(format!(
                    "helper actions did not settle within {} iterations",
                    n
                ))
                .into());
            }
            debug!("helper action {:?}", action);
            self.run_to_next(action)?;
            n += 1;
        }
        Ok(())
    }

    fn observation(&self) -> Result<MinigameObs> {
        let curr = current(&self.curr)?;
        let prev = self.prev.as_ref().unwrap_or(curr);
        Ok(MinigameObs {
            prev: prev.layers.clone(),
            curr: curr.layers.clone(),
            player: curr.player.clone(),
            avail: self.translator.available_actions(curr),
        })
    }
}

impl<S, T> Env for SimEnv<S, T>
where
    S: Simulator,
    T: ActionTranslator,
{
    type Config = SimEnvConfig<S::Config, T::Config>;
    type Obs = MinigameObs;
    type Act = T::Action;
    type Info = SimEnvInfo;

    fn build(config: &Self::Config, seed: i64) -> Result<Self> {
        Ok(Self {
            sim: S::build(&config.simulator, seed)?,
            translator: T::build(&config.translator),
            max_action_ticks: config.max_action_ticks,
            max_helper_iterations: config.max_helper_iterations,
            prev: None,
            curr: None,
            terminal: false,
            reward: 0.0,
            ticks: 0,
            faults: 0,
            reset_pending_fault: false,
            total_faults: 0,
        })
    }

    fn reset(&mut self) -> Result<MinigameObs> {
        if self.reset_pending_fault {
            self.reset_pending_fault = false;
            return self.observation();
        }
        self.reward = 0.0;
        self.restart()?;
        self.run_helpers()?;
        self.observation()
    }

    fn step(&mut self, a: &T::Action) -> Result<(Step<Self>, Record)> {
        if self.terminal {
            return Err(TacticError::InvalidState(
                "the episode has terminated, reset the environment".into(),
            )
            .into());
        }
        self.reset_pending_fault = false;
        self.reward = 0.0;
        self.ticks = 0;
        self.faults = 0;

        self.run_to_next(*a)?;
        self.run_helpers()?;

        let info = SimEnvInfo {
            ticks: self.ticks,
            connection_faults: self.faults,
        };
        let mut record = Record::from_scalar("ticks", self.ticks as f32);
        if self.faults > 0 {
            record.insert("connection_faults", RecordValue::Scalar(self.faults as f32));
        }
        let step = Step::new(
            self.observation()?,
            *a,
            self.reward,
            self.terminal && self.faults == 0,
            self.faults > 0,
            info,
        );
        Ok((step, record))
    }
}
