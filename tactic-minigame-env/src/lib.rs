//! Real-time strategy minigame environments for tactic.
//!
//! A [`Simulator`] executes one [`PrimitiveCommand`] per tick. An
//! [`ActionTranslator`] turns the high-level actions of a scenario into
//! those commands, possibly over several ticks, and [`SimEnv`] combines both
//! into an [`Env`](tactic_core::Env) whose steps are the decision points of
//! the agent.
//!
//! Two scenario families are provided:
//!
//! * [`MinigameActuator`]: single-tick selection, movement and attack actions
//!   of the combat and navigation minigames.
//! * [`BuildMarinesActuator`]: multi-step economy actions of BuildMarines,
//!   some of which carry a screen position.
//!
//! ```
//! use anyhow::Result;
//! use tactic_core::Env as _;
//! use tactic_minigame_env::{
//!     util::{ScriptedSimulator, ScriptedSimulatorConfig},
//!     MinigameAction, MinigameActuatorConfig, MinigameEnv, RawObs, SimEnvConfig,
//! };
//!
//! fn main() -> Result<()> {
//!     let mut frame = RawObs::empty(16);
//!     frame.layers.friendly_density[[4, 4]] = 1.0;
//!     frame.layers.selected[[4, 4]] = 1.0;
//!     let sim_config = ScriptedSimulatorConfig::new(vec![frame]);
//!     let config = SimEnvConfig::new(sim_config, MinigameActuatorConfig::default());
//!
//!     let mut env = MinigameEnv::<ScriptedSimulator>::build(&config, 0)?;
//!     let obs = env.reset()?;
//!     assert!(obs.avail[2]);
//!     let (step, _) = env.step(&MinigameAction::NoOp)?;
//!     assert_eq!(step.info.ticks, 1);
//!     Ok(())
//! }
//! ```
mod command;
mod env;
pub mod obs;
mod simulator;
mod translator;
pub mod util;
pub use command::{PrimitiveCommand, ScreenPoint};
pub use env::{BuildMarinesEnv, MinigameEnv, SimEnv, SimEnvConfig, SimEnvInfo};
pub use obs::{MinigameObs, PlayerStats, RawObs, ScreenLayers};
pub use simulator::Simulator;
pub use translator::{
    centroid, clamp_to_screen, closest_cell, first_unit_cell, weakest_cell, ActionTranslator,
    BuildMarinesAction, BuildMarinesActuator, BuildMarinesConfig, Direction, MinigameAction,
    MinigameActuator, MinigameActuatorConfig,
};
