use anyhow::Result;
use tactic_core::{error::TacticError, Env};
use tactic_minigame_env::{
    obs::unit_type,
    util::{ScriptedSimulator, ScriptedSimulatorConfig},
    BuildMarinesAction, BuildMarinesConfig, BuildMarinesEnv, MinigameAction,
    MinigameActuatorConfig, MinigameEnv, PrimitiveCommand, RawObs, ScreenPoint, SimEnvConfig,
};
use test_log::test;

fn unit_frame(selected: bool) -> RawObs {
    let mut obs = RawObs::empty(16);
    obs.layers.friendly_density[[8, 8]] = 1.0;
    if selected {
        obs.layers.selected[[8, 8]] = 1.0;
    }
    obs
}

fn economy_frame(minerals: u32, reward: f32) -> RawObs {
    let mut obs = RawObs::empty(16);
    obs.layers.unit_type[[2, 2]] = unit_type::COMMAND_CENTER;
    obs.layers.unit_type[[5, 6]] = unit_type::SCV;
    obs.player.minerals = minerals;
    obs.player.food_used = 12;
    obs.player.food_cap = 15;
    obs.reward = reward;
    obs
}

fn minigame_env(
    sim_config: ScriptedSimulatorConfig,
    max_helper_iterations: usize,
) -> Result<MinigameEnv<ScriptedSimulator>> {
    let config = SimEnvConfig::new(sim_config, MinigameActuatorConfig::default())
        .max_helper_iterations(max_helper_iterations);
    MinigameEnv::build(&config, 0)
}

fn build_marines_env(
    frames: Vec<RawObs>,
    translator: BuildMarinesConfig,
    max_action_ticks: usize,
) -> Result<BuildMarinesEnv<ScriptedSimulator>> {
    let config = SimEnvConfig::new(ScriptedSimulatorConfig::new(frames), translator)
        .max_action_ticks(max_action_ticks);
    BuildMarinesEnv::build(&config, 0)
}

fn is_invariant_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<TacticError>(),
        Some(TacticError::EnvironmentInvariant(_))
    )
}

#[test]
fn test_helper_selects_units_before_decision() -> Result<()> {
    let frames = vec![unit_frame(false), unit_frame(true)];
    let mut env = minigame_env(ScriptedSimulatorConfig::new(frames), 4)?;

    let obs = env.reset()?;
    assert_eq!(env.simulator().commands(), &[PrimitiveCommand::SelectArmy]);
    assert!(obs.curr.has_selection());
    assert!(!obs.prev.has_selection());
    assert!(!obs.avail[1]);
    Ok(())
}

#[test]
fn test_multi_step_action_accumulates_reward() -> Result<()> {
    let frames = vec![
        economy_frame(200, 0.0),
        economy_frame(200, 0.0),
        economy_frame(200, 1.0),
        economy_frame(100, 2.0),
        economy_frame(100, 0.0),
    ];
    let translator = BuildMarinesConfig::default().screen_size(16).helpers(false);
    let mut env = build_marines_env(frames, translator, 16)?;
    env.reset()?;

    let target = ScreenPoint::new(9, 9);
    let (step, record) = env.step(&BuildMarinesAction::BuildSupplyDepot(target))?;
    assert_eq!(step.reward, 3.0);
    assert_eq!(step.info.ticks, 4);
    assert_eq!(record.get_scalar("ticks")?, 4.0);
    assert!(!step.is_done());
    assert_eq!(
        env.simulator().commands(),
        &[
            PrimitiveCommand::SelectPoint(ScreenPoint::new(6, 5)),
            PrimitiveCommand::BuildSupplyDepot(target),
            PrimitiveCommand::NoOp,
            PrimitiveCommand::NoOp,
        ]
    );
    Ok(())
}

#[test]
fn test_termination_discards_action_in_progress() -> Result<()> {
    let mut last = economy_frame(200, 1.0);
    last.is_last = true;
    let frames = vec![economy_frame(200, 0.0), last];
    let translator = BuildMarinesConfig::default().screen_size(16).helpers(false);
    let mut env = build_marines_env(frames, translator, 16)?;
    env.reset()?;

    let (step, _) = env.step(&BuildMarinesAction::MakeScv)?;
    assert!(step.is_terminated);
    assert!(!step.is_truncated);
    assert_eq!(step.info.ticks, 1);
    assert_eq!(step.reward, 1.0);
    assert!(tactic_minigame_env::ActionTranslator::is_idle(env.translator()));

    let err = env.step(&BuildMarinesAction::NoOp).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<TacticError>(),
        Some(TacticError::InvalidState(_))
    ));
    Ok(())
}

#[test]
fn test_connection_fault_truncates_episode() -> Result<()> {
    let frames = vec![unit_frame(true)];
    let mut env = minigame_env(ScriptedSimulatorConfig::new(frames).fault_at(1), 4)?;
    env.reset()?;
    assert_eq!(env.simulator().resets(), 1);

    let (step, _) = env.step(&MinigameAction::NoOp)?;
    assert!(!step.is_done());

    let (step, record) = env.step(&MinigameAction::NoOp)?;
    assert!(step.is_truncated);
    assert!(!step.is_terminated);
    assert_eq!(step.info.connection_faults, 1);
    assert_eq!(record.get_scalar("connection_faults")?, 1.0);
    assert_eq!(env.simulator().resets(), 2);

    // the fresh observation is reused instead of resetting again
    env.reset()?;
    assert_eq!(env.simulator().resets(), 2);
    assert_eq!(env.total_connection_faults(), 1);

    let (step, _) = env.step(&MinigameAction::NoOp)?;
    assert!(!step.is_done());
    Ok(())
}

#[test]
fn test_helper_loop_is_bounded() -> Result<()> {
    // the selection never shows up, so the helper keeps firing
    let frames = vec![unit_frame(false)];
    let mut env = minigame_env(ScriptedSimulatorConfig::new(frames), 3)?;
    let err = env.reset().err().unwrap();
    assert!(is_invariant_violation(&err));
    assert_eq!(env.simulator().commands().len(), 3);
    Ok(())
}

#[test]
fn test_action_ticks_are_bounded() -> Result<()> {
    let frames = vec![economy_frame(200, 0.0)];
    let translator = BuildMarinesConfig::default()
        .screen_size(16)
        .helpers(false)
        .max_wait_ticks(100);
    let mut env = build_marines_env(frames, translator, 3)?;
    env.reset()?;

    let err = env.step(&BuildMarinesAction::MakeScv).err().unwrap();
    assert!(is_invariant_violation(&err));
    assert_eq!(env.simulator().commands().len(), 3);
    Ok(())
}

#[test]
fn test_missing_friendly_units_violate_invariant() -> Result<()> {
    let frames = vec![unit_frame(true), RawObs::empty(16)];
    let mut env = minigame_env(ScriptedSimulatorConfig::new(frames), 4)?;
    env.reset()?;
    let err = env.step(&MinigameAction::NoOp).err().unwrap();
    assert!(is_invariant_violation(&err));
    Ok(())
}

#[test]
fn test_invalid_action_is_rejected() -> Result<()> {
    let frames = vec![unit_frame(true)];
    let mut env = minigame_env(ScriptedSimulatorConfig::new(frames), 4)?;
    env.reset()?;
    let err = env.step(&MinigameAction::AttackClosest).err().unwrap();
    assert!(matches!(
        err.downcast_ref::<TacticError>(),
        Some(TacticError::InvalidState(_))
    ));
    assert!(env.simulator().commands().is_empty());
    Ok(())
}
