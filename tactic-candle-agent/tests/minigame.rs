use anyhow::Result;
use tactic_candle_agent::{
    ppo::{prev_action_dim, Ppo, PpoConfig},
    recurrent_mlp::{RecurrentMlp, RecurrentMlpConfig},
};
use tactic_core::{
    record::BufferedRecorder, trajectory_buffer::TrajectoryBufferConfig, Agent, Configurable,
    DefaultEvaluator, ExperienceBufferBase, Trainer, TrainerConfig,
};
use tactic_minigame_env::{
    obs::feature_dim,
    util::{ScriptedSimulator, ScriptedSimulatorConfig},
    ActionTranslator, MinigameActuator, MinigameActuatorConfig, MinigameEnv, RawObs,
    SimEnvConfig,
};
use test_log::test;

const SCREEN: usize = 8;

type Env = MinigameEnv<ScriptedSimulator>;

/// Two decisions per episode with a selected marine in the middle of the
/// screen, reward on the last frame.
fn env_config() -> SimEnvConfig<ScriptedSimulatorConfig, MinigameActuatorConfig> {
    let mut frame = RawObs::empty(SCREEN);
    frame.layers.friendly_density[[4, 4]] = 1.0;
    frame.layers.selected[[4, 4]] = 1.0;
    let mut last = frame.clone();
    last.reward = 1.0;
    last.is_last = true;

    let sim = ScriptedSimulatorConfig::new(vec![frame.clone(), frame, last]);
    SimEnvConfig::new(sim, MinigameActuatorConfig::default())
}

#[test]
fn test_ppo_on_scripted_minigame() -> Result<()> {
    let space = MinigameActuator::build(&MinigameActuatorConfig::default()).action_space();
    let in_dim = feature_dim(SCREEN) + prev_action_dim(&space);
    let config = PpoConfig::default()
        .model_config(RecurrentMlpConfig::new(in_dim, vec![32], 16, space.n_base))
        .buffer_config(
            TrajectoryBufferConfig::default()
                .capacity(16)
                .batch_size(2)
                .history_size(4),
        )
        .action_space(space)
        .epochs(1)
        .device(candle_core::Device::Cpu);
    let mut agent = Ppo::<Env, RecurrentMlp>::build(config)?;

    let trainer_config = TrainerConfig::default()
        .max_episodes(4)
        .train_every(4)
        .eval_interval(2);
    let mut trainer = Trainer::<Env>::build(trainer_config, env_config());
    let mut recorder = BufferedRecorder::new();
    let mut evaluator = DefaultEvaluator::<Env>::new(&env_config(), 0, 1)?;

    trainer.train(&mut agent, &mut recorder, &mut evaluator)?;

    assert_eq!(agent.frame_count(), 8);
    assert_eq!(agent.n_opts(), 2);
    assert_eq!(agent.buffer().len(), 8);
    assert!(!recorder.is_empty());
    Ok(())
}
