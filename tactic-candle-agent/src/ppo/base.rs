//! PPO agent implemented with candle.
use super::{
    config::PpoConfig,
    loss::{clipped_surrogate, composite_log_prob, entropy, normalize_advantages},
    model::PpoModel,
};
use crate::model::{PolicyOutput, RecurrentPolicy, WindowInput};
use anyhow::{Context, Result};
use candle_core::{DType, Device, IndexOp, Tensor};
use candle_nn::loss::mse;
use itertools::Itertools;
use log::{debug, info};
use rand::{
    distributions::{Distribution, WeightedIndex},
    rngs::SmallRng,
    Rng, SeedableRng,
};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, marker::PhantomData, path::Path};
use tactic_core::{
    action_space::{ActionSpace, CompositeAction},
    error::TacticError,
    record::{Record, RecordValue},
    trajectory_buffer::{Minibatch, TrajectoryBuffer, Transition, WindowRow},
    Agent, Configurable, Env, ExperienceBufferBase, Obs, Policy, Step,
};

/// What the agent stores of an observation at a decision.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Features of the observation.
    pub features: Vec<f32>,

    /// Mask of available base actions.
    pub avail: Vec<bool>,

    /// Encoding of the previous action in the episode, see [`prev_action_dim`].
    pub prev_act: Vec<f32>,

    /// Recurrent state before this decision was made.
    pub hidden: Vec<f32>,
}

/// Dimension of the previous-action encoding appended to every frame.
///
/// One-hot base action followed by the normalized `(x, y)` of both spatial
/// sub-choices.
pub fn prev_action_dim(space: &ActionSpace) -> usize {
    space.n_base + 4
}

fn encode_prev_act(prev: Option<&CompositeAction>, space: &ActionSpace) -> Vec<f32> {
    let mut v = vec![0f32; prev_action_dim(space)];
    if let Some(act) = prev {
        if act.base < space.n_base {
            v[act.base] = 1.0;
        }
        let w = space.spatial_width.max(1) as f32;
        for (k, cell) in act.spatial.iter().enumerate() {
            if let Some((x, y)) = cell {
                v[space.n_base + 2 * k] = *x as f32 / w;
                v[space.n_base + 2 * k + 1] = *y as f32 / w;
            }
        }
    }
    v
}

// A sampled action waiting for its outcome
struct Pending {
    decision: Decision,
    act: CompositeAction,
    value: f32,
    starts_episode: bool,
}

// Recurrent state carried between decisions of an episode
struct RecurrentContext {
    hidden: Option<Tensor>,
    prev_act: Option<CompositeAction>,
    episode_start: bool,
    step_index: usize,
    next_obs: Option<(Vec<f32>, Vec<bool>)>,
}

impl RecurrentContext {
    fn fresh() -> Self {
        Self {
            hidden: None,
            prev_act: None,
            episode_start: true,
            step_index: 0,
            next_obs: None,
        }
    }
}

#[derive(Default)]
struct UpdateStats {
    loss_policy: f32,
    loss_value: f32,
    entropy: f32,
    ratio: f32,
}

#[cfg_attr(doc, aquamarine::aquamarine)]
/// PPO agent with a recurrent policy.
///
/// ```mermaid
/// stateDiagram-v2
///     Idle --> Decided: sample
///     Decided --> Idle: push_memory
///     Idle --> Idle: train
/// ```
///
/// Collected transitions go into a [`TrajectoryBuffer`]. A training call
/// computes GAE targets, runs `epochs` passes of minibatch updates against
/// a frozen target network and then copies the live parameters into the
/// target network once.
///
/// Switching to evaluation mode sets the recurrent state of the ongoing
/// training episode aside; switching back restores it.
pub struct Ppo<E, P>
where
    E: Env,
    P: RecurrentPolicy,
{
    model: PpoModel<P>,
    model_tgt: PpoModel<P>,
    buffer: TrajectoryBuffer<Decision, CompositeAction>,
    action_space: ActionSpace,
    discount_factor: f32,
    gae_lambda: f32,
    eps_denom: f64,
    value_coef: f64,
    entropy_coef: f64,
    spatial_entropy_coef: f64,
    base_entropy_coef: f64,
    clip_ratio: f64,
    epochs: usize,
    epsilon_max: f32,
    epsilon_min: f32,
    epsilon_duration: usize,
    train: bool,
    ctx: RecurrentContext,
    stashed_ctx: Option<RecurrentContext>,
    pending: Option<Pending>,
    frame_count: usize,
    epochs_trained: usize,
    n_opts: usize,
    rng: SmallRng,
    phantom: PhantomData<E>,
}

impl<E, P> Ppo<E, P>
where
    E: Env,
    P: RecurrentPolicy,
    E::Act: From<CompositeAction>,
{
    /// The number of decisions sampled in training mode.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    /// The number of passes over the buffer run so far.
    pub fn epochs_trained(&self) -> usize {
        self.epochs_trained
    }

    /// The number of training calls.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Buffer of collected transitions.
    pub fn buffer(&self) -> &TrajectoryBuffer<Decision, CompositeAction> {
        &self.buffer
    }

    /// Exploration rate at the current frame count.
    pub fn epsilon(&self) -> f32 {
        let frac = match self.epsilon_duration {
            0 => 1.0,
            d => (self.frame_count as f32 / d as f32).min(1.0),
        };
        self.epsilon_max - (self.epsilon_max - self.epsilon_min) * frac
    }

    /// Evaluates the importance ratio of live and target networks on a
    /// minibatch without updating anything.
    pub fn importance_ratio(
        &self,
        batch: &Minibatch<Decision, CompositeAction>,
    ) -> Result<Vec<f32>> {
        let (input, hidden0) = self.window_input(&batch.rows)?;
        let (_, lp) = self.live_log_prob(&batch.rows, &input, &hidden0)?;
        let lp_old = self.target_log_prob(&batch.rows, &input, &hidden0)?;
        Ok((lp - lp_old)?.exp()?.to_vec1::<f32>()?)
    }

    fn device(&self) -> &Device {
        self.model.device()
    }

    fn frame(&self, features: &[f32], prev_act: &[f32]) -> Vec<f32> {
        let mut v = features.to_vec();
        v.extend_from_slice(prev_act);
        v
    }

    fn check_avail(&self, avail: &[bool]) -> Result<()> {
        if avail.len() != self.action_space.n_base {
            return Err(TacticError::InvalidState(format!(
                "{} available flags for {} base actions",
                avail.len(),
                self.action_space.n_base
            ))
            .into());
        }
        Ok(())
    }

    fn avail_tensor(&self, avail: &[bool], batch: usize) -> Result<Tensor> {
        let v = avail.iter().map(|&a| a as u8 as f32).collect::<Vec<_>>();
        Ok(Tensor::from_vec(v, (batch, self.action_space.n_base), self.device())?)
    }

    // Input of a single decision
    fn single_input(
        &self,
        features: &[f32],
        avail: &[bool],
        prev_act: &[f32],
    ) -> Result<WindowInput> {
        self.check_avail(avail)?;
        let frame = self.frame(features, prev_act);
        let dim = frame.len();
        Ok(WindowInput {
            frames: Tensor::from_vec(frame, (1, 1, dim), self.device())?,
            relevant: Tensor::ones((1, 1), DType::F32, self.device())?,
            avail: self.avail_tensor(avail, 1)?,
        })
    }

    fn current_hidden(&self) -> Result<Tensor> {
        match (&self.ctx.hidden, self.ctx.episode_start) {
            (Some(h), false) => Ok(h.clone()),
            _ => self.model.init_hidden(1),
        }
    }

    fn choose(&mut self, out: &PolicyOutput, avail: &[bool]) -> Result<CompositeAction> {
        let legal = avail
            .iter()
            .enumerate()
            .filter(|(_, a)| **a)
            .map(|(i, _)| i)
            .collect::<Vec<_>>();
        if legal.is_empty() {
            return Err(TacticError::InvalidState("no base action is available".into()).into());
        }

        let base_probs = out.base_probs.i(0)?.to_vec1::<f32>()?;
        let spatial_probs = match &out.spatial_probs {
            Some(p) => Some(p.i(0)?.to_vec2::<f32>()?),
            None => None,
        };
        let explore = self.train && self.rng.gen::<f32>() < self.epsilon();

        let base = if explore {
            legal[self.rng.gen_range(0..legal.len())]
        } else if self.train {
            let weights = base_probs
                .iter()
                .zip(avail.iter())
                .map(|(&p, &a)| if a { p } else { 0.0 });
            WeightedIndex::new(weights)?.sample(&mut self.rng)
        } else {
            legal
                .iter()
                .copied()
                .max_by(|&a, &b| base_probs[a].total_cmp(&base_probs[b]))
                .unwrap_or(legal[0])
        };

        let mut act = CompositeAction::base(base);
        if let Some(probs) = spatial_probs {
            let mask = self.action_space.applicable_mask(base);
            for (k, probs) in probs.iter().enumerate().take(2) {
                if !mask[k] {
                    continue;
                }
                let cell = if explore {
                    self.rng.gen_range(0..probs.len())
                } else if self.train {
                    WeightedIndex::new(probs)?.sample(&mut self.rng)
                } else {
                    probs.iter().position_max_by(|a, b| a.total_cmp(b)).unwrap_or(0)
                };
                act.spatial[k] = Some(self.action_space.cell_to_xy(cell));
            }
        }

        Ok(act)
    }

    fn bootstrap_value(&self) -> Result<f32> {
        match &self.ctx.next_obs {
            None => Ok(0.0),
            Some((features, avail)) => {
                let prev_act = encode_prev_act(self.ctx.prev_act.as_ref(), &self.action_space);
                let input = self.single_input(features, avail, &prev_act)?;
                let out = self.model.forward(&input, &self.current_hidden()?)?;
                Ok(out.value.i(0)?.to_scalar::<f32>()?)
            }
        }
    }

    // Frames of the windows and the hidden state before the first relevant frame
    fn window_input(
        &self,
        rows: &[WindowRow<Decision, CompositeAction>],
    ) -> Result<(WindowInput, Tensor)> {
        let n_rows = rows.len();
        let history = rows.first().map(|r| r.frames.len()).unwrap_or(0);
        let dim = rows
            .first()
            .and_then(|r| r.obs())
            .map(|d| d.features.len() + prev_action_dim(&self.action_space))
            .context("minibatch has no row")?;

        let mut frames = Vec::with_capacity(n_rows * history * dim);
        let mut relevant = Vec::with_capacity(n_rows * history);
        let mut avail = Vec::with_capacity(n_rows * self.action_space.n_base);
        let mut hidden0 = Vec::with_capacity(n_rows * self.model.hidden_dim());

        for row in rows.iter() {
            for frame in row.frames.iter() {
                match frame {
                    Some(d) => {
                        let f = self.frame(&d.features, &d.prev_act);
                        if f.len() != dim {
                            return Err(TacticError::InvalidState(format!(
                                "frame of dimension {} in a batch of dimension {}",
                                f.len(),
                                dim
                            ))
                            .into());
                        }
                        frames.extend(f);
                        relevant.push(1f32);
                    }
                    None => {
                        frames.extend(std::iter::repeat(0f32).take(dim));
                        relevant.push(0f32);
                    }
                }
            }

            let first = row.frames[row.first_relevant()]
                .as_ref()
                .context("window has no relevant frame")?;
            hidden0.extend(first.hidden.iter().copied());

            let last = row.obs().context("window does not end with a frame")?;
            self.check_avail(&last.avail)?;
            avail.extend(last.avail.iter().map(|&a| a as u8 as f32));
        }

        let input = WindowInput {
            frames: Tensor::from_vec(frames, (n_rows, history, dim), self.device())?,
            relevant: Tensor::from_vec(relevant, (n_rows, history), self.device())?,
            avail: Tensor::from_vec(avail, (n_rows, self.action_space.n_base), self.device())?,
        };
        let hidden_dim = self.model.hidden_dim();
        let hidden0 = Tensor::from_vec(hidden0, (n_rows, hidden_dim), self.device())?;
        Ok((input, hidden0))
    }

    // Base actions, chosen cells and applicability of spatial slots
    fn action_tensors(
        &self,
        rows: &[WindowRow<Decision, CompositeAction>],
    ) -> Result<(Tensor, Tensor, Tensor)> {
        let n_rows = rows.len();
        let mut base = Vec::with_capacity(n_rows);
        let mut cells = Vec::with_capacity(2 * n_rows);
        let mut applicable = Vec::with_capacity(2 * n_rows);

        for row in rows.iter() {
            base.push(row.act.base as u32);
            let mask = self.action_space.applicable_mask(row.act.base);
            for k in 0..2 {
                match (mask[k], row.act.spatial[k]) {
                    (true, Some((x, y))) => {
                        cells.push(self.action_space.xy_to_cell(x, y) as u32);
                        applicable.push(1f32);
                    }
                    _ => {
                        cells.push(0u32);
                        applicable.push(0f32);
                    }
                }
            }
        }

        Ok((
            Tensor::from_vec(base, (n_rows,), self.device())?,
            Tensor::from_vec(cells, (n_rows, 2), self.device())?,
            Tensor::from_vec(applicable, (n_rows, 2), self.device())?,
        ))
    }

    fn live_log_prob(
        &self,
        rows: &[WindowRow<Decision, CompositeAction>],
        input: &WindowInput,
        hidden0: &Tensor,
    ) -> Result<(PolicyOutput, Tensor)> {
        let (base_act, cells, applicable) = self.action_tensors(rows)?;
        let out = self.model.forward(input, hidden0)?;
        let spatial = out.spatial_probs.as_ref().map(|p| (p, &cells, &applicable));
        let lp = composite_log_prob(&out.base_probs, &base_act, spatial, self.eps_denom)?;
        Ok((out, lp))
    }

    fn target_log_prob(
        &self,
        rows: &[WindowRow<Decision, CompositeAction>],
        input: &WindowInput,
        hidden0: &Tensor,
    ) -> Result<Tensor> {
        let (base_act, cells, applicable) = self.action_tensors(rows)?;
        let out = self.model_tgt.forward(input, hidden0)?;
        let spatial = out.spatial_probs.as_ref().map(|p| (p, &cells, &applicable));
        let lp = composite_log_prob(&out.base_probs, &base_act, spatial, self.eps_denom)?;
        Ok(lp.detach())
    }

    fn update(&mut self, batch: &Minibatch<Decision, CompositeAction>) -> Result<UpdateStats> {
        let n_rows = batch.len();
        let (input, hidden0) = self.window_input(&batch.rows)?;
        let (out, lp) = self.live_log_prob(&batch.rows, &input, &hidden0)?;
        let lp_old = self.target_log_prob(&batch.rows, &input, &hidden0)?;
        let ratio = (lp - lp_old)?.exp()?;

        let adv = Tensor::from_vec(batch.advantages(), (n_rows,), self.device())?;
        let adv = normalize_advantages(&adv, self.eps_denom)?;
        let returns = Tensor::from_vec(batch.returns(), (n_rows,), self.device())?;

        let loss_policy = clipped_surrogate(&ratio, &adv, self.clip_ratio)?;
        let loss_value = mse(&out.value, &returns)?;

        // spatial entropy is taken over the primary slot
        let ent_base = entropy(&out.base_probs, self.eps_denom)?;
        let ent = match &out.spatial_probs {
            None => (ent_base * self.base_entropy_coef)?,
            Some(p) => {
                let primary = p.i((.., 0, ..))?.contiguous()?;
                let ent_spatial = entropy(&primary, self.eps_denom)?;
                ((ent_spatial * self.spatial_entropy_coef)? + (ent_base * self.base_entropy_coef)?)?
            }
        };

        let loss = ((&loss_policy + (&loss_value * self.value_coef)?)? - (&ent * self.entropy_coef)?)?;
        self.model.backward_step(&loss)?;

        Ok(UpdateStats {
            loss_policy: loss_policy.to_scalar::<f32>()?,
            loss_value: loss_value.to_scalar::<f32>()?,
            entropy: ent.to_scalar::<f32>()?,
            ratio: ratio.mean_all()?.to_scalar::<f32>()?,
        })
    }
}

impl<E, P> Policy<E> for Ppo<E, P>
where
    E: Env,
    P: RecurrentPolicy,
    E::Act: From<CompositeAction>,
{
    /// Samples an action, advancing the recurrent state by one frame.
    ///
    /// In training mode the action is drawn from the policy, or uniformly
    /// among available actions with probability ε. In evaluation mode the
    /// most probable available action is taken.
    fn sample(&mut self, obs: &E::Obs) -> Result<E::Act> {
        if self.pending.is_some() {
            return Err(TacticError::InvalidState(
                "an action is already sampled and waits for its outcome".into(),
            )
            .into());
        }
        if self.ctx.episode_start {
            self.ctx.prev_act = None;
        }

        let features = obs.features();
        let avail = obs.avail_actions();
        let hidden = self.current_hidden()?;
        let prev_act = encode_prev_act(self.ctx.prev_act.as_ref(), &self.action_space);
        let input = self.single_input(&features, &avail, &prev_act)?;
        let out = self.model.forward(&input, &hidden)?;
        let value = out.value.i(0)?.to_scalar::<f32>()?;
        let act = self.choose(&out, &avail)?;

        self.pending = Some(Pending {
            decision: Decision {
                features,
                avail,
                prev_act,
                hidden: hidden.flatten_all()?.to_vec1::<f32>()?,
            },
            act,
            value,
            starts_episode: self.ctx.episode_start,
        });
        self.ctx.hidden = Some(out.hidden.detach());
        self.ctx.prev_act = Some(act);
        self.ctx.episode_start = false;
        if self.train {
            self.frame_count += 1;
        }

        Ok(act.into())
    }
}

impl<E, P> Configurable<E> for Ppo<E, P>
where
    E: Env,
    P: RecurrentPolicy,
    P::Config: DeserializeOwned + Serialize,
    E::Act: From<CompositeAction>,
{
    type Config = PpoConfig<P::Config>;

    /// Constructs PPO agent.
    fn build(config: Self::Config) -> Result<Self> {
        let device: Device = config.device.unwrap_or(crate::Device::Cpu).try_into()?;
        let model_config = config.model_config.context("model_config is not set")?;
        let model = PpoModel::build(
            model_config.clone(),
            &config.opt_config,
            config.max_grad_norm,
            device.clone(),
        )?;
        let model_tgt = PpoModel::build(model_config, &config.opt_config, None, device)?;
        model_tgt.restore(&model.snapshot()?)?;

        Ok(Self {
            model,
            model_tgt,
            buffer: TrajectoryBuffer::build(&config.buffer_config),
            action_space: config.action_space,
            discount_factor: config.discount_factor,
            gae_lambda: config.gae_lambda,
            eps_denom: config.eps_denom,
            value_coef: config.value_coef,
            entropy_coef: config.entropy_coef,
            spatial_entropy_coef: config.spatial_entropy_coef,
            base_entropy_coef: config.base_entropy_coef,
            clip_ratio: config.clip_ratio,
            epochs: config.epochs,
            epsilon_max: config.epsilon_max,
            epsilon_min: config.epsilon_min,
            epsilon_duration: config.epsilon_duration,
            train: true,
            ctx: RecurrentContext::fresh(),
            stashed_ctx: None,
            pending: None,
            frame_count: 0,
            epochs_trained: 0,
            n_opts: 0,
            rng: SmallRng::seed_from_u64(config.seed),
            phantom: PhantomData,
        })
    }
}

impl<E, P> Agent<E> for Ppo<E, P>
where
    E: Env,
    P: RecurrentPolicy,
    E::Act: From<CompositeAction>,
{
    fn train_mode(&mut self) {
        if !self.train {
            self.ctx = self.stashed_ctx.take().unwrap_or_else(RecurrentContext::fresh);
        }
        self.train = true;
    }

    fn eval_mode(&mut self) {
        if self.train {
            let ctx = std::mem::replace(&mut self.ctx, RecurrentContext::fresh());
            self.stashed_ctx = Some(ctx);
        }
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn push_memory(&mut self, step: &Step<E>) -> Result<()> {
        let pending = self.pending.take().ok_or_else(|| {
            TacticError::InvalidState("push_memory is called without a sampled action".into())
        })?;

        if self.train {
            self.buffer.push(Transition {
                obs: pending.decision,
                act: pending.act,
                reward: step.reward,
                done: pending.starts_episode,
                value: pending.value,
                step_index: self.ctx.step_index,
            })?;
        }

        if step.is_done() {
            self.ctx.next_obs = None;
            self.ctx.step_index = 0;
            self.ctx.episode_start = true;
        } else {
            self.ctx.next_obs = Some((step.obs.features(), step.obs.avail_actions()));
            self.ctx.step_index += 1;
        }
        Ok(())
    }

    fn train(&mut self) -> Result<Record> {
        if self.pending.is_some() {
            return Err(TacticError::InvalidState(
                "training while an action waits for its outcome".into(),
            )
            .into());
        }
        if self.buffer.is_empty() {
            return Ok(Record::empty());
        }

        let bootstrap = self.bootstrap_value()?;
        self.buffer
            .compute_targets(self.discount_factor, self.gae_lambda, bootstrap);

        let n_chunks = self.buffer.n_chunks();
        let mut stats = UpdateStats::default();
        let mut ratio_first = None;
        let mut n_steps = 0usize;

        for _ in 0..self.epochs {
            for _ in 0..n_chunks {
                let batch = self.buffer.sample_minibatch()?;
                let s = self.update(&batch)?;
                ratio_first.get_or_insert(s.ratio);
                stats.loss_policy += s.loss_policy;
                stats.loss_value += s.loss_value;
                stats.entropy += s.entropy;
                stats.ratio += s.ratio;
                n_steps += 1;
            }
            self.epochs_trained += 1;
        }

        // the target network follows the live one only between training calls
        self.model_tgt.restore(&self.model.snapshot()?)?;
        self.n_opts += 1;

        let n = n_steps.max(1) as f32;
        debug!(
            "Training call {}: {} gradient steps over {} transitions, minibatches of {}",
            self.n_opts,
            n_steps,
            self.buffer.len(),
            self.buffer.batch_size()
        );

        Ok(Record::from_slice(&[
            ("loss_policy", RecordValue::Scalar(stats.loss_policy / n)),
            ("loss_value", RecordValue::Scalar(stats.loss_value / n)),
            ("entropy", RecordValue::Scalar(stats.entropy / n)),
            ("ratio_mean", RecordValue::Scalar(stats.ratio / n)),
            ("ratio_first", RecordValue::Scalar(ratio_first.unwrap_or(1.0))),
            ("n_grad_steps", RecordValue::Scalar(n_steps as f32)),
            ("epsilon", RecordValue::Scalar(self.epsilon())),
        ]))
    }

    fn save_params(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        self.model.save(path.join("policy.pt"))?;
        self.model_tgt.save(path.join("policy_tgt.pt"))?;
        info!("Save PPO agent to {:?}", path);
        Ok(())
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.model.load(path.join("policy.pt"))?;
        self.model_tgt.load(path.join("policy_tgt.pt"))?;
        info!("Load PPO agent from {:?}", path);
        Ok(())
    }
}
