//! Ring buffer of transitions.
use super::{Minibatch, TrajectoryBufferConfig, WindowRow};
use crate::{error::TacticError, ExperienceBufferBase};
use anyhow::Result;
use log::trace;
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use std::collections::VecDeque;

/// A transition, the unit of experience.
///
/// `done` marks an episode boundary right before this transition, i.e. the
/// transition is the first decision of a new episode. Transitions are not
/// mutated after being pushed; advantages and value targets live in arrays
/// of the buffer.
#[derive(Debug, Clone)]
pub struct Transition<O, A> {
    /// Observation at the decision.
    pub obs: O,

    /// Action taken.
    pub act: A,

    /// Reward accumulated until the next decision.
    pub reward: f32,

    /// The transition starts a new episode.
    pub done: bool,

    /// Value estimate at push time.
    pub value: f32,

    /// Decision index within the episode.
    pub step_index: usize,
}

/// A fixed-capacity ring buffer of transitions with GAE targets.
pub struct TrajectoryBuffer<O, A> {
    capacity: usize,
    batch_size: usize,
    history_size: usize,
    memory: VecDeque<Transition<O, A>>,
    advantages: Vec<f32>,
    returns: Vec<f32>,
    targets_computed: bool,

    // Shuffled permutation of indices and the next chunk to return
    indices: Vec<usize>,
    cursor: usize,
    generation: usize,
    rng: StdRng,
}

impl<O: Clone, A: Clone> TrajectoryBuffer<O, A> {
    /// Builds a buffer.
    pub fn build(config: &TrajectoryBufferConfig) -> Self {
        Self {
            capacity: config.capacity.max(1),
            batch_size: config.batch_size.max(1),
            history_size: config.history_size.max(1),
            memory: VecDeque::with_capacity(config.capacity),
            advantages: vec![],
            returns: vec![],
            targets_computed: false,
            indices: vec![],
            cursor: 0,
            generation: 0,
            rng: StdRng::seed_from_u64(config.seed),
        }
    }

    /// The maximum number of transitions.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The number of rows per minibatch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// The number of frames in a window.
    pub fn history_size(&self) -> usize {
        self.history_size
    }

    /// The number of minibatches in one pass over the buffer.
    pub fn n_chunks(&self) -> usize {
        (self.memory.len() + self.batch_size - 1) / self.batch_size
    }

    /// How many permutations have been drawn so far.
    pub fn permutation_generation(&self) -> usize {
        self.generation
    }

    /// Returns `true` if targets are up to date with the held transitions.
    pub fn targets_computed(&self) -> bool {
        self.targets_computed
    }

    /// Transition at a logical index, 0 being the oldest.
    pub fn get(&self, ix: usize) -> Option<&Transition<O, A>> {
        self.memory.get(ix)
    }

    /// Iterates over the transitions from the oldest.
    pub fn transitions(&self) -> impl Iterator<Item = &Transition<O, A>> {
        self.memory.iter()
    }

    /// The most recent transition.
    pub fn last(&self) -> Option<&Transition<O, A>> {
        self.memory.back()
    }

    /// Advantages computed by the last call of [`Self::compute_targets`].
    pub fn advantages(&self) -> &[f32] {
        &self.advantages
    }

    /// Value targets computed by the last call of [`Self::compute_targets`].
    pub fn returns(&self) -> &[f32] {
        &self.returns
    }

    /// Removes every transition.
    pub fn clear(&mut self) {
        self.memory.clear();
        self.invalidate();
    }

    fn invalidate(&mut self) {
        self.targets_computed = false;
        self.advantages.clear();
        self.returns.clear();
        self.indices.clear();
        self.cursor = 0;
    }

    /// Computes GAE advantages and value targets in one backward pass.
    ///
    /// `bootstrap_value` stands in for the value of the observation following
    /// the most recent transition. Cached values are used as they were
    /// recorded at push time.
    pub fn compute_targets(&mut self, gamma: f32, lambda: f32, bootstrap_value: f32) {
        let n = self.memory.len();
        self.advantages = vec![0f32; n];
        self.returns = vec![0f32; n];
        let mut prev_gae = 0f32;

        for i in (0..n).rev() {
            let (next_value, nonterminal) = if i + 1 == n {
                (bootstrap_value, 1f32)
            } else {
                let next = &self.memory[i + 1];
                (next.value, if next.done { 0f32 } else { 1f32 })
            };
            let tr = &self.memory[i];
            let delta = tr.reward + gamma * next_value * nonterminal - tr.value;
            let gae = delta + gamma * lambda * nonterminal * prev_gae;
            self.advantages[i] = gae;
            self.returns[i] = gae + tr.value;
            prev_gae = gae;
        }

        self.targets_computed = true;
    }

    fn regenerate_permutation(&mut self) {
        self.indices = (0..self.memory.len()).collect();
        self.indices.shuffle(&mut self.rng);
        self.cursor = 0;
        self.generation += 1;
        trace!(
            "Drew permutation {} over {} indices",
            self.generation,
            self.indices.len()
        );
    }

    /// Returns the next chunk of the shuffled permutation as a minibatch.
    ///
    /// A new permutation is drawn when the previous one is exhausted or the
    /// content of the buffer changed.
    pub fn sample_minibatch(&mut self) -> Result<Minibatch<O, A>> {
        if self.memory.is_empty() {
            return Err(TacticError::InvalidState("sampling from an empty buffer".into()).into());
        }
        if !self.targets_computed {
            return Err(TacticError::InvalidState(
                "sampling before targets are computed".into(),
            )
            .into());
        }
        if self.indices.len() != self.memory.len() || self.cursor >= self.n_chunks() {
            self.regenerate_permutation();
        }

        let lo = self.cursor * self.batch_size;
        let hi = (lo + self.batch_size).min(self.indices.len());
        let rows = self.indices[lo..hi]
            .iter()
            .map(|&ix| self.window(ix))
            .collect::<Result<Vec<_>>>()?;
        self.cursor += 1;

        Ok(Minibatch { rows })
    }

    /// Builds the history window ending at logical index `ix`.
    ///
    /// Every frame strictly before the most recent transition flagged `done`
    /// inside the window is masked, as are positions older than the oldest
    /// transition held.
    pub fn window(&self, ix: usize) -> Result<WindowRow<O, A>> {
        let tr = self.memory.get(ix).ok_or_else(|| {
            TacticError::InvalidState(format!("index {} out of range {}", ix, self.memory.len()))
        })?;
        let (advantage, return_target) = match self.targets_computed {
            true => (self.advantages[ix], self.returns[ix]),
            false => (0f32, 0f32),
        };

        let h = self.history_size;
        let start = ix as isize - (h as isize - 1);
        let first_kept = start.max(0) as usize;
        let boundary = (first_kept..=ix)
            .rev()
            .find(|&j| self.memory[j].done)
            .unwrap_or(first_kept);

        let frames = (0..h)
            .map(|pos| {
                let j = start + pos as isize;
                match j < boundary as isize {
                    true => None,
                    false => Some(self.memory[j as usize].obs.clone()),
                }
            })
            .collect();

        Ok(WindowRow {
            index: ix,
            frames,
            act: tr.act.clone(),
            value: tr.value,
            advantage,
            return_target,
        })
    }
}

impl<O: Clone, A: Clone> ExperienceBufferBase for TrajectoryBuffer<O, A> {
    type Item = Transition<O, A>;

    fn push(&mut self, tr: Self::Item) -> Result<()> {
        if self.memory.len() == self.capacity {
            self.memory.pop_front();
        }
        self.memory.push_back(tr);
        self.invalidate();
        Ok(())
    }

    fn len(&self) -> usize {
        self.memory.len()
    }
}
