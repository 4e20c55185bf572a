//! Minibatches drawn from [`TrajectoryBuffer`](super::TrajectoryBuffer).

/// A sampled transition together with its history window.
///
/// `frames` and `relevant` have `history_size` entries, oldest first; the
/// last entry is the sampled transition itself.
#[derive(Debug, Clone)]
pub struct WindowRow<O, A> {
    /// Logical index of the sampled transition, 0 being the oldest one held.
    pub index: usize,

    /// Observations of the window, `None` where masked.
    pub frames: Vec<Option<O>>,

    /// Action taken at the sampled transition.
    pub act: A,

    /// Value estimate recorded when the transition was pushed.
    pub value: f32,

    /// GAE advantage.
    pub advantage: f32,

    /// Value target, equal to `advantage + value`.
    pub return_target: f32,
}

impl<O, A> WindowRow<O, A> {
    /// 1 for frames of the sampled transition's episode, 0 for masked frames.
    pub fn relevant(&self) -> Vec<f32> {
        self.frames
            .iter()
            .map(|f| if f.is_some() { 1.0 } else { 0.0 })
            .collect()
    }

    /// Position in the window of the first unmasked frame.
    pub fn first_relevant(&self) -> usize {
        self.frames
            .iter()
            .position(|f| f.is_some())
            .unwrap_or(self.frames.len())
    }

    /// Observation of the sampled transition.
    pub fn obs(&self) -> Option<&O> {
        self.frames.last().and_then(|f| f.as_ref())
    }
}

/// A minibatch of window rows.
#[derive(Debug, Clone)]
pub struct Minibatch<O, A> {
    /// Rows of the minibatch.
    pub rows: Vec<WindowRow<O, A>>,
}

impl<O, A> Minibatch<O, A> {
    /// The number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns `true` if there is no row.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Advantages of the rows.
    pub fn advantages(&self) -> Vec<f32> {
        self.rows.iter().map(|r| r.advantage).collect()
    }

    /// Value targets of the rows.
    pub fn returns(&self) -> Vec<f32> {
        self.rows.iter().map(|r| r.return_target).collect()
    }
}
