//! Interface of recurrent policy networks.
use anyhow::Result;
use candle_core::Tensor;
use candle_nn::VarBuilder;

/// Input of a [`RecurrentPolicy`] over a window of frames.
pub struct WindowInput {
    /// Frame inputs, shape `[batch, history, in_dim]`. Masked frames are zero.
    pub frames: Tensor,

    /// 1 for relevant frames and 0 for masked ones, shape `[batch, history]`.
    pub relevant: Tensor,

    /// Availability of base actions at the last frame, shape `[batch, n_base]`.
    pub avail: Tensor,
}

/// Output of a [`RecurrentPolicy`].
pub struct PolicyOutput {
    /// Probabilities of base actions, shape `[batch, n_base]`.
    pub base_probs: Tensor,

    /// Probabilities of the two spatial sub-choices, shape `[batch, 2, n_cells]`.
    pub spatial_probs: Option<Tensor>,

    /// State values, shape `[batch]`.
    pub value: Tensor,

    /// Hidden state after the last frame, shape `[batch, hidden_dim]`.
    pub hidden: Tensor,
}

/// A recurrent policy-value network not owning its [`VarMap`](candle_nn::VarMap).
///
/// The hidden state is advanced over the relevant frames of a window and
/// kept as is over masked ones. Unavailable base actions get zero
/// probability.
pub trait RecurrentPolicy {
    /// Configuration from which the network is constructed.
    type Config: Clone;

    /// Builds the network with [`VarBuilder`] and its configuration.
    fn build(vb: VarBuilder, config: Self::Config) -> Result<Self>
    where
        Self: Sized;

    /// Size of the hidden state.
    fn hidden_dim(&self) -> usize;

    /// Zero hidden state of the given batch size.
    fn init_hidden(&self, batch: usize) -> Result<Tensor>;

    /// Runs the network over a window starting from `hidden`.
    fn forward(&self, input: &WindowInput, hidden: &Tensor) -> Result<PolicyOutput>;
}
