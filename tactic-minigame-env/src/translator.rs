//! Translation of high-level actions into primitive simulator commands.
//!
//! A high-level action may need several ticks: a translator keeps the
//! in-progress state between calls of [`ActionTranslator::compute_primitive`]
//! and reports through [`ActionTranslator::is_idle`] when the action has
//! completed.
mod build_marines;
mod minigame;
pub use build_marines::{BuildMarinesAction, BuildMarinesActuator, BuildMarinesConfig};
pub use minigame::{Direction, MinigameAction, MinigameActuator, MinigameActuatorConfig};

use crate::{PrimitiveCommand, RawObs, ScreenPoint};
use anyhow::Result;
use ndarray::Array2;
use tactic_core::{action_space::ActionSpace, Act};

/// Translates high-level actions of a scenario into primitive commands.
pub trait ActionTranslator {
    /// Configuration of the translator.
    type Config: Clone;

    /// High-level action.
    type Action: Act + Copy;

    /// Builds the translator.
    fn build(config: &Self::Config) -> Self
    where
        Self: Sized;

    /// Clears all in-progress state at the start of an episode.
    fn reset(&mut self);

    /// Returns the command for the next tick.
    ///
    /// While an action is in progress, `action` is ignored and the in-progress
    /// action is continued. Fails with
    /// [`TacticError::InvalidState`](tactic_core::error::TacticError::InvalidState)
    /// when the preconditions of the action do not hold.
    fn compute_primitive(&mut self, action: Self::Action, obs: &RawObs) -> Result<PrimitiveCommand>;

    /// Returns `true` if no multi-step action is in progress.
    fn is_idle(&self) -> bool;

    /// Drops the in-progress action, if any.
    fn discard_in_progress(&mut self);

    /// An action to be executed without a decision of the agent, if any.
    fn helper_action(&self, obs: &RawObs) -> Option<Self::Action>;

    /// Checks assumptions on non-terminal frames.
    fn check_invariants(&self, obs: &RawObs) -> Result<()>;

    /// Availability of every base action at the frame.
    fn available_actions(&self, obs: &RawObs) -> Vec<bool>;

    /// The action space seen by agents.
    fn action_space(&self) -> ActionSpace;
}

/// Mean position `(x, y)` of the cells with a nonzero value.
pub fn centroid(layer: &Array2<f32>) -> Option<(f32, f32)> {
    let (mut sx, mut sy, mut n) = (0f32, 0f32, 0usize);
    for ((y, x), v) in layer.indexed_iter() {
        if *v != 0.0 {
            sx += x as f32;
            sy += y as f32;
            n += 1;
        }
    }
    match n {
        0 => None,
        _ => Some((sx / n as f32, sy / n as f32)),
    }
}

/// Rounds a position and saturates it to the screen.
pub fn clamp_to_screen(x: f32, y: f32, size: usize) -> ScreenPoint {
    let max = size.saturating_sub(1) as f32;
    ScreenPoint::new(x.round().clamp(0.0, max) as usize, y.round().clamp(0.0, max) as usize)
}

/// The nonzero cell closest to `from`.
///
/// Cells are scanned row by row, the first one wins ties.
pub fn closest_cell(from: (f32, f32), layer: &Array2<f32>) -> Option<ScreenPoint> {
    let mut best: Option<(f32, ScreenPoint)> = None;
    for ((y, x), v) in layer.indexed_iter() {
        if *v == 0.0 {
            continue;
        }
        let (dx, dy) = (x as f32 - from.0, y as f32 - from.1);
        let d = dx * dx + dy * dy;
        if best.map_or(true, |(b, _)| d < b) {
            best = Some((d, ScreenPoint::new(x, y)));
        }
    }
    best.map(|(_, p)| p)
}

/// The occupied cell with the lowest hit points.
///
/// Cells with zero density are ignored even if they carry hit points. Cells
/// are scanned row by row, the first one wins ties.
pub fn weakest_cell(density: &Array2<f32>, hit_points: &Array2<f32>) -> Option<ScreenPoint> {
    let mut best: Option<(f32, ScreenPoint)> = None;
    for ((y, x), v) in density.indexed_iter() {
        if *v == 0.0 {
            continue;
        }
        let hp = hit_points[[y, x]];
        if best.map_or(true, |(b, _)| hp < b) {
            best = Some((hp, ScreenPoint::new(x, y)));
        }
    }
    best.map(|(_, p)| p)
}

/// The first cell, row by row, of the given unit type.
pub fn first_unit_cell(unit_type: &Array2<u32>, unit: u32) -> Option<ScreenPoint> {
    unit_type
        .indexed_iter()
        .find(|(_, t)| **t == unit)
        .map(|((y, x), _)| ScreenPoint::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_to_screen() {
        assert_eq!(clamp_to_screen(42.0, 62.0, 84), ScreenPoint::new(42, 62));
        assert_eq!(clamp_to_screen(-3.2, 95.0, 84), ScreenPoint::new(0, 83));
        assert_eq!(clamp_to_screen(10.4, 10.6, 84), ScreenPoint::new(10, 11));
    }

    #[test]
    fn test_centroid() {
        let mut layer = Array2::zeros((8, 8));
        assert_eq!(centroid(&layer), None);
        layer[[2, 1]] = 1.0;
        layer[[4, 3]] = 2.0;
        assert_eq!(centroid(&layer), Some((2.0, 3.0)));
    }

    #[test]
    fn test_closest_cell_breaks_ties_row_major() {
        let mut layer = Array2::zeros((8, 8));
        layer[[5, 4]] = 1.0;
        layer[[3, 4]] = 1.0;
        layer[[4, 3]] = 1.0;
        // all three are at distance 1 from (4, 4); (x=4, y=3) comes first
        assert_eq!(closest_cell((4.0, 4.0), &layer), Some(ScreenPoint::new(4, 3)));
        assert_eq!(closest_cell((0.0, 0.0), &Array2::zeros((8, 8))), None);
    }

    #[test]
    fn test_weakest_cell_ignores_empty_cells() {
        let mut density = Array2::zeros((8, 8));
        let mut hp = Array2::zeros((8, 8));
        hp[[0, 0]] = 1.0;
        density[[2, 2]] = 1.0;
        hp[[2, 2]] = 40.0;
        density[[6, 1]] = 1.0;
        hp[[6, 1]] = 30.0;
        assert_eq!(weakest_cell(&density, &hp), Some(ScreenPoint::new(1, 6)));
    }
}
