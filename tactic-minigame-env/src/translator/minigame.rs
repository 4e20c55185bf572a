//! Actions of the combat and navigation minigames.
use super::{centroid, clamp_to_screen, closest_cell, weakest_cell, ActionTranslator};
use crate::{PrimitiveCommand, RawObs};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use tactic_core::{
    action_space::{ActionSpace, CompositeAction},
    error::TacticError,
    Act,
};

/// One of the eight compass directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum Direction {
    Left,
    UpLeft,
    Up,
    UpRight,
    Right,
    DownRight,
    Down,
    DownLeft,
}

impl Direction {
    /// All directions in action index order.
    pub const ALL: [Direction; 8] = [
        Self::Left,
        Self::UpLeft,
        Self::Up,
        Self::UpRight,
        Self::Right,
        Self::DownRight,
        Self::Down,
        Self::DownLeft,
    ];

    /// Unit offset `(dx, dy)`.
    pub fn delta(&self) -> (f32, f32) {
        match self {
            Self::Left => (-1.0, 0.0),
            Self::UpLeft => (-1.0, 1.0),
            Self::Up => (0.0, 1.0),
            Self::UpRight => (1.0, 1.0),
            Self::Right => (1.0, 0.0),
            Self::DownRight => (1.0, -1.0),
            Self::Down => (0.0, -1.0),
            Self::DownLeft => (-1.0, -1.0),
        }
    }
}

/// High-level action of the minigames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MinigameAction {
    /// Does nothing.
    NoOp,

    /// Selects all own units.
    Select,

    /// Moves the selection in a direction.
    Move(Direction),

    /// Attacks the enemy closest to the selection.
    AttackClosest,

    /// Attacks the enemy with the lowest hit points.
    AttackWeakest,
}

impl MinigameAction {
    /// The number of base actions.
    pub const N: usize = 12;

    /// Index of the action.
    pub fn index(&self) -> usize {
        match self {
            Self::NoOp => 0,
            Self::Select => 1,
            Self::Move(d) => 2 + Direction::ALL.iter().position(|e| e == d).unwrap_or(0),
            Self::AttackClosest => 10,
            Self::AttackWeakest => 11,
        }
    }

    /// Action of an index, `None` if out of range.
    pub fn from_index(ix: usize) -> Option<Self> {
        match ix {
            0 => Some(Self::NoOp),
            1 => Some(Self::Select),
            2..=9 => Some(Self::Move(Direction::ALL[ix - 2])),
            10 => Some(Self::AttackClosest),
            11 => Some(Self::AttackWeakest),
            _ => None,
        }
    }
}

impl Act for MinigameAction {}

impl From<CompositeAction> for MinigameAction {
    fn from(a: CompositeAction) -> Self {
        Self::from_index(a.base).unwrap_or(Self::NoOp)
    }
}

impl From<MinigameAction> for CompositeAction {
    fn from(a: MinigameAction) -> Self {
        CompositeAction::base(a.index())
    }
}

/// Configuration of [`MinigameActuator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinigameActuatorConfig {
    /// Distance in cells of a move.
    pub move_step: f32,

    /// Selects own units automatically when nothing is selected.
    pub auto_select: bool,

    /// Fails when no own unit is left on a non-terminal frame.
    pub require_friendly_units: bool,
}

impl Default for MinigameActuatorConfig {
    fn default() -> Self {
        Self {
            move_step: 20.0,
            auto_select: true,
            require_friendly_units: true,
        }
    }
}

impl MinigameActuatorConfig {
    /// Sets the distance of a move.
    pub fn move_step(mut self, v: f32) -> Self {
        self.move_step = v;
        self
    }

    /// Enables or disables automatic selection.
    pub fn auto_select(mut self, v: bool) -> Self {
        self.auto_select = v;
        self
    }

    /// Enables or disables the check for remaining own units.
    pub fn require_friendly_units(mut self, v: bool) -> Self {
        self.require_friendly_units = v;
        self
    }
}

/// Translator of [`MinigameAction`]. Every action takes a single tick.
pub struct MinigameActuator {
    config: MinigameActuatorConfig,
}

impl MinigameActuator {
    fn require_selection(obs: &RawObs) -> Result<()> {
        match obs.layers.has_selection() {
            true => Ok(()),
            false => Err(TacticError::InvalidState("no units are selected".into()).into()),
        }
    }

    fn friendly_centroid(obs: &RawObs) -> Result<(f32, f32)> {
        centroid(&obs.layers.friendly_density)
            .ok_or_else(|| TacticError::InvalidState("no friendly units on screen".into()).into())
    }
}

impl ActionTranslator for MinigameActuator {
    type Config = MinigameActuatorConfig;
    type Action = MinigameAction;

    fn build(config: &Self::Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    fn reset(&mut self) {}

    fn compute_primitive(&mut self, action: MinigameAction, obs: &RawObs) -> Result<PrimitiveCommand> {
        let layers = &obs.layers;
        match action {
            MinigameAction::NoOp => Ok(PrimitiveCommand::NoOp),
            MinigameAction::Select => match layers.has_selection() {
                true => Err(TacticError::InvalidState(
                    "cannot select with a preexisting selection".into(),
                )
                .into()),
                false => Ok(PrimitiveCommand::SelectArmy),
            },
            MinigameAction::Move(d) => {
                Self::require_selection(obs)?;
                let (x, y) = Self::friendly_centroid(obs)?;
                let (dx, dy) = d.delta();
                let step = self.config.move_step;
                let target = clamp_to_screen(x + step * dx, y + step * dy, layers.size());
                Ok(PrimitiveCommand::MoveScreen(target))
            }
            MinigameAction::AttackClosest => {
                Self::require_selection(obs)?;
                let from = Self::friendly_centroid(obs)?;
                let target = closest_cell(from, &layers.enemy_density)
                    .ok_or_else(|| TacticError::InvalidState("no enemy units on screen".into()))?;
                Ok(PrimitiveCommand::AttackScreen(target))
            }
            MinigameAction::AttackWeakest => {
                Self::require_selection(obs)?;
                let target = weakest_cell(&layers.enemy_density, &layers.enemy_hit_points)
                    .ok_or_else(|| TacticError::InvalidState("no enemy units on screen".into()))?;
                Ok(PrimitiveCommand::AttackScreen(target))
            }
        }
    }

    fn is_idle(&self) -> bool {
        true
    }

    fn discard_in_progress(&mut self) {}

    fn helper_action(&self, obs: &RawObs) -> Option<MinigameAction> {
        let layers = &obs.layers;
        match self.config.auto_select && !layers.has_selection() && layers.has_friendly() {
            true => Some(MinigameAction::Select),
            false => None,
        }
    }

    fn check_invariants(&self, obs: &RawObs) -> Result<()> {
        if self.config.require_friendly_units && !obs.layers.has_friendly() {
            return Err(TacticError::EnvironmentInvariant(
                "all friendly units are gone on a non-terminal frame".into(),
            )
            .into());
        }
        Ok(())
    }

    fn available_actions(&self, obs: &RawObs) -> Vec<bool> {
        let layers = &obs.layers;
        let selected = layers.has_selection();
        let friendly = layers.has_friendly();
        let enemy = layers.has_enemy();
        (0..MinigameAction::N)
            .map(|ix| match MinigameAction::from_index(ix) {
                Some(MinigameAction::NoOp) => true,
                Some(MinigameAction::Select) => !selected && friendly,
                Some(MinigameAction::Move(_)) => selected && friendly,
                Some(MinigameAction::AttackClosest) => selected && friendly && enemy,
                Some(MinigameAction::AttackWeakest) => selected && enemy,
                None => false,
            })
            .collect()
    }

    fn action_space(&self) -> ActionSpace {
        ActionSpace::discrete(MinigameAction::N)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ScreenPoint;

    fn obs_with_unit_at(x: usize, y: usize) -> RawObs {
        let mut obs = RawObs::empty(84);
        obs.layers.friendly_density[[y, x]] = 1.0;
        obs.layers.selected[[y, x]] = 1.0;
        obs
    }

    fn actuator() -> MinigameActuator {
        MinigameActuator::build(&MinigameActuatorConfig::default())
    }

    fn is_invalid_state(err: &anyhow::Error) -> bool {
        matches!(
            err.downcast_ref::<TacticError>(),
            Some(TacticError::InvalidState(_))
        )
    }

    #[test]
    fn test_move_targets() -> Result<()> {
        let mut t = actuator();
        let cmd = t.compute_primitive(MinigameAction::Move(Direction::Up), &obs_with_unit_at(42, 42))?;
        assert_eq!(cmd, PrimitiveCommand::MoveScreen(ScreenPoint::new(42, 62)));

        let cmd = t.compute_primitive(MinigameAction::Move(Direction::Up), &obs_with_unit_at(42, 75))?;
        assert_eq!(cmd, PrimitiveCommand::MoveScreen(ScreenPoint::new(42, 83)));

        let cmd = t.compute_primitive(
            MinigameAction::Move(Direction::DownLeft),
            &obs_with_unit_at(10, 30),
        )?;
        assert_eq!(cmd, PrimitiveCommand::MoveScreen(ScreenPoint::new(0, 10)));
        Ok(())
    }

    #[test]
    fn test_select_with_selection_fails() {
        let mut t = actuator();
        let err = t
            .compute_primitive(MinigameAction::Select, &obs_with_unit_at(5, 5))
            .unwrap_err();
        assert!(is_invalid_state(&err));
    }

    #[test]
    fn test_actions_require_selection() {
        let mut t = actuator();
        let mut obs = obs_with_unit_at(5, 5);
        obs.layers.selected[[5, 5]] = 0.0;
        obs.layers.enemy_density[[1, 1]] = 1.0;
        for a in [
            MinigameAction::Move(Direction::Left),
            MinigameAction::AttackClosest,
            MinigameAction::AttackWeakest,
        ] {
            let err = t.compute_primitive(a, &obs).unwrap_err();
            assert!(is_invalid_state(&err));
        }
        assert_eq!(
            t.compute_primitive(MinigameAction::Select, &obs).ok(),
            Some(PrimitiveCommand::SelectArmy)
        );
    }

    #[test]
    fn test_attack_without_enemies_fails() {
        let mut t = actuator();
        let obs = obs_with_unit_at(5, 5);
        let err = t
            .compute_primitive(MinigameAction::AttackClosest, &obs)
            .unwrap_err();
        assert!(is_invalid_state(&err));
        let err = t
            .compute_primitive(MinigameAction::AttackWeakest, &obs)
            .unwrap_err();
        assert!(is_invalid_state(&err));
    }

    #[test]
    fn test_attack_targets() -> Result<()> {
        let mut t = actuator();
        let mut obs = obs_with_unit_at(10, 10);
        obs.layers.enemy_density[[12, 10]] = 1.0;
        obs.layers.enemy_hit_points[[12, 10]] = 45.0;
        obs.layers.enemy_density[[40, 40]] = 1.0;
        obs.layers.enemy_hit_points[[40, 40]] = 5.0;
        obs.layers.enemy_hit_points[[0, 0]] = 1.0;

        let cmd = t.compute_primitive(MinigameAction::AttackClosest, &obs)?;
        assert_eq!(cmd, PrimitiveCommand::AttackScreen(ScreenPoint::new(10, 12)));
        let cmd = t.compute_primitive(MinigameAction::AttackWeakest, &obs)?;
        assert_eq!(cmd, PrimitiveCommand::AttackScreen(ScreenPoint::new(40, 40)));
        Ok(())
    }

    #[test]
    fn test_helper_and_invariants() {
        let t = actuator();
        let mut obs = obs_with_unit_at(3, 3);
        assert_eq!(t.helper_action(&obs), None);
        obs.layers.selected[[3, 3]] = 0.0;
        assert_eq!(t.helper_action(&obs), Some(MinigameAction::Select));
        assert!(t.check_invariants(&obs).is_ok());

        let empty = RawObs::empty(84);
        assert_eq!(t.helper_action(&empty), None);
        let err = t.check_invariants(&empty).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TacticError>(),
            Some(TacticError::EnvironmentInvariant(_))
        ));
    }

    #[test]
    fn test_available_actions() {
        let t = actuator();
        let mut obs = obs_with_unit_at(3, 3);
        let avail = t.available_actions(&obs);
        assert_eq!(avail.len(), MinigameAction::N);
        assert!(avail[0] && !avail[1] && avail[2] && !avail[10] && !avail[11]);
        obs.layers.enemy_density[[7, 7]] = 1.0;
        let avail = t.available_actions(&obs);
        assert!(avail[10] && avail[11]);
    }

    #[test]
    fn test_index_round_trip() {
        for ix in 0..MinigameAction::N {
            let a = MinigameAction::from_index(ix).unwrap();
            assert_eq!(a.index(), ix);
            assert_eq!(MinigameAction::from(CompositeAction::from(a)), a);
        }
        assert_eq!(MinigameAction::from_index(MinigameAction::N), None);
    }
}
