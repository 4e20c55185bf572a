//! Economy actions of the BuildMarines minigame.
//!
//! Every action except [`BuildMarinesAction::NoOp`] takes several ticks: a
//! selection, an order and then waiting until the effect of the order is
//! visible in the player statistics.
use super::{centroid, closest_cell, first_unit_cell, ActionTranslator};
use crate::{obs::unit_type, PlayerStats, PrimitiveCommand, RawObs, ScreenPoint};
use anyhow::Result;
use log::{trace, warn};
use serde::{Deserialize, Serialize};
use tactic_core::{
    action_space::{ActionSpace, CompositeAction, SubChoice},
    error::TacticError,
    Act,
};

const SCV_COST: u32 = 50;
const MARINE_COST: u32 = 50;
const SUPPLY_DEPOT_COST: u32 = 100;
const BARRACKS_COST: u32 = 150;

/// Approximate screen footprint of a single barracks.
const PIXELS_PER_BARRACKS: usize = 110;

/// High-level action of the BuildMarines minigame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildMarinesAction {
    /// Does nothing.
    NoOp,

    /// Queues a worker at the command centre.
    MakeScv,

    /// Builds a supply depot at a point.
    BuildSupplyDepot(ScreenPoint),

    /// Builds barracks at a point.
    BuildBarracks(ScreenPoint),

    /// Queues a marine at the barracks.
    MakeMarine,

    /// Kills one of the own marines to free supply.
    KillMarine,

    /// Sends idle workers back to the minerals.
    RallyScvs,
}

impl BuildMarinesAction {
    /// The number of base actions.
    pub const N: usize = 7;

    /// Index of the base action.
    pub fn index(&self) -> usize {
        match self {
            Self::NoOp => 0,
            Self::MakeScv => 1,
            Self::BuildSupplyDepot(_) => 2,
            Self::BuildBarracks(_) => 3,
            Self::MakeMarine => 4,
            Self::KillMarine => 5,
            Self::RallyScvs => 6,
        }
    }
}

impl Act for BuildMarinesAction {}

impl From<CompositeAction> for BuildMarinesAction {
    fn from(a: CompositeAction) -> Self {
        let (x, y) = a.spatial[0].unwrap_or((0, 0));
        let p = ScreenPoint::new(x, y);
        match a.base {
            1 => Self::MakeScv,
            2 => Self::BuildSupplyDepot(p),
            3 => Self::BuildBarracks(p),
            4 => Self::MakeMarine,
            5 => Self::KillMarine,
            6 => Self::RallyScvs,
            _ => Self::NoOp,
        }
    }
}

impl From<BuildMarinesAction> for CompositeAction {
    fn from(a: BuildMarinesAction) -> Self {
        match a {
            BuildMarinesAction::BuildSupplyDepot(p) | BuildMarinesAction::BuildBarracks(p) => {
                CompositeAction::with_primary(a.index(), p.x, p.y)
            }
            _ => CompositeAction::base(a.index()),
        }
    }
}

/// Configuration of [`BuildMarinesActuator`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildMarinesConfig {
    /// Width of the screen, which is also the width of the spatial grid.
    pub screen_size: usize,

    /// Workers are not trained beyond this supply.
    pub max_scvs: u32,

    /// Ticks to wait for the effect of an order before giving up.
    pub max_wait_ticks: usize,

    /// Trains workers without a decision of the agent.
    pub scv_helper: bool,

    /// Kills marines to free supply without a decision of the agent.
    pub kill_helper: bool,

    /// Sends idle workers to the minerals without a decision of the agent.
    pub rally_helper: bool,
}

impl Default for BuildMarinesConfig {
    fn default() -> Self {
        Self {
            screen_size: 84,
            max_scvs: 20,
            max_wait_ticks: 8,
            scv_helper: true,
            kill_helper: true,
            rally_helper: true,
        }
    }
}

impl BuildMarinesConfig {
    /// Sets the width of the screen.
    pub fn screen_size(mut self, v: usize) -> Self {
        self.screen_size = v;
        self
    }

    /// Sets the cap of worker supply.
    pub fn max_scvs(mut self, v: u32) -> Self {
        self.max_scvs = v;
        self
    }

    /// Sets the number of ticks to wait for an order.
    pub fn max_wait_ticks(mut self, v: usize) -> Self {
        self.max_wait_ticks = v;
        self
    }

    /// Enables or disables all helpers.
    pub fn helpers(mut self, v: bool) -> Self {
        self.scv_helper = v;
        self.kill_helper = v;
        self.rally_helper = v;
        self
    }
}

#[derive(Debug, Clone, Copy)]
enum Progress {
    /// The selection command was issued.
    Selecting,

    /// The order was issued; the fields are statistics at that time.
    Ordered {
        baseline: Baseline,
        waited: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct Baseline {
    minerals: u32,
    build_queue_len: usize,
    idle_worker_count: u32,
    food_army: u32,
}

impl From<&PlayerStats> for Baseline {
    fn from(p: &PlayerStats) -> Self {
        Self {
            minerals: p.minerals,
            build_queue_len: p.build_queue_len,
            idle_worker_count: p.idle_worker_count,
            food_army: p.food_army,
        }
    }
}

/// Translator of [`BuildMarinesAction`].
pub struct BuildMarinesActuator {
    config: BuildMarinesConfig,
    in_progress: Option<(BuildMarinesAction, Progress)>,
}

impl BuildMarinesActuator {
    fn missing(what: &str) -> anyhow::Error {
        TacticError::InvalidState(format!("no {} on screen", what)).into()
    }

    fn unit_cell(obs: &RawObs, unit: u32, what: &str) -> Result<ScreenPoint> {
        first_unit_cell(&obs.layers.unit_type, unit).ok_or_else(|| Self::missing(what))
    }

    /// Command selecting the units that execute the action.
    fn select(action: BuildMarinesAction, obs: &RawObs) -> Result<PrimitiveCommand> {
        match action {
            BuildMarinesAction::MakeScv => Ok(PrimitiveCommand::SelectPoint(Self::unit_cell(
                obs,
                unit_type::COMMAND_CENTER,
                "command centre",
            )?)),
            BuildMarinesAction::BuildSupplyDepot(_) | BuildMarinesAction::BuildBarracks(_) => Ok(
                PrimitiveCommand::SelectPoint(Self::unit_cell(obs, unit_type::SCV, "worker")?),
            ),
            BuildMarinesAction::MakeMarine => Ok(PrimitiveCommand::SelectAllOfType(
                Self::unit_cell(obs, unit_type::BARRACKS, "barracks")?,
            )),
            BuildMarinesAction::KillMarine => {
                Self::unit_cell(obs, unit_type::MARINE, "marine")?;
                Ok(PrimitiveCommand::SelectArmy)
            }
            BuildMarinesAction::RallyScvs => match obs.player.idle_worker_count {
                0 => Err(Self::missing("idle worker")),
                _ => Ok(PrimitiveCommand::SelectIdleWorker),
            },
            BuildMarinesAction::NoOp => Ok(PrimitiveCommand::NoOp),
        }
    }

    /// Command ordering the selected units.
    fn order(action: BuildMarinesAction, obs: &RawObs) -> Result<PrimitiveCommand> {
        match action {
            BuildMarinesAction::MakeScv => Ok(PrimitiveCommand::TrainScv),
            BuildMarinesAction::BuildSupplyDepot(p) => Ok(PrimitiveCommand::BuildSupplyDepot(p)),
            BuildMarinesAction::BuildBarracks(p) => Ok(PrimitiveCommand::BuildBarracks(p)),
            BuildMarinesAction::MakeMarine => Ok(PrimitiveCommand::TrainMarine),
            BuildMarinesAction::KillMarine => Ok(PrimitiveCommand::AttackScreen(Self::unit_cell(
                obs,
                unit_type::MARINE,
                "marine",
            )?)),
            BuildMarinesAction::RallyScvs => {
                let minerals = obs.layers.unit_type.mapv(|t| match t {
                    unit_type::MINERAL_FIELD => 1f32,
                    _ => 0f32,
                });
                let from = centroid(&obs.layers.friendly_density).unwrap_or((0.0, 0.0));
                let target =
                    closest_cell(from, &minerals).ok_or_else(|| Self::missing("mineral field"))?;
                Ok(PrimitiveCommand::HarvestScreen(target))
            }
            BuildMarinesAction::NoOp => Ok(PrimitiveCommand::NoOp),
        }
    }

    /// Returns `true` when the effect of the order is visible.
    fn completed(action: BuildMarinesAction, baseline: &Baseline, p: &PlayerStats) -> bool {
        match action {
            BuildMarinesAction::MakeScv | BuildMarinesAction::MakeMarine => {
                p.build_queue_len > baseline.build_queue_len || p.minerals < baseline.minerals
            }
            BuildMarinesAction::BuildSupplyDepot(_) | BuildMarinesAction::BuildBarracks(_) => {
                p.minerals < baseline.minerals
            }
            BuildMarinesAction::KillMarine => p.food_army < baseline.food_army,
            BuildMarinesAction::RallyScvs => p.idle_worker_count < baseline.idle_worker_count,
            BuildMarinesAction::NoOp => true,
        }
    }

    fn supply_free(p: &PlayerStats) -> bool {
        p.food_used < p.food_cap
    }

    fn should_make_scv(&self, obs: &RawObs) -> bool {
        let p = &obs.player;
        let queue_empty =
            p.single_select != Some(unit_type::COMMAND_CENTER) || p.build_queue_len == 0;
        p.minerals >= SCV_COST
            && Self::supply_free(p)
            && p.food_workers < self.config.max_scvs
            && queue_empty
            && obs.layers.unit_pixels(unit_type::COMMAND_CENTER) > 0
    }

    fn should_kill_marine(&self, obs: &RawObs) -> bool {
        let p = &obs.player;
        let n_barracks = obs.layers.unit_pixels(unit_type::BARRACKS) / PIXELS_PER_BARRACKS;
        let n_marines = p.food_army.saturating_sub(n_barracks as u32);
        n_marines >= 2
            && (p.minerals < MARINE_COST || !Self::supply_free(p))
            && obs.layers.unit_pixels(unit_type::MARINE) > 0
    }
}

impl ActionTranslator for BuildMarinesActuator {
    type Config = BuildMarinesConfig;
    type Action = BuildMarinesAction;

    fn build(config: &Self::Config) -> Self {
        Self {
            config: config.clone(),
            in_progress: None,
        }
    }

    fn reset(&mut self) {
        self.in_progress = None;
    }

    fn compute_primitive(
        &mut self,
        action: BuildMarinesAction,
        obs: &RawObs,
    ) -> Result<PrimitiveCommand> {
        match self.in_progress {
            None => {
                let command = Self::select(action, obs)?;
                if action != BuildMarinesAction::NoOp {
                    self.in_progress = Some((action, Progress::Selecting));
                }
                Ok(command)
            }
            Some((current, Progress::Selecting)) => match Self::order(current, obs) {
                Ok(command) => {
                    self.in_progress = Some((
                        current,
                        Progress::Ordered {
                            baseline: Baseline::from(&obs.player),
                            waited: 0,
                        },
                    ));
                    Ok(command)
                }
                // the target vanished between the selection and the order
                Err(e) => {
                    warn!("{:?} aborted before its order: {}", current, e);
                    self.in_progress = None;
                    Ok(PrimitiveCommand::NoOp)
                }
            },
            Some((current, Progress::Ordered { baseline, waited })) => {
                if Self::completed(current, &baseline, &obs.player) {
                    trace!("{:?} completed after {} ticks", current, waited);
                    self.in_progress = None;
                } else if waited + 1 >= self.config.max_wait_ticks {
                    warn!("{:?} had no visible effect, giving up", current);
                    self.in_progress = None;
                } else {
                    self.in_progress = Some((
                        current,
                        Progress::Ordered {
                            baseline,
                            waited: waited + 1,
                        },
                    ));
                }
                Ok(PrimitiveCommand::NoOp)
            }
        }
    }

    fn is_idle(&self) -> bool {
        self.in_progress.is_none()
    }

    fn discard_in_progress(&mut self) {
        self.in_progress = None;
    }

    fn helper_action(&self, obs: &RawObs) -> Option<BuildMarinesAction> {
        if self.config.rally_helper
            && obs.player.idle_worker_count > 0
            && obs.layers.unit_pixels(unit_type::MINERAL_FIELD) > 0
        {
            Some(BuildMarinesAction::RallyScvs)
        } else if self.config.scv_helper && self.should_make_scv(obs) {
            Some(BuildMarinesAction::MakeScv)
        } else if self.config.kill_helper && self.should_kill_marine(obs) {
            Some(BuildMarinesAction::KillMarine)
        } else {
            None
        }
    }

    fn check_invariants(&self, _obs: &RawObs) -> Result<()> {
        Ok(())
    }

    fn available_actions(&self, obs: &RawObs) -> Vec<bool> {
        let p = &obs.player;
        let has = |unit| obs.layers.unit_pixels(unit) > 0;
        vec![
            true,
            p.minerals >= SCV_COST && Self::supply_free(p) && has(unit_type::COMMAND_CENTER),
            p.minerals >= SUPPLY_DEPOT_COST && has(unit_type::SCV),
            p.minerals >= BARRACKS_COST && has(unit_type::SCV) && has(unit_type::SUPPLY_DEPOT),
            p.minerals >= MARINE_COST && Self::supply_free(p) && has(unit_type::BARRACKS),
            has(unit_type::MARINE),
            p.idle_worker_count > 0 && has(unit_type::MINERAL_FIELD),
        ]
    }

    fn action_space(&self) -> ActionSpace {
        let mut applicable = vec![vec![]; BuildMarinesAction::N];
        applicable[2] = vec![SubChoice::Primary];
        applicable[3] = vec![SubChoice::Primary];
        ActionSpace {
            n_base: BuildMarinesAction::N,
            spatial_width: self.config.screen_size,
            applicable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_obs() -> RawObs {
        let mut obs = RawObs::empty(16);
        obs.layers.unit_type[[2, 2]] = unit_type::COMMAND_CENTER;
        obs.layers.unit_type[[5, 6]] = unit_type::SCV;
        obs.layers.friendly_density[[5, 6]] = 1.0;
        obs.layers.unit_type[[0, 10]] = unit_type::MINERAL_FIELD;
        obs.layers.unit_type[[7, 3]] = unit_type::MINERAL_FIELD;
        obs.player = PlayerStats {
            minerals: 200,
            food_used: 12,
            food_cap: 15,
            food_workers: 12,
            ..Default::default()
        };
        obs
    }

    fn actuator() -> BuildMarinesActuator {
        BuildMarinesActuator::build(&BuildMarinesConfig::default().screen_size(16))
    }

    #[test]
    fn test_build_supply_depot_sequence() -> Result<()> {
        let mut t = actuator();
        let target = ScreenPoint::new(8, 8);
        let action = BuildMarinesAction::BuildSupplyDepot(target);
        let mut obs = base_obs();

        let cmd = t.compute_primitive(action, &obs)?;
        assert_eq!(cmd, PrimitiveCommand::SelectPoint(ScreenPoint::new(6, 5)));
        assert!(!t.is_idle());

        // the action argument is ignored while in progress
        let cmd = t.compute_primitive(BuildMarinesAction::NoOp, &obs)?;
        assert_eq!(cmd, PrimitiveCommand::BuildSupplyDepot(target));

        assert_eq!(t.compute_primitive(action, &obs)?, PrimitiveCommand::NoOp);
        assert!(!t.is_idle());

        obs.player.minerals -= SUPPLY_DEPOT_COST;
        assert_eq!(t.compute_primitive(action, &obs)?, PrimitiveCommand::NoOp);
        assert!(t.is_idle());
        Ok(())
    }

    #[test]
    fn test_wait_is_bounded() -> Result<()> {
        let mut t = BuildMarinesActuator::build(&BuildMarinesConfig::default().max_wait_ticks(3));
        let obs = base_obs();
        t.compute_primitive(BuildMarinesAction::MakeScv, &obs)?;
        t.compute_primitive(BuildMarinesAction::MakeScv, &obs)?;
        let mut n = 0;
        while !t.is_idle() {
            t.compute_primitive(BuildMarinesAction::NoOp, &obs)?;
            n += 1;
        }
        assert_eq!(n, 3);
        Ok(())
    }

    #[test]
    fn test_missing_units_fail() {
        let mut t = actuator();
        let obs = RawObs::empty(16);
        for a in [
            BuildMarinesAction::MakeScv,
            BuildMarinesAction::MakeMarine,
            BuildMarinesAction::KillMarine,
            BuildMarinesAction::RallyScvs,
        ] {
            let err = t.compute_primitive(a, &obs).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<TacticError>(),
                Some(TacticError::InvalidState(_))
            ));
            assert!(t.is_idle());
        }
    }

    #[test]
    fn test_rally_targets_closest_minerals() -> Result<()> {
        let mut t = actuator();
        let mut obs = base_obs();
        obs.player.idle_worker_count = 1;
        assert_eq!(t.helper_action(&obs), Some(BuildMarinesAction::RallyScvs));
        let a = BuildMarinesAction::RallyScvs;
        assert_eq!(t.compute_primitive(a, &obs)?, PrimitiveCommand::SelectIdleWorker);
        assert_eq!(
            t.compute_primitive(a, &obs)?,
            PrimitiveCommand::HarvestScreen(ScreenPoint::new(3, 7))
        );
        Ok(())
    }

    #[test]
    fn test_helpers() {
        let t = actuator();
        let mut obs = base_obs();
        assert_eq!(t.helper_action(&obs), Some(BuildMarinesAction::MakeScv));

        obs.player.food_workers = 20;
        assert_eq!(t.helper_action(&obs), None);

        obs.layers.unit_type[[12, 12]] = unit_type::MARINE;
        obs.player.food_army = 3;
        obs.player.food_used = 15;
        obs.player.minerals = 10;
        assert_eq!(t.helper_action(&obs), Some(BuildMarinesAction::KillMarine));

        let quiet = BuildMarinesActuator::build(&BuildMarinesConfig::default().helpers(false));
        assert_eq!(quiet.helper_action(&obs), None);
    }

    #[test]
    fn test_kill_marine_when_minerals_are_low() {
        let t = actuator();
        let mut obs = base_obs();
        obs.layers.unit_type[[12, 12]] = unit_type::MARINE;
        obs.player.food_army = 3;
        obs.player.minerals = 10;
        obs.player.food_used = 14;
        obs.player.food_cap = 23;
        assert_eq!(t.helper_action(&obs), Some(BuildMarinesAction::KillMarine));
    }

    #[test]
    fn test_kill_marine_when_supply_is_capped() {
        let t = actuator();
        let mut obs = base_obs();
        obs.layers.unit_type[[12, 12]] = unit_type::MARINE;
        obs.player.food_army = 3;
        obs.player.minerals = 500;
        obs.player.food_used = 15;
        obs.player.food_cap = 15;
        assert_eq!(t.helper_action(&obs), Some(BuildMarinesAction::KillMarine));

        // a single marine is kept
        obs.player.food_army = 1;
        assert_eq!(t.helper_action(&obs), None);
    }

    #[test]
    fn test_vanished_target_aborts_the_action() -> Result<()> {
        let mut t = actuator();
        let mut obs = base_obs();
        obs.layers.unit_type[[12, 12]] = unit_type::MARINE;
        let a = BuildMarinesAction::KillMarine;
        assert_eq!(t.compute_primitive(a, &obs)?, PrimitiveCommand::SelectArmy);
        assert!(!t.is_idle());

        obs.layers.unit_type[[12, 12]] = 0;
        assert_eq!(t.compute_primitive(a, &obs)?, PrimitiveCommand::NoOp);
        assert!(t.is_idle());
        Ok(())
    }

    #[test]
    fn test_available_actions() {
        let t = actuator();
        let mut obs = base_obs();
        assert_eq!(
            t.available_actions(&obs),
            vec![true, true, true, false, false, false, false]
        );
        obs.layers.unit_type[[13, 13]] = unit_type::SUPPLY_DEPOT;
        obs.layers.unit_type[[14, 14]] = unit_type::BARRACKS;
        assert_eq!(
            t.available_actions(&obs),
            vec![true, true, true, true, true, false, false]
        );
    }

    #[test]
    fn test_action_space_and_conversion() {
        let t = actuator();
        let space = t.action_space();
        assert_eq!(space.applicable_mask(3), [true, false]);
        assert_eq!(space.applicable_mask(1), [false, false]);
        assert_eq!(space.n_cells(), 256);

        let a = BuildMarinesAction::BuildBarracks(ScreenPoint::new(3, 7));
        let c = CompositeAction::from(a);
        assert_eq!(c.spatial, [Some((3, 7)), None]);
        assert_eq!(BuildMarinesAction::from(c), a);
    }
}
