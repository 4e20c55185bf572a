//! Primitive commands accepted by the simulator, one per tick.
use serde::{Deserialize, Serialize};

/// A cell of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenPoint {
    /// Column.
    pub x: usize,

    /// Row.
    pub y: usize,
}

impl ScreenPoint {
    /// Constructs a point.
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// A command the simulator executes in a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimitiveCommand {
    /// Does nothing.
    NoOp,

    /// Selects all army units.
    SelectArmy,

    /// Selects an idle worker.
    SelectIdleWorker,

    /// Selects the unit at a point.
    SelectPoint(ScreenPoint),

    /// Selects all units of the type found at a point.
    SelectAllOfType(ScreenPoint),

    /// Moves the selection to a point.
    MoveScreen(ScreenPoint),

    /// Attacks a point with the selection.
    AttackScreen(ScreenPoint),

    /// Sends the selected workers to harvest at a point.
    HarvestScreen(ScreenPoint),

    /// Builds a supply depot at a point with the selected worker.
    BuildSupplyDepot(ScreenPoint),

    /// Builds barracks at a point with the selected worker.
    BuildBarracks(ScreenPoint),

    /// Queues a worker at the selected command centre.
    TrainScv,

    /// Queues a marine at the selected barracks.
    TrainMarine,
}
