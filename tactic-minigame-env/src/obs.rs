//! Observations of minigame environments.
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tactic_core::Obs;

/// Unit type identifiers appearing in the `unit_type` screen layer.
pub mod unit_type {
    /// Command centre.
    pub const COMMAND_CENTER: u32 = 18;

    /// Supply depot.
    pub const SUPPLY_DEPOT: u32 = 19;

    /// Barracks.
    pub const BARRACKS: u32 = 21;

    /// Worker unit.
    pub const SCV: u32 = 45;

    /// Marine.
    pub const MARINE: u32 = 48;

    /// Mineral field.
    pub const MINERAL_FIELD: u32 = 341;
}

/// Scale applied to hit points in feature vectors.
const HIT_POINT_SCALE: f32 = 0.01;

/// Scale applied to player statistics in feature vectors.
const PLAYER_SCALE: f32 = 0.01;

/// Square screen layers of a single simulator frame.
///
/// All layers are indexed as `[[y, x]]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenLayers {
    /// 1 where a currently selected own unit is.
    pub selected: Array2<f32>,

    /// Density of own units.
    pub friendly_density: Array2<f32>,

    /// Density of enemy units.
    pub enemy_density: Array2<f32>,

    /// Hit points of enemy units.
    pub enemy_hit_points: Array2<f32>,

    /// Unit type identifier per cell, 0 for none.
    pub unit_type: Array2<u32>,
}

impl ScreenLayers {
    /// Empty layers of the given size.
    pub fn zeros(size: usize) -> Self {
        Self {
            selected: Array2::zeros((size, size)),
            friendly_density: Array2::zeros((size, size)),
            enemy_density: Array2::zeros((size, size)),
            enemy_hit_points: Array2::zeros((size, size)),
            unit_type: Array2::zeros((size, size)),
        }
    }

    /// Width of the screen.
    pub fn size(&self) -> usize {
        self.selected.ncols()
    }

    /// Returns `true` if any own unit is selected.
    pub fn has_selection(&self) -> bool {
        self.selected.iter().any(|v| *v > 0.0)
    }

    /// Returns `true` if any own unit is on screen.
    pub fn has_friendly(&self) -> bool {
        self.friendly_density.iter().any(|v| *v > 0.0)
    }

    /// Returns `true` if any enemy unit is on screen.
    pub fn has_enemy(&self) -> bool {
        self.enemy_density.iter().any(|v| *v > 0.0)
    }

    /// The number of cells occupied by the given unit type.
    pub fn unit_pixels(&self, unit: u32) -> usize {
        self.unit_type.iter().filter(|t| **t == unit).count()
    }

    fn push_features(&self, out: &mut Vec<f32>) {
        out.extend(self.selected.iter());
        out.extend(self.friendly_density.iter());
        out.extend(self.enemy_density.iter());
        out.extend(self.enemy_hit_points.iter().map(|v| v * HIT_POINT_SCALE));
        out.extend(
            self.unit_type
                .iter()
                .map(|t| if *t == 0 { 0.0 } else { 1.0 }),
        );
    }
}

/// Player-level statistics of a frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Minerals in the bank.
    pub minerals: u32,

    /// Supply in use.
    pub food_used: u32,

    /// Supply cap.
    pub food_cap: u32,

    /// Supply used by workers.
    pub food_workers: u32,

    /// Supply used by army units.
    pub food_army: u32,

    /// The number of idle workers.
    pub idle_worker_count: u32,

    /// Unit type of a single selected unit, if exactly one is selected.
    pub single_select: Option<u32>,

    /// Length of the production queue of the selected building.
    pub build_queue_len: usize,
}

impl PlayerStats {
    fn push_features(&self, out: &mut Vec<f32>) {
        out.extend([
            self.minerals as f32 * PLAYER_SCALE,
            self.food_used as f32 * PLAYER_SCALE,
            self.food_cap as f32 * PLAYER_SCALE,
            self.food_workers as f32 * PLAYER_SCALE,
            self.food_army as f32 * PLAYER_SCALE,
            self.idle_worker_count as f32 * PLAYER_SCALE,
            self.build_queue_len as f32 * PLAYER_SCALE,
        ]);
    }
}

/// A single simulator frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawObs {
    /// Screen layers.
    pub layers: ScreenLayers,

    /// Player statistics.
    pub player: PlayerStats,

    /// Reward of the tick that produced this frame.
    pub reward: f32,

    /// `true` for the last frame of an episode.
    pub is_last: bool,
}

impl RawObs {
    /// An empty, non-terminal frame.
    pub fn empty(size: usize) -> Self {
        Self {
            layers: ScreenLayers::zeros(size),
            player: PlayerStats::default(),
            reward: 0.0,
            is_last: false,
        }
    }
}

/// Observation at a decision point.
///
/// It combines the previous and the current frame so that motion is visible
/// to a policy without memory.
#[derive(Debug, Clone, PartialEq)]
pub struct MinigameObs {
    /// Layers of the frame before the current one.
    pub prev: ScreenLayers,

    /// Layers of the current frame.
    pub curr: ScreenLayers,

    /// Player statistics of the current frame.
    pub player: PlayerStats,

    /// Availability of every base action.
    pub avail: Vec<bool>,
}

impl Obs for MinigameObs {
    fn features(&self) -> Vec<f32> {
        let n = self.curr.size() * self.curr.size();
        let mut out = Vec::with_capacity(10 * n + 7);
        self.prev.push_features(&mut out);
        self.curr.push_features(&mut out);
        self.player.push_features(&mut out);
        out
    }

    fn avail_actions(&self) -> Vec<bool> {
        self.avail.clone()
    }
}

/// The length of [`MinigameObs::features`] for a given screen size.
pub fn feature_dim(screen_size: usize) -> usize {
    10 * screen_size * screen_size + 7
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_layout() {
        let mut curr = ScreenLayers::zeros(3);
        curr.friendly_density[[1, 2]] = 1.0;
        curr.unit_type[[0, 0]] = unit_type::MARINE;
        let obs = MinigameObs {
            prev: ScreenLayers::zeros(3),
            curr,
            player: PlayerStats {
                minerals: 100,
                ..Default::default()
            },
            avail: vec![true, false],
        };
        let f = obs.features();
        assert_eq!(f.len(), feature_dim(3));
        // current frame starts after the five previous layers
        assert_eq!(f[5 * 9 + 9 + 5], 1.0);
        assert_eq!(f[5 * 9 + 4 * 9], 1.0);
        assert_eq!(f[10 * 9], 1.0);
        assert_eq!(obs.avail_actions(), vec![true, false]);
    }

    #[test]
    fn test_layer_queries() {
        let mut layers = ScreenLayers::zeros(4);
        assert!(!layers.has_selection());
        assert!(!layers.has_friendly());
        layers.selected[[3, 1]] = 1.0;
        layers.unit_type[[0, 1]] = unit_type::BARRACKS;
        layers.unit_type[[0, 2]] = unit_type::BARRACKS;
        assert!(layers.has_selection());
        assert_eq!(layers.unit_pixels(unit_type::BARRACKS), 2);
        assert_eq!(layers.size(), 4);
    }
}
