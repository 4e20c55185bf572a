//! Structured action space shared by environments and agents.
//!
//! Environments describe their actions as tagged enums. Agents work on
//! [`CompositeAction`]: a base discrete choice plus up to two spatial
//! sub-choices (screen cells). [`ActionSpace`] says, for every base action,
//! which sub-choices it actually uses. Sub-choices that are not applicable
//! must not contribute to the log-probability of an action.
use serde::{Deserialize, Serialize};

/// A spatial sub-choice slot of a composite action.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Hash)]
pub enum SubChoice {
    /// The first spatial target.
    Primary,

    /// The second spatial target.
    Secondary,
}

impl SubChoice {
    /// Slot index of the sub-choice.
    pub fn index(&self) -> usize {
        match self {
            Self::Primary => 0,
            Self::Secondary => 1,
        }
    }
}

/// A composite action: base choice and spatial sub-choices.
///
/// Spatial sub-choices are screen cells `(x, y)`.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
pub struct CompositeAction {
    /// Index of the base action.
    pub base: usize,

    /// Spatial sub-choices, `None` when not applicable.
    pub spatial: [Option<(usize, usize)>; 2],
}

impl CompositeAction {
    /// A composite action without spatial sub-choices.
    pub fn base(base: usize) -> Self {
        Self {
            base,
            spatial: [None, None],
        }
    }

    /// A composite action with the primary spatial sub-choice.
    pub fn with_primary(base: usize, x: usize, y: usize) -> Self {
        Self {
            base,
            spatial: [Some((x, y)), None],
        }
    }
}

/// Describes the base actions and their applicable sub-choices.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ActionSpace {
    /// The number of base actions.
    pub n_base: usize,

    /// Width of the square spatial grid of sub-choices.
    pub spatial_width: usize,

    /// Applicable sub-choices of every base action.
    pub applicable: Vec<Vec<SubChoice>>,
}

impl ActionSpace {
    /// Constructs an action space without spatial sub-choices.
    pub fn discrete(n_base: usize) -> Self {
        Self {
            n_base,
            spatial_width: 0,
            applicable: vec![vec![]; n_base],
        }
    }

    /// Returns `true` if any base action uses a spatial sub-choice.
    pub fn has_spatial(&self) -> bool {
        self.spatial_width > 0 && self.applicable.iter().any(|a| !a.is_empty())
    }

    /// The number of cells of the spatial grid.
    pub fn n_cells(&self) -> usize {
        self.spatial_width * self.spatial_width
    }

    /// Mask of applicable sub-choice slots of a base action.
    pub fn applicable_mask(&self, base: usize) -> [bool; 2] {
        let mut mask = [false; 2];
        if let Some(subs) = self.applicable.get(base) {
            for s in subs.iter() {
                mask[s.index()] = true;
            }
        }
        mask
    }

    /// Converts a flat cell index into `(x, y)`.
    pub fn cell_to_xy(&self, cell: usize) -> (usize, usize) {
        (cell % self.spatial_width, cell / self.spatial_width)
    }

    /// Converts `(x, y)` into a flat cell index.
    pub fn xy_to_cell(&self, x: usize, y: usize) -> usize {
        y * self.spatial_width + x
    }
}
