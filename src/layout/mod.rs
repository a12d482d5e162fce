//! Forest layout for the structural view and the timeline.
//!
//! Both views lay out a DAG as a forest of trees. Positions have two axes:
//!
//! | Axis | Structural view | Timeline |
//! |------|-----------------|----------|
//! | fixed | `y = depth × level_spacing` | `x = offset × time_scale` |
//! | layout | `x`, spread by the organizer | `y`, spread by the organizer |
//!
//! The fixed axis is decided by the node alone; the organizer only moves
//! nodes along the layout axis.

pub mod config;
pub mod forest;
pub mod organizer;

use serde::{Deserialize, Serialize};

pub use config::{LayoutConfig, LayoutSettings};
pub use forest::{Forest, ForestNode};
pub use organizer::{Bound, LayoutOrganizer, LayoutResult, TreeLayout};

/// Which screen axis is the layout axis.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Siblings spread along `x`; depth grows along `y`.
    #[default]
    Horizontal,
    /// Siblings spread along `y`; time grows along `x`.
    Vertical,
}

/// Axis-aligned extent in layout coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Start on the layout axis.
    pub lo: f64,
    /// End on the layout axis.
    pub hi: f64,
    /// Start on the fixed axis.
    pub fixed_lo: f64,
    /// End on the fixed axis.
    pub fixed_hi: f64,
}

impl BoundingBox {
    /// Box of a single node centered at (`coord`, `fixed`).
    pub fn around(coord: f64, fixed: f64, config: &LayoutConfig) -> Self {
        let half_breadth = config.node_breadth / 2.0;
        let half_thickness = config.node_thickness / 2.0;
        Self {
            lo: coord - half_breadth,
            hi: coord + half_breadth,
            fixed_lo: fixed - half_thickness,
            fixed_hi: fixed + half_thickness,
        }
    }

    /// Smallest box containing both.
    pub fn union(&self, other: &Self) -> Self {
        Self {
            lo: self.lo.min(other.lo),
            hi: self.hi.max(other.hi),
            fixed_lo: self.fixed_lo.min(other.fixed_lo),
            fixed_hi: self.fixed_hi.max(other.fixed_hi),
        }
    }

    /// Same box moved by `delta` along the layout axis.
    pub fn translated(&self, delta: f64) -> Self {
        Self {
            lo: self.lo + delta,
            hi: self.hi + delta,
            ..*self
        }
    }

    /// Extent along the layout axis.
    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    /// Middle of the layout-axis extent.
    pub fn center(&self) -> f64 {
        (self.lo + self.hi) / 2.0
    }

    /// Whether the fixed-axis ranges overlap (touching does not count).
    pub fn overlaps_fixed(&self, other: &Self) -> bool {
        self.fixed_lo < other.fixed_hi && other.fixed_lo < self.fixed_hi
    }

    /// Whether the layout-axis ranges overlap (touching does not count).
    pub fn overlaps_layout(&self, other: &Self) -> bool {
        self.lo < other.hi && other.lo < self.hi
    }

    /// Whether the boxes share any area.
    pub fn intersects(&self, other: &Self) -> bool {
        self.overlaps_fixed(other) && self.overlaps_layout(other)
    }
}
