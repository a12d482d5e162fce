//! Forest layout organizer.
//!
//! ## Trees
//!
//! ```text
//!                root                 root is centered over the combined
//!          ┌──────┼──────┐            extent of its children's subtrees
//!        left   median   right
//!   ◄── upper bound │ lower bound ──►
//! ```
//!
//! The median child (two for an even count) is laid out first, then the
//! left half outward with an upper bound at the last placed left edge and
//! the right half outward with a lower bound at the last placed right edge.
//! A bound translates the whole subtree just far enough to respect it.
//!
//! ## Forests
//!
//! Trees are laid out one at a time in root order and centered on the
//! configured center line. A tree that overlaps an already placed tree on
//! the fixed axis is moved into the free gap along the layout axis closest
//! to the center line.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{BoundingBox, Forest, LayoutConfig, Orientation};
use crate::types::{NodeId, Position};

/// Constraint on a subtree's extent along the layout axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// No constraint.
    Free,
    /// The subtree must start at or after this coordinate.
    Lower(f64),
    /// The subtree must end at or before this coordinate.
    Upper(f64),
}

/// One laid out tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeLayout {
    /// Root node.
    pub root: NodeId,
    /// Extent of every node in the tree.
    pub bounds: BoundingBox,
    /// Nodes placed in this tree, in placement order.
    pub nodes: Vec<NodeId>,
}

/// Result of a forest layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutResult {
    /// Position of every node.
    pub positions: BTreeMap<NodeId, Position>,
    /// Trees in placement order.
    pub trees: Vec<TreeLayout>,
}

impl LayoutResult {
    /// Bounding box of a single node.
    pub fn node_box(&self, id: NodeId, config: &LayoutConfig) -> Option<BoundingBox> {
        let position = self.positions.get(&id)?;
        let (coord, fixed) = match config.orientation {
            Orientation::Horizontal => (position.x, position.y),
            Orientation::Vertical => (position.y, position.x),
        };
        Some(BoundingBox::around(coord, fixed, config))
    }
}

/// Lays out one [`Forest`] with one [`LayoutConfig`].
pub struct LayoutOrganizer<'a> {
    forest: &'a Forest,
    config: &'a LayoutConfig,
    coords: BTreeMap<NodeId, f64>,
    placed: Vec<NodeId>,
}

impl<'a> LayoutOrganizer<'a> {
    /// Create an organizer with no node placed.
    pub fn new(forest: &'a Forest, config: &'a LayoutConfig) -> Self {
        Self {
            forest,
            config,
            coords: BTreeMap::new(),
            placed: Vec::new(),
        }
    }

    /// Layout-axis coordinate assigned to `id` so far.
    pub fn coordinate(&self, id: NodeId) -> Option<f64> {
        self.coords.get(&id).copied()
    }

    fn fixed(&self, id: NodeId) -> f64 {
        self.forest.node(id).map(|n| n.fixed).unwrap_or(0.0)
    }

    fn shift(&mut self, from: usize, delta: f64) {
        for id in &self.placed[from..] {
            if let Some(coord) = self.coords.get_mut(id) {
                *coord += delta;
            }
        }
    }

    /// Lay out the subtree under `root` and return its extent.
    ///
    /// Every node has a single last parent, so each node is placed once per
    /// forest pass.
    pub fn layout_tree(&mut self, root: NodeId, bound: Bound) -> BoundingBox {
        let start = self.placed.len();
        self.placed.push(root);

        let children = self.forest.placed_children(root);
        let fixed = self.fixed(root);
        let spacing = self.config.sibling_spacing;

        let mut extent: Option<BoundingBox> = None;
        if !children.is_empty() {
            let mid = children.len() / 2;
            let (left, right, mut left_edge, mut right_edge) = if children.len() % 2 == 1 {
                let median = self.layout_tree(children[mid], Bound::Free);
                extent = Some(median);
                (&children[..mid], &children[mid + 1..], median.lo, median.hi)
            } else {
                (&children[..mid], &children[mid..], spacing / 2.0, -spacing / 2.0)
            };

            for &child in left.iter().rev() {
                let placed = self.layout_tree(child, Bound::Upper(left_edge - spacing));
                left_edge = placed.lo;
                extent = Some(extent.map_or(placed, |e| e.union(&placed)));
            }
            for &child in right {
                let placed = self.layout_tree(child, Bound::Lower(right_edge + spacing));
                right_edge = placed.hi;
                extent = Some(extent.map_or(placed, |e| e.union(&placed)));
            }
        }

        let coord = extent.map_or(0.0, |e| e.center());
        self.coords.insert(root, coord);
        let own = BoundingBox::around(coord, fixed, self.config);
        let mut bounds = extent.map_or(own, |e| e.union(&own));

        let delta = match bound {
            Bound::Free => 0.0,
            Bound::Lower(lower) => lower - bounds.lo,
            Bound::Upper(upper) => upper - bounds.hi,
        };
        if delta != 0.0 {
            self.shift(start, delta);
            bounds = bounds.translated(delta);
        }
        bounds
    }

    /// Lay out every tree of the forest.
    pub fn layout_forest(mut self) -> LayoutResult {
        let center = self.config.center;
        let mut trees: Vec<TreeLayout> = Vec::new();

        for root in self.forest.roots() {
            let start = self.placed.len();
            let mut bounds = self.layout_tree(root, Bound::Free);

            let to_center = center - bounds.center();
            self.shift(start, to_center);
            bounds = bounds.translated(to_center);

            let spacing = self.config.tree_spacing;
            let occupied: Vec<(f64, f64)> = trees
                .iter()
                .filter(|tree| tree.bounds.overlaps_fixed(&bounds))
                .map(|tree| (tree.bounds.lo - spacing, tree.bounds.hi + spacing))
                .collect();

            if occupied.iter().any(|&(lo, hi)| bounds.lo < hi && lo < bounds.hi) {
                let target = closest_gap(&occupied, bounds.width(), center);
                let delta = target - bounds.lo;
                self.shift(start, delta);
                bounds = bounds.translated(delta);
                tracing::trace!(%root, delta, "tree moved to avoid overlap");
            }

            trees.push(TreeLayout {
                root,
                bounds,
                nodes: self.placed[start..].to_vec(),
            });
        }

        let orientation = self.config.orientation;
        let positions = self
            .coords
            .iter()
            .map(|(&id, &coord)| {
                let fixed = self.fixed(id);
                let position = match orientation {
                    Orientation::Horizontal => Position::new(coord, fixed),
                    Orientation::Vertical => Position::new(fixed, coord),
                };
                (id, position)
            })
            .collect();

        LayoutResult { positions, trees }
    }
}

/// Start coordinate for a tree of `width` inside the gap between `occupied`
/// intervals whose placement is closest to `center`. The first gap wins ties.
fn closest_gap(occupied: &[(f64, f64)], width: f64, center: f64) -> f64 {
    let mut intervals = occupied.to_vec();
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::new();
    for (lo, hi) in intervals {
        match merged.last_mut() {
            Some(last) if lo <= last.1 => last.1 = last.1.max(hi),
            _ => merged.push((lo, hi)),
        }
    }

    let mut gaps = Vec::with_capacity(merged.len() + 1);
    let mut cursor = f64::NEG_INFINITY;
    for &(lo, hi) in &merged {
        gaps.push((cursor, lo));
        cursor = hi;
    }
    gaps.push((cursor, f64::INFINITY));

    let ideal = center - width / 2.0;
    let mut best: Option<(f64, f64)> = None;
    for (lo, hi) in gaps {
        if hi - lo < width {
            continue;
        }
        let start = ideal.max(lo).min(hi - width);
        let distance = (start + width / 2.0 - center).abs();
        if best.map_or(true, |(d, _)| distance < d) {
            best = Some((distance, start));
        }
    }

    best.map_or(cursor, |(_, start)| start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ForestNode;

    fn node(i: usize, name: &str, parents: &[usize], children: &[usize]) -> ForestNode {
        ForestNode {
            id: NodeId::from_index(i),
            name: name.to_string(),
            parents: parents.iter().map(|&p| NodeId::from_index(p)).collect(),
            children: children.iter().map(|&c| NodeId::from_index(c)).collect(),
            fixed: 0.0,
            tiebreak: i as i64,
        }
    }

    fn id(i: usize) -> NodeId {
        NodeId::from_index(i)
    }

    fn config() -> LayoutConfig {
        LayoutConfig {
            node_breadth: 10.0,
            node_thickness: 10.0,
            sibling_spacing: 4.0,
            tree_spacing: 6.0,
            ..LayoutConfig::tree_view()
        }
    }

    #[test]
    fn test_root_centered_over_children() {
        let mut nodes = vec![node(0, "r", &[], &[1, 2, 3])];
        for (i, name) in [(1, "a"), (2, "b"), (3, "c")] {
            let mut child = node(i, name, &[0], &[]);
            child.fixed = 20.0;
            nodes.push(child);
        }
        let forest = Forest::new(nodes);
        let config = config();
        let mut organizer = LayoutOrganizer::new(&forest, &config);
        let bounds = organizer.layout_tree(id(0), Bound::Free);

        assert_eq!(organizer.coordinate(id(2)), Some(0.0));
        assert_eq!(organizer.coordinate(id(1)), Some(-14.0));
        assert_eq!(organizer.coordinate(id(3)), Some(14.0));
        assert_eq!(organizer.coordinate(id(0)), Some(0.0));
        assert_eq!((bounds.lo, bounds.hi), (-19.0, 19.0));
    }

    #[test]
    fn test_even_children_straddle_root() {
        let forest = Forest::new([
            node(0, "r", &[], &[1, 2]),
            node(1, "a", &[0], &[]),
            node(2, "b", &[0], &[]),
        ]);
        let config = config();
        let mut organizer = LayoutOrganizer::new(&forest, &config);
        organizer.layout_tree(id(0), Bound::Free);

        assert_eq!(organizer.coordinate(id(1)), Some(-7.0));
        assert_eq!(organizer.coordinate(id(2)), Some(7.0));
        assert_eq!(organizer.coordinate(id(0)), Some(0.0));
    }

    #[test]
    fn test_bounds_translate_subtree() {
        let forest = Forest::new([node(0, "r", &[], &[1]), node(1, "a", &[0], &[])]);
        let config = config();
        let mut organizer = LayoutOrganizer::new(&forest, &config);
        let bounds = organizer.layout_tree(id(0), Bound::Lower(100.0));
        assert_eq!(bounds.lo, 100.0);
        assert_eq!(organizer.coordinate(id(1)), Some(105.0));

        let mut organizer = LayoutOrganizer::new(&forest, &config);
        let bounds = organizer.layout_tree(id(0), Bound::Upper(-50.0));
        assert_eq!(bounds.hi, -50.0);
        assert_eq!(organizer.coordinate(id(0)), Some(-55.0));
    }

    #[test]
    fn test_overlapping_trees_are_separated() {
        let forest = Forest::new([node(0, "a", &[], &[]), node(1, "b", &[], &[]), node(2, "c", &[], &[])]);
        let config = config();
        let result = LayoutOrganizer::new(&forest, &config).layout_forest();

        assert_eq!(result.positions[&id(0)], Position::new(0.0, 0.0));
        assert_eq!(result.positions[&id(1)], Position::new(-16.0, 0.0));
        assert_eq!(result.positions[&id(2)], Position::new(16.0, 0.0));
    }

    #[test]
    fn test_trees_on_disjoint_levels_share_center() {
        let mut late = node(1, "b", &[], &[]);
        late.fixed = 100.0;
        let forest = Forest::new([node(0, "a", &[], &[]), late]);
        let config = config();
        let result = LayoutOrganizer::new(&forest, &config).layout_forest();

        assert_eq!(result.positions[&id(0)].x, 0.0);
        assert_eq!(result.positions[&id(1)].x, 0.0);
    }

    #[test]
    fn test_closest_gap_prefers_first_on_tie() {
        assert_eq!(closest_gap(&[(-5.0, 5.0)], 4.0, 0.0), -9.0);
        assert_eq!(closest_gap(&[(-5.0, 5.0), (5.0, 20.0)], 4.0, 0.0), -9.0);
        assert_eq!(closest_gap(&[(-20.0, -1.0), (10.0, 20.0)], 4.0, 0.0), -1.0);
    }
}
