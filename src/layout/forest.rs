//! Layout input: a DAG viewed as a forest.
//!
//! A node may have several parents, but it is placed under exactly one of
//! them, its *last parent*: the parent with the greatest depth (longest path
//! from a root), ties broken by sibling order. Every other parent sees it as
//! a cross link that the organizer does not lay out again.

use std::cmp::Ordering;
use std::collections::{BTreeMap, VecDeque};

use super::LayoutConfig;
use crate::graph::Graph;
use crate::types::NodeId;

/// One node of a [`Forest`].
#[derive(Debug, Clone, PartialEq)]
pub struct ForestNode {
    /// Node handle in the source graph.
    pub id: NodeId,
    /// Display name, primary sort key among siblings.
    pub name: String,
    /// Direct parents.
    pub parents: Vec<NodeId>,
    /// Direct children.
    pub children: Vec<NodeId>,
    /// Position on the fixed axis.
    pub fixed: f64,
    /// Secondary sort key for siblings with the same folded name.
    pub tiebreak: i64,
}

/// Layout input graph.
#[derive(Debug, Clone, Default)]
pub struct Forest {
    nodes: BTreeMap<NodeId, ForestNode>,
    depths: BTreeMap<NodeId, usize>,
}

impl Forest {
    /// Build a forest from nodes; adjacency must be consistent and acyclic.
    pub fn new(nodes: impl IntoIterator<Item = ForestNode>) -> Self {
        let nodes: BTreeMap<NodeId, ForestNode> = nodes.into_iter().map(|n| (n.id, n)).collect();
        let depths = longest_path_depths(&nodes);
        Self { nodes, depths }
    }

    /// Structural view of `graph`: depth sets the fixed axis, creation order
    /// breaks name ties.
    pub fn from_graph(graph: &Graph, config: &LayoutConfig) -> Self {
        let mut forest = Self::new(graph.nodes().map(|(id, node)| ForestNode {
            id,
            name: node.name().to_string(),
            parents: graph.parents(id),
            children: graph.children(id),
            fixed: 0.0,
            tiebreak: id.index() as i64,
        }));
        for (id, node) in forest.nodes.iter_mut() {
            let depth = forest.depths.get(id).copied().unwrap_or(0);
            node.fixed = depth as f64 * config.level_spacing;
        }
        forest
    }

    /// Timeline view of a stage graph: the offset sets the fixed axis and
    /// breaks name ties. Empty for step graphs.
    pub fn from_timeline(graph: &Graph, config: &LayoutConfig) -> Self {
        let Some(timeline) = graph.timeline() else {
            return Self::default();
        };
        Self::new(timeline.nodes().map(|node| {
            let seconds = node.offset.num_seconds();
            ForestNode {
                id: node.stage,
                name: graph
                    .node(node.stage)
                    .map(|n| n.name().to_string())
                    .unwrap_or_default(),
                parents: timeline.parents(node.stage),
                children: timeline.children(node.stage),
                fixed: seconds as f64 * config.time_scale,
                tiebreak: seconds,
            }
        }))
    }

    /// Node behind a handle.
    pub fn node(&self, id: NodeId) -> Option<&ForestNode> {
        self.nodes.get(&id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the forest is empty.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Longest-path depth of `id` (roots are 0).
    pub fn depth(&self, id: NodeId) -> usize {
        self.depths.get(&id).copied().unwrap_or(0)
    }

    /// Sibling order: case-folded name, then the view's tiebreak, then the
    /// exact name.
    pub fn sibling_order(&self, a: NodeId, b: NodeId) -> Ordering {
        match (self.node(a), self.node(b)) {
            (Some(x), Some(y)) => x
                .name
                .to_lowercase()
                .cmp(&y.name.to_lowercase())
                .then(x.tiebreak.cmp(&y.tiebreak))
                .then_with(|| x.name.cmp(&y.name))
                .then(a.cmp(&b)),
            _ => a.cmp(&b),
        }
    }

    /// Roots in sibling order.
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.parents.is_empty())
            .map(|n| n.id)
            .collect();
        roots.sort_by(|&a, &b| self.sibling_order(a, b));
        roots
    }

    /// The parent `id` is laid out under.
    pub fn last_parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id)?.parents.iter().copied().max_by(|&a, &b| {
            self.depth(a)
                .cmp(&self.depth(b))
                .then_with(|| self.sibling_order(a, b))
        })
    }

    /// Children placed under `id`, in sibling order.
    pub fn placed_children(&self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut children: Vec<NodeId> = node
            .children
            .iter()
            .copied()
            .filter(|&child| self.last_parent(child) == Some(id))
            .collect();
        children.sort_by(|&a, &b| self.sibling_order(a, b));
        children.dedup();
        children
    }
}

/// Kahn's algorithm followed by a longest-path pass in topological order.
fn longest_path_depths(nodes: &BTreeMap<NodeId, ForestNode>) -> BTreeMap<NodeId, usize> {
    let mut in_degree: BTreeMap<NodeId, usize> = nodes
        .values()
        .map(|n| (n.id, n.parents.iter().filter(|p| nodes.contains_key(p)).count()))
        .collect();
    let mut queue: VecDeque<NodeId> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();
    let mut depths: BTreeMap<NodeId, usize> = BTreeMap::new();

    while let Some(id) = queue.pop_front() {
        let depth = depths.get(&id).copied().unwrap_or(0);
        depths.entry(id).or_insert(depth);
        let Some(node) = nodes.get(&id) else { continue };
        for child in &node.children {
            let entry = depths.entry(*child).or_insert(0);
            *entry = (*entry).max(depth + 1);
            if let Some(remaining) = in_degree.get_mut(child) {
                *remaining = remaining.saturating_sub(1);
                if *remaining == 0 {
                    queue.push_back(*child);
                }
            }
        }
    }
    depths
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_depth_is_longest_path() {
        //  a → b → c, a → c
        let forest = Forest::new([
            node(0, "a", &[], &[1, 2]),
            node(1, "b", &[0], &[2]),
            node(2, "c", &[0, 1], &[]),
        ]);
        assert_eq!(forest.depth(id(2)), 2);
        assert_eq!(forest.last_parent(id(2)), Some(id(1)));
        assert_eq!(forest.placed_children(id(0)), vec![id(1)]);
        assert_eq!(forest.placed_children(id(1)), vec![id(2)]);
    }

    #[test]
    fn test_sibling_order_folds_case() {
        let forest = Forest::new([
            node(0, "beta", &[], &[]),
            node(1, "Alpha", &[], &[]),
            node(2, "alpha", &[], &[]),
        ]);
        assert_eq!(forest.roots(), vec![id(1), id(2), id(0)]);
    }

    #[test]
    fn test_equal_depth_parents_use_sibling_order() {
        let forest = Forest::new([
            node(0, "x", &[], &[2]),
            node(1, "y", &[], &[2]),
            node(2, "z", &[0, 1], &[]),
        ]);
        assert_eq!(forest.last_parent(id(2)), Some(id(1)));
        assert!(forest.placed_children(id(0)).is_empty());
    }
}
