//! Delta-dependency synchronizer.
//!
//! A delta stage's chronological predecessors are not its structural parents
//! but its **nearest delta ancestors**: the first delta stage found along
//! every backward path, bridging through listener stages that have no fixed
//! position in time. Descendants work the same way forward.
//!
//! ## Closure
//!
//! The timeline holds exactly one edge `(a, d)` for every pair of delta
//! stages joined by a structural path whose interior stages are all
//! listeners. [`induced_edges`] computes that set from scratch; the graph
//! keeps it incrementally with the snapshot protocol below.
//!
//! ## Snapshot protocol
//!
//! ```text
//! affected = delta stages whose dependencies the mutation can change
//! before   = dependencies(affected)      (on the old structure)
//! mutate structure / trigger
//! after    = dependencies(affected)      (on the new structure)
//! diff(before, after) → add / remove timeline edges
//! ```

use std::collections::{BTreeSet, HashSet, VecDeque};

use crate::graph::Graph;
use crate::timeline::TimelineEdge;
use crate::types::NodeId;

/// Timeline edges to add and remove after a mutation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyDiff {
    /// Pairs present only after the mutation.
    pub added: Vec<TimelineEdge>,
    /// Pairs present only before the mutation.
    pub removed: Vec<TimelineEdge>,
}

impl DependencyDiff {
    /// Whether nothing changed.
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Clone, Copy)]
enum Direction {
    Ancestors,
    Descendants,
}

/// Breadth-first search that stops at delta stages.
///
/// Delta stages reached are collected and not expanded; listener stages are
/// expanded through. The start node itself is never collected.
fn nearest_delta(graph: &Graph, start: NodeId, direction: Direction) -> BTreeSet<NodeId> {
    let mut found = BTreeSet::new();
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut frontier: VecDeque<NodeId> = VecDeque::new();

    visited.insert(start);
    frontier.push_back(start);

    while let Some(current) = frontier.pop_front() {
        let neighbors = match direction {
            Direction::Ancestors => graph.parents(current),
            Direction::Descendants => graph.children(current),
        };

        for next in neighbors {
            if !visited.insert(next) {
                continue;
            }
            if graph.is_delta(next) {
                found.insert(next);
            } else {
                frontier.push_back(next);
            }
        }
    }

    found
}

/// Nearest delta stages `node` is reachable from without crossing another
/// delta stage.
pub fn nearest_delta_ancestors(graph: &Graph, node: NodeId) -> BTreeSet<NodeId> {
    nearest_delta(graph, node, Direction::Ancestors)
}

/// Nearest delta stages reachable from `node` without crossing another
/// delta stage.
pub fn nearest_delta_descendants(graph: &Graph, node: NodeId) -> BTreeSet<NodeId> {
    nearest_delta(graph, node, Direction::Descendants)
}

/// Chronological dependency pairs of `node`: `(ancestor, node)` for every
/// nearest delta ancestor and `(node, descendant)` for every nearest delta
/// descendant.
pub fn dependencies(graph: &Graph, node: NodeId) -> BTreeSet<TimelineEdge> {
    let mut pairs: BTreeSet<TimelineEdge> = nearest_delta_ancestors(graph, node)
        .into_iter()
        .map(|ancestor| TimelineEdge::new(ancestor, node))
        .collect();
    pairs.extend(
        nearest_delta_descendants(graph, node)
            .into_iter()
            .map(|descendant| TimelineEdge::new(node, descendant)),
    );
    pairs
}

/// Pairs to add (only in `after`) and remove (only in `before`).
pub fn diff(before: &BTreeSet<TimelineEdge>, after: &BTreeSet<TimelineEdge>) -> DependencyDiff {
    DependencyDiff {
        added: after.difference(before).copied().collect(),
        removed: before.difference(after).copied().collect(),
    }
}

/// Union of the dependencies of every delta stage in `affected`.
///
/// Stages that are not currently delta contribute nothing: they have no
/// timeline node to hang edges on.
pub fn snapshot(graph: &Graph, affected: &BTreeSet<NodeId>) -> BTreeSet<TimelineEdge> {
    affected
        .iter()
        .filter(|&&node| graph.is_delta(node))
        .flat_map(|&node| dependencies(graph, node))
        .collect()
}

/// Stages whose dependencies change when `parent → child` is connected or
/// removed: the parent side (itself and its nearest delta ancestors) and the
/// child side (itself and its nearest delta descendants).
pub fn affected_by_edge(graph: &Graph, parent: NodeId, child: NodeId) -> BTreeSet<NodeId> {
    let mut affected = nearest_delta_ancestors(graph, parent);
    affected.insert(parent);
    affected.insert(child);
    affected.extend(nearest_delta_descendants(graph, child));
    affected
}

/// Stages whose dependencies change when `node` switches trigger kind: the
/// node itself and the nearest delta ancestors reached through its parents.
pub fn affected_by_trigger(graph: &Graph, node: NodeId) -> BTreeSet<NodeId> {
    let mut affected = nearest_delta_ancestors(graph, node);
    affected.insert(node);
    affected
}

/// Full recomputation of the induced timeline edge set.
pub fn induced_edges(graph: &Graph) -> BTreeSet<TimelineEdge> {
    graph
        .node_ids()
        .filter(|&node| graph.is_delta(node))
        .flat_map(|node| {
            nearest_delta_descendants(graph, node)
                .into_iter()
                .map(move |descendant| TimelineEdge::new(node, descendant))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphKind;
    use crate::types::{NodePayload, Trigger};

    fn stage(graph: &mut Graph, name: &str, trigger: Trigger) -> NodeId {
        graph.add_node(name, NodePayload::stage(trigger)).unwrap()
    }

    #[test]
    fn test_bridges_through_listeners() {
        //  a(Δ) → b(L) → c(L) → d(Δ) → e(Δ)
        let mut graph = Graph::new(GraphKind::Stage);
        let a = stage(&mut graph, "a", Trigger::delta_seconds(0));
        let b = stage(&mut graph, "b", Trigger::http_listener());
        let c = stage(&mut graph, "c", Trigger::http_listener());
        let d = stage(&mut graph, "d", Trigger::delta_seconds(10));
        let e = stage(&mut graph, "e", Trigger::delta_seconds(20));
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();
        graph.connect(c, d).unwrap();
        graph.connect(d, e).unwrap();

        assert_eq!(nearest_delta_descendants(&graph, a), BTreeSet::from([d]));
        assert_eq!(nearest_delta_ancestors(&graph, e), BTreeSet::from([d]));
        assert_eq!(nearest_delta_ancestors(&graph, c), BTreeSet::from([a]));
        assert!(nearest_delta_ancestors(&graph, a).is_empty());
    }

    #[test]
    fn test_diamond_is_deduplicated() {
        //      a(Δ)
        //     /    \
        //   b(L)  c(L)
        //     \    /
        //      d(Δ)
        let mut graph = Graph::new(GraphKind::Stage);
        let a = stage(&mut graph, "a", Trigger::delta_seconds(0));
        let b = stage(&mut graph, "b", Trigger::http_listener());
        let c = stage(&mut graph, "c", Trigger::http_listener());
        let d = stage(&mut graph, "d", Trigger::delta_seconds(5));
        graph.connect(a, b).unwrap();
        graph.connect(a, c).unwrap();
        graph.connect(b, d).unwrap();
        graph.connect(c, d).unwrap();

        assert_eq!(nearest_delta_descendants(&graph, a), BTreeSet::from([d]));
        assert_eq!(
            dependencies(&graph, d),
            BTreeSet::from([TimelineEdge::new(a, d)])
        );
        assert_eq!(induced_edges(&graph).len(), 1);
    }

    #[test]
    fn test_diff_compares_pairs() {
        let x = NodeId::from_index(0);
        let y = NodeId::from_index(1);
        let z = NodeId::from_index(2);
        let before = BTreeSet::from([TimelineEdge::new(x, y), TimelineEdge::new(y, z)]);
        let after = BTreeSet::from([TimelineEdge::new(x, z), TimelineEdge::new(y, z)]);

        let d = diff(&before, &after);
        assert_eq!(d.added, vec![TimelineEdge::new(x, z)]);
        assert_eq!(d.removed, vec![TimelineEdge::new(x, y)]);
        assert!(diff(&after, &after).is_empty());
    }

    #[test]
    fn test_snapshot_ignores_listeners() {
        let mut graph = Graph::new(GraphKind::Stage);
        let a = stage(&mut graph, "a", Trigger::http_listener());
        let b = stage(&mut graph, "b", Trigger::delta_seconds(5));
        graph.connect(a, b).unwrap();

        assert!(snapshot(&graph, &BTreeSet::from([a])).is_empty());
        assert!(snapshot(&graph, &BTreeSet::from([a, b])).is_empty());
    }
}
