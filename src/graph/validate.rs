//! Structural checks: reachability, time order and per-flavor validity.

use std::collections::HashSet;

use super::{Graph, GraphError, GraphKind};
use crate::types::{NodeId, Trigger};

/// Outcome of a reachability search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PathSearch {
    /// Whether the target was reached.
    pub found: bool,
    /// Distinct nodes expanded before the search ended.
    pub visited: usize,
}

/// Why a graph is not valid for its flavor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationIssue {
    /// Graphs of both flavors need at least one node.
    #[error("Graph has no nodes")]
    Empty,
    /// Step graphs need exactly one root.
    #[error("Step graph has {} roots: {roots:?}", roots.len())]
    MultipleRoots {
        /// Names of every root found.
        roots: Vec<String>,
    },
}

/// Depth-first search from `from` along child edges, looking for `to`.
///
/// Every node is expanded at most once, so the search is linear in the size
/// of the graph even on dense diamonds. `from == to` counts as found.
pub fn search_path(graph: &Graph, from: NodeId, to: NodeId) -> PathSearch {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut stack = vec![from];

    while let Some(current) = stack.pop() {
        if !visited.insert(current) {
            continue;
        }
        if current == to {
            return PathSearch {
                found: true,
                visited: visited.len(),
            };
        }
        stack.extend(
            graph
                .children(current)
                .into_iter()
                .filter(|child| !visited.contains(child)),
        );
    }

    PathSearch {
        found: false,
        visited: visited.len(),
    }
}

fn delta_seconds(trigger: Option<&Trigger>) -> Option<i64> {
    trigger.and_then(Trigger::start_time).map(|d| d.num_seconds())
}

fn violation(graph: &Graph, parent: NodeId, parent_offset: i64, child: NodeId, child_offset: i64) -> GraphError {
    GraphError::TimeOrderViolation {
        parent: graph.name_of(parent),
        parent_offset,
        child: graph.name_of(child),
        child_offset,
    }
}

/// A delta child must not start before its delta parent.
pub(crate) fn check_time_order(graph: &Graph, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
    let parent_offset = delta_seconds(graph.node(parent).and_then(|n| n.trigger()));
    let child_offset = delta_seconds(graph.node(child).and_then(|n| n.trigger()));
    match (parent_offset, child_offset) {
        (Some(p), Some(c)) if c < p => Err(violation(graph, parent, p, child, c)),
        _ => Ok(()),
    }
}

/// Time order of `node` against its direct delta neighbors, as if its
/// trigger were `trigger`.
pub(crate) fn check_trigger_order(graph: &Graph, node: NodeId, trigger: &Trigger) -> Result<(), GraphError> {
    let Some(offset) = delta_seconds(Some(trigger)) else {
        return Ok(());
    };

    for parent in graph.parents(node) {
        if let Some(p) = delta_seconds(graph.node(parent).and_then(|n| n.trigger())) {
            if offset < p {
                return Err(violation(graph, parent, p, node, offset));
            }
        }
    }
    for child in graph.children(node) {
        if let Some(c) = delta_seconds(graph.node(child).and_then(|n| n.trigger())) {
            if c < offset {
                return Err(violation(graph, node, offset, child, c));
            }
        }
    }
    Ok(())
}

pub(crate) fn issues(graph: &Graph) -> Vec<ValidationIssue> {
    if graph.is_empty() {
        return vec![ValidationIssue::Empty];
    }
    match graph.kind() {
        GraphKind::Stage => Vec::new(),
        GraphKind::Step => match graph.find_root_node() {
            Err(GraphError::MultipleRoots { roots }) => vec![ValidationIssue::MultipleRoots { roots }],
            _ => Vec::new(),
        },
    }
}
