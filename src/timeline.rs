//! The derived chronological view of a stage graph.
//!
//! Only delta-triggered stages appear on the timeline. Its edges are never
//! edited directly: the synchronizer in [`crate::sync`] derives them from
//! the structural graph and keeps them equal to the induced closure.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::types::{NodeId, Position};

/// Ordering edge between two delta stages.
///
/// Implements `Ord` for deterministic ordering: (parent, child).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TimelineEdge {
    /// Earlier stage.
    pub parent: NodeId,
    /// Later stage.
    pub child: NodeId,
}

impl TimelineEdge {
    /// Create a new timeline edge.
    pub fn new(parent: NodeId, child: NodeId) -> Self {
        Self { parent, child }
    }
}

/// Timeline representation of one delta stage.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineNode {
    /// Stage this node stands for.
    pub stage: NodeId,
    /// Offset from the scenario start.
    pub offset: Duration,
    /// Position on the timeline canvas.
    pub position: Position,
}

/// Chronological structure over delta stages.
#[derive(Debug, Clone, Default)]
pub struct Timeline {
    nodes: BTreeMap<NodeId, TimelineNode>,
    edges: BTreeSet<TimelineEdge>,
}

impl Timeline {
    /// Create an empty timeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a timeline node for `stage`. Re-attaching updates the offset.
    pub(crate) fn attach(&mut self, stage: NodeId, offset: Duration) {
        self.nodes
            .entry(stage)
            .and_modify(|node| node.offset = offset)
            .or_insert(TimelineNode {
                stage,
                offset,
                position: Position::default(),
            });
    }

    /// Detach the timeline node of `stage`, dropping any edge still touching it.
    ///
    /// Returns the edges that had to be dropped.
    pub(crate) fn detach(&mut self, stage: NodeId) -> Vec<TimelineEdge> {
        let dangling: Vec<TimelineEdge> = self
            .edges
            .iter()
            .filter(|e| e.parent == stage || e.child == stage)
            .copied()
            .collect();
        for edge in &dangling {
            self.edges.remove(edge);
        }
        self.nodes.remove(&stage);
        dangling
    }

    pub(crate) fn set_offset(&mut self, stage: NodeId, offset: Duration) {
        if let Some(node) = self.nodes.get_mut(&stage) {
            node.offset = offset;
        }
    }

    /// Insert an edge between two attached stages. Returns `false` if the
    /// edge already existed or an endpoint is not on the timeline.
    pub(crate) fn insert_edge(&mut self, edge: TimelineEdge) -> bool {
        if !self.nodes.contains_key(&edge.parent) || !self.nodes.contains_key(&edge.child) {
            return false;
        }
        self.edges.insert(edge)
    }

    pub(crate) fn remove_edge(&mut self, edge: &TimelineEdge) -> bool {
        self.edges.remove(edge)
    }

    pub(crate) fn replace_edges(&mut self, edges: BTreeSet<TimelineEdge>) {
        self.edges = edges;
    }

    pub(crate) fn set_position(&mut self, stage: NodeId, position: Position) -> bool {
        match self.nodes.get_mut(&stage) {
            Some(node) if node.position != position => {
                node.position = position;
                true
            }
            _ => false,
        }
    }

    /// Whether `stage` has a timeline node.
    pub fn contains(&self, stage: NodeId) -> bool {
        self.nodes.contains_key(&stage)
    }

    /// Timeline node of `stage`.
    pub fn node(&self, stage: NodeId) -> Option<&TimelineNode> {
        self.nodes.get(&stage)
    }

    /// All timeline nodes, ordered by stage handle.
    pub fn nodes(&self) -> impl Iterator<Item = &TimelineNode> {
        self.nodes.values()
    }

    /// All timeline edges, ordered by (parent, child).
    pub fn edges(&self) -> &BTreeSet<TimelineEdge> {
        &self.edges
    }

    /// Whether the edge `parent → child` exists.
    pub fn has_edge(&self, parent: NodeId, child: NodeId) -> bool {
        self.edges.contains(&TimelineEdge::new(parent, child))
    }

    /// Stages directly preceding `stage` on the timeline.
    pub fn parents(&self, stage: NodeId) -> Vec<NodeId> {
        self.edges
            .iter()
            .filter(|e| e.child == stage)
            .map(|e| e.parent)
            .collect()
    }

    /// Stages directly following `stage` on the timeline.
    pub fn children(&self, stage: NodeId) -> Vec<NodeId> {
        self.edges
            .range(TimelineEdge::new(stage, NodeId::from_index(0))..)
            .take_while(|e| e.parent == stage)
            .map(|e| e.child)
            .collect()
    }

    /// Number of timeline nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the timeline has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
