//! Edge types for stage and step graphs.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::node::{NodeId, NodeKind};

/// Stable handle to an edge slot inside its owning graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(u32);

impl EdgeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Slot index inside the owning graph's arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Condition gating traversal of a step edge at execution time.
///
/// The condition holds when the parent step's output of type `kind`
/// matches `value` (for example `kind = "result"`, `value = "OK"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeCondition {
    /// Which output of the parent step is inspected.
    #[serde(rename = "type")]
    pub kind: String,
    /// Expected value.
    pub value: String,
}

impl EdgeCondition {
    /// Create a new condition.
    pub fn new(kind: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: value.into(),
        }
    }
}

/// Kind-specific edge payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EdgePayload {
    /// Edge between two steps, with its traversal conditions.
    Step {
        /// Conditions, in the order they were defined.
        conditions: Vec<EdgeCondition>,
    },
    /// Edge between two stages; carries the time-ordering rule.
    Stage,
}

impl EdgePayload {
    /// Default payload for an edge between nodes of `kind`.
    pub fn for_kind(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Step => Self::Step { conditions: Vec::new() },
            NodeKind::Stage => Self::Stage,
        }
    }

    /// Step edge conditions; empty for stage edges.
    pub fn conditions(&self) -> &[EdgeCondition] {
        match self {
            Self::Step { conditions } => conditions,
            Self::Stage => &[],
        }
    }
}

/// Directed edge `parent → child`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    /// Parent node (source).
    pub parent: NodeId,
    /// Child node (target).
    pub child: NodeId,
    /// Kind-specific payload.
    pub payload: EdgePayload,
}

impl Edge {
    /// Create a new edge.
    pub fn new(parent: NodeId, child: NodeId, payload: EdgePayload) -> Self {
        Self { parent, child, payload }
    }

    /// The (parent, child) pair that must be unique within a graph.
    pub fn key(&self) -> (NodeId, NodeId) {
        (self.parent, self.child)
    }
}
