//! Errors raised by graph mutations and queries.

use crate::types::{EdgeId, NodeId, NodeKind};
use super::GraphKind;

/// Error type for graph operations.
///
/// Every variant is local and recoverable: the operation that raised it left
/// the graph exactly as it was before the call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphError {
    /// The (parent, child) pair is already connected.
    #[error("Edge already exists: {parent} -> {child}")]
    DuplicateEdge {
        /// Parent node name.
        parent: String,
        /// Child node name.
        child: String,
    },
    /// The connection would close a cycle.
    #[error("Connecting {parent} -> {child} would create a cycle")]
    CycleViolation {
        /// Parent node name.
        parent: String,
        /// Child node name.
        child: String,
    },
    /// A stage would start before a stage it depends on.
    #[error("Stage {child} starts at {child_offset}s, before its parent {parent} at {parent_offset}s")]
    TimeOrderViolation {
        /// Parent stage name.
        parent: String,
        /// Parent offset in seconds.
        parent_offset: i64,
        /// Child stage name.
        child: String,
        /// Child offset in seconds.
        child_offset: i64,
    },
    /// A node with this name already exists in the graph.
    #[error("Node name already in use: {0}")]
    NameNotUnique(String),
    /// The node kind has no clone support.
    #[error("Cannot clone {kind} node {name}")]
    UnsupportedClone {
        /// Offending node name.
        name: String,
        /// Offending node kind.
        kind: NodeKind,
    },
    /// A single root was expected.
    #[error("Expected a single root node, found {}: {roots:?}", roots.len())]
    MultipleRoots {
        /// Names of every root found.
        roots: Vec<String>,
    },
    /// Node handle does not refer to a live node.
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),
    /// Edge handle does not refer to a live edge.
    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),
    /// Node kind does not belong in this graph flavor.
    #[error("Cannot put a {found} node into a {expected} graph")]
    KindMismatch {
        /// Graph flavor.
        expected: GraphKind,
        /// Node kind offered.
        found: NodeKind,
    },
    /// Trigger operations need a stage node.
    #[error("Node {0} is not a stage")]
    NotAStage(String),
    /// Step edges need at least one condition.
    #[error("Edge {0} needs at least one condition")]
    EmptyConditions(EdgeId),
    /// No node with this name is waiting in the holding area.
    #[error("No held node named {0}")]
    NotHeld(String),
}
