//! Holding area for nodes taken out of the active structure.
//!
//! A held node keeps its name, payload and canvas position but none of its
//! edges. Restoring it creates a fresh node with a new handle.

use std::collections::BTreeMap;

use super::{Graph, GraphError};
use crate::events::{ChangeKind, EditorSignal, GraphChange};
use crate::types::{NodeId, NodeKind, NodePayload, Position};

/// A node waiting in a [`HoldingArea`].
#[derive(Debug)]
pub struct HeldNode {
    /// Name it had when it was moved out.
    pub name: String,
    /// Payload, including a stage's step graph.
    pub payload: NodePayload,
    /// Last canvas position.
    pub position: Position,
}

impl HeldNode {
    /// Kind of the held payload.
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }
}

/// Nodes removed from a graph but not destroyed, keyed by name.
#[derive(Debug, Default)]
pub struct HoldingArea {
    nodes: BTreeMap<String, HeldNode>,
}

impl HoldingArea {
    /// Create an empty holding area.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a node called `name` is held.
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    /// Held node called `name`.
    pub fn get(&self, name: &str) -> Option<&HeldNode> {
        self.nodes.get(name)
    }

    /// Names of every held node, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }

    /// Number of held nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether nothing is held.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl Graph {
    /// Move a node into `area`, destroying its edges.
    ///
    /// Fails with [`GraphError::NameNotUnique`] if the area already holds a
    /// node of the same name.
    pub fn move_to_holding(&mut self, id: NodeId, area: &mut HoldingArea) -> Result<(), GraphError> {
        let name = self.require(id)?.name.clone();
        if area.contains(&name) {
            return Err(GraphError::NameNotUnique(name));
        }

        let (node, change) = self.remove_node(id, ChangeKind::NodeDestroyed)?;
        area.nodes.insert(
            name.clone(),
            HeldNode {
                name: node.name,
                payload: node.payload,
                position: node.position,
            },
        );

        tracing::debug!(graph = %self.id(), node = %id, %name, "node moved to holding");
        self.finish(change);
        self.signal(EditorSignal::MovedToHolding { graph: self.id(), name });
        Ok(())
    }

    /// Bring the node called `name` back from `area` as a new, unconnected
    /// node at its last position.
    pub fn restore_from_holding(&mut self, name: &str, area: &mut HoldingArea) -> Result<NodeId, GraphError> {
        let held = area.get(name).ok_or_else(|| GraphError::NotHeld(name.to_string()))?;
        self.check_insertable(name, held.kind())?;

        let held = area
            .nodes
            .remove(name)
            .ok_or_else(|| GraphError::NotHeld(name.to_string()))?;
        let id = self.insert_node(held.name, held.payload);
        if let Some(node) = self.node_mut(id) {
            node.position = held.position;
        }

        tracing::debug!(graph = %self.id(), node = %id, %name, "node restored from holding");
        let mut change = GraphChange::new(self.id(), ChangeKind::NodeAdded);
        change.added_nodes.push(id);
        self.finish(change);
        self.signal(EditorSignal::MovedFromHolding { graph: self.id(), node: id });
        Ok(id)
    }
}
