//! Deep copy and structural comparison.
//!
//! ## Comparison
//!
//! Two graphs are structurally equal when they have the same flavor, the
//! same node names with equal payloads, and the same edges between those
//! names with equal payloads. Handles, positions and graph identity do not
//! take part. The comparison works on a [`CanonicalGraph`], which is also
//! what [`Graph::fingerprint`] hashes.

use std::collections::{HashMap, VecDeque};

use super::{Graph, GraphError, GraphKind};
use crate::canonical::CanonicalHasher;
use crate::types::{EdgePayload, Node, NodeId, NodeKind, NodePayload, StepData, Trigger};

/// Identity-free form of a graph: nodes sorted by name, edges sorted by
/// endpoint names.
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalGraph {
    /// Graph flavor.
    pub kind: GraphKind,
    /// Nodes, sorted by name.
    pub nodes: Vec<CanonicalNode>,
    /// Edges, sorted by (parent name, child name).
    pub edges: Vec<CanonicalEdge>,
}

/// A node in a [`CanonicalGraph`].
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalNode {
    /// Node name.
    pub name: String,
    /// Payload without handles.
    pub payload: CanonicalPayload,
}

/// Payload in a [`CanonicalNode`].
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalPayload {
    /// Step payload, compared as is.
    Step(StepData),
    /// Stage payload; the step graph is compared structurally.
    Stage {
        /// Trigger.
        trigger: Trigger,
        /// Step graph.
        steps: CanonicalGraph,
    },
}

/// An edge in a [`CanonicalGraph`].
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalEdge {
    /// Parent node name.
    pub parent: String,
    /// Child node name.
    pub child: String,
    /// Edge payload.
    pub payload: EdgePayload,
}

impl CanonicalGraph {
    fn hash_into(&self, hasher: &mut CanonicalHasher) {
        hasher.write_str(&self.kind.to_string());
        hasher.write_u64(self.nodes.len() as u64);
        for node in &self.nodes {
            hasher.write_str(&node.name);
            match &node.payload {
                CanonicalPayload::Step(step) => {
                    hasher.write_str(&step.module);
                    hasher.write_u64(step.arguments.len() as u64);
                    for (key, value) in &step.arguments {
                        hasher.write_str(key);
                        hasher.write_json(value);
                    }
                }
                CanonicalPayload::Stage { trigger, steps } => {
                    hash_trigger(trigger, hasher);
                    steps.hash_into(hasher);
                }
            }
        }
        hasher.write_u64(self.edges.len() as u64);
        for edge in &self.edges {
            hasher.write_str(&edge.parent);
            hasher.write_str(&edge.child);
            let conditions = edge.payload.conditions();
            hasher.write_u64(conditions.len() as u64);
            for condition in conditions {
                hasher.write_str(&condition.kind);
                hasher.write_str(&condition.value);
            }
        }
    }
}

fn hash_trigger(trigger: &Trigger, hasher: &mut CanonicalHasher) {
    hasher.write_str(&trigger.kind().to_string());
    match trigger {
        Trigger::Delta(delta) => {
            hasher.write_u64(u64::from(delta.hours));
            hasher.write_u64(u64::from(delta.minutes));
            hasher.write_u64(u64::from(delta.seconds));
        }
        Trigger::Listener(listener) => {
            hasher.write_str(listener.kind.trigger_type());
            hasher.write_u64(listener.args.len() as u64);
            for (key, value) in &listener.args {
                hasher.write_str(key);
                hasher.write_json(value);
            }
        }
    }
}

fn clone_payload(node: &Node) -> Result<NodePayload, GraphError> {
    match &node.payload {
        NodePayload::Step(step) => Ok(NodePayload::Step(step.clone())),
        NodePayload::Stage(_) => Err(GraphError::UnsupportedClone {
            name: node.name.clone(),
            kind: NodeKind::Stage,
        }),
    }
}

impl Graph {
    /// Deep copy with the same names, payloads, positions and edges.
    ///
    /// Nodes are visited breadth-first from the roots (by name), so handles in the
    /// copy follow BFS order. Only step nodes can be cloned; a stage node
    /// fails the copy with [`GraphError::UnsupportedClone`]. The copy has
    /// no observers.
    pub fn copy(&self) -> Result<Graph, GraphError> {
        let mut copy = Graph::new(self.kind);
        let mut mapping: HashMap<NodeId, NodeId> = HashMap::new();
        let mut queue: VecDeque<NodeId> = VecDeque::new();

        let mut roots = self.find_roots();
        roots.sort_by_key(|&root| self.name_of(root));
        for root in roots {
            let node = self.require(root)?;
            let id = copy.insert_node(node.name.clone(), clone_payload(node)?);
            if let Some(n) = copy.node_mut(id) {
                n.position = node.position;
            }
            mapping.insert(root, id);
            queue.push_back(root);
        }

        while let Some(current) = queue.pop_front() {
            let node = self.require(current)?;
            let parent = mapping
                .get(&current)
                .copied()
                .ok_or(GraphError::NodeNotFound(current))?;
            for &edge_id in &node.child_edges {
                let edge = self.edge(edge_id).ok_or(GraphError::EdgeNotFound(edge_id))?;
                let child = match mapping.get(&edge.child) {
                    Some(&mapped) => mapped,
                    None => {
                        let original = self.require(edge.child)?;
                        let id = copy.insert_node(original.name.clone(), clone_payload(original)?);
                        if let Some(n) = copy.node_mut(id) {
                            n.position = original.position;
                        }
                        mapping.insert(edge.child, id);
                        queue.push_back(edge.child);
                        id
                    }
                };
                copy.register_edge(parent, child, edge.payload.clone());
            }
        }

        tracing::debug!(source = %self.id, copy = %copy.id, nodes = copy.len(), "graph copied");
        Ok(copy)
    }

    /// Identity-free form used by [`compare`] and [`Graph::fingerprint`].
    pub fn canonical_form(&self) -> CanonicalGraph {
        let mut nodes: Vec<CanonicalNode> = self
            .nodes()
            .map(|(_, node)| CanonicalNode {
                name: node.name.clone(),
                payload: match &node.payload {
                    NodePayload::Step(step) => CanonicalPayload::Step(step.clone()),
                    NodePayload::Stage(stage) => CanonicalPayload::Stage {
                        trigger: stage.trigger.clone(),
                        steps: stage.steps.canonical_form(),
                    },
                },
            })
            .collect();
        nodes.sort_by(|a, b| a.name.cmp(&b.name));

        let mut edges: Vec<CanonicalEdge> = self
            .edges()
            .map(|(_, edge)| CanonicalEdge {
                parent: self.name_of(edge.parent),
                child: self.name_of(edge.child),
                payload: edge.payload.clone(),
            })
            .collect();
        edges.sort_by(|a, b| (&a.parent, &a.child).cmp(&(&b.parent, &b.child)));

        CanonicalGraph {
            kind: self.kind,
            nodes,
            edges,
        }
    }

    /// Stable hash of the canonical form, as 16 hex digits.
    pub fn fingerprint(&self) -> String {
        let mut hasher = CanonicalHasher::new();
        self.canonical_form().hash_into(&mut hasher);
        hasher.finish_hex()
    }
}

/// Whether two graphs are structurally equal.
pub fn compare(a: &Graph, b: &Graph) -> bool {
    a.canonical_form() == b.canonical_form()
}
