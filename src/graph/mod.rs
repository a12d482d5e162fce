//! Stage and step graphs.
//!
//! A [`Graph`] owns its nodes and edges in arenas addressed by [`NodeId`]
//! and [`EdgeId`]; nodes keep ordered lists of edge handles instead of
//! pointers, so there are no ownership cycles between nodes, edges and the
//! graph.
//!
//! ## Flavors
//!
//! | Flavor | Valid when | Timeline |
//! |--------|------------|----------|
//! | `Step` | non-empty, exactly one root | none |
//! | `Stage` | non-empty | kept in sync on every mutation |
//!
//! ## Mutation contract
//!
//! Every mutating call either succeeds completely or returns a
//! [`GraphError`] with the graph untouched, and emits exactly one
//! [`GraphChange`] to the graph's observers on success.

pub mod error;
pub mod validate;
pub mod copy;
pub mod holding;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::events::{ChangeKind, EditorSignal, GraphChange, GraphId, GraphObserver, ObserverList};
use crate::layout::{Forest, LayoutConfig, LayoutOrganizer, LayoutResult};
use crate::sync;
use crate::timeline::{Timeline, TimelineEdge};
use crate::types::{
    Edge, EdgeCondition, EdgeId, EdgePayload, Node, NodeId, NodeKind, NodePayload, Position, Trigger,
};

pub use error::GraphError;
pub use validate::{PathSearch, ValidationIssue};
pub use copy::{CanonicalGraph, compare};
pub use holding::{HeldNode, HoldingArea};

/// Graph flavor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GraphKind {
    /// Steps within one stage.
    Step,
    /// Stages within one template.
    Stage,
}

impl GraphKind {
    /// Node kind this graph holds.
    pub fn node_kind(&self) -> NodeKind {
        match self {
            Self::Step => NodeKind::Step,
            Self::Stage => NodeKind::Stage,
        }
    }
}

impl fmt::Display for GraphKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => write!(f, "step"),
            Self::Stage => write!(f, "stage"),
        }
    }
}

/// A step or stage graph.
#[derive(Debug)]
pub struct Graph {
    id: GraphId,
    kind: GraphKind,
    nodes: Vec<Option<Node>>,
    edges: Vec<Option<Edge>>,
    names: BTreeMap<String, NodeId>,
    timeline: Option<Timeline>,
    timeline_layout: Option<LayoutConfig>,
    observers: ObserverList,
}

impl Graph {
    /// Create an empty graph of the given flavor.
    pub fn new(kind: GraphKind) -> Self {
        Self {
            id: GraphId::new(),
            kind,
            nodes: Vec::new(),
            edges: Vec::new(),
            names: BTreeMap::new(),
            timeline: match kind {
                GraphKind::Stage => Some(Timeline::new()),
                GraphKind::Step => None,
            },
            timeline_layout: None,
            observers: ObserverList::default(),
        }
    }

    /// Identity used in notifications.
    pub fn id(&self) -> GraphId {
        self.id
    }

    /// Graph flavor.
    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// Register an observer for change notifications and editor signals.
    pub fn subscribe(&mut self, observer: Arc<dyn GraphObserver>) {
        self.observers.push(observer);
    }

    /// Re-run the timeline layout with `config` after every change that can
    /// move timeline nodes. `None` disables it.
    pub fn set_timeline_layout(&mut self, config: Option<LayoutConfig>) {
        self.timeline_layout = config;
    }

    // ─────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of live edges.
    pub fn edge_count(&self) -> usize {
        self.edges.iter().filter(|e| e.is_some()).count()
    }

    /// Node behind a handle.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Mutable node access for payload edits that cannot break invariants
    /// (step arguments, a stage's step graph).
    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Handle of the node called `name`.
    pub fn node_by_name(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    /// Edge behind a handle.
    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(id.index()).and_then(Option::as_ref)
    }

    /// Live node handles in creation order.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(index, _)| NodeId::from_index(index))
    }

    /// Live nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|node| (NodeId::from_index(index), node)))
    }

    /// Live edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|edge| (EdgeId::from_index(index), edge)))
    }

    /// Edge connecting `parent → child`, if any.
    pub fn edge_between(&self, parent: NodeId, child: NodeId) -> Option<EdgeId> {
        self.node(parent)?
            .child_edges
            .iter()
            .copied()
            .find(|&e| self.edge(e).is_some_and(|edge| edge.child == child))
    }

    /// Direct structural parents, in connection order.
    pub fn parents(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| {
                node.parent_edges
                    .iter()
                    .filter_map(|&e| self.edge(e).map(|edge| edge.parent))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Direct structural children, in connection order.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id)
            .map(|node| {
                node.child_edges
                    .iter()
                    .filter_map(|&e| self.edge(e).map(|edge| edge.child))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether `id` is a stage with a delta trigger.
    pub fn is_delta(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(Node::is_delta)
    }

    /// Derived timeline (stage graphs only).
    pub fn timeline(&self) -> Option<&Timeline> {
        self.timeline.as_ref()
    }

    /// Nodes without parents, in creation order.
    pub fn find_roots(&self) -> Vec<NodeId> {
        self.nodes()
            .filter(|(_, node)| node.is_root())
            .map(|(id, _)| id)
            .collect()
    }

    /// The single root of the graph.
    ///
    /// Returns `Ok(None)` for an empty graph and
    /// [`GraphError::MultipleRoots`] when more than one root exists. Stage
    /// graphs may legitimately have several roots; they get the same error
    /// here and should use [`Graph::find_roots`] instead.
    pub fn find_root_node(&self) -> Result<Option<NodeId>, GraphError> {
        let roots = self.find_roots();
        match roots.as_slice() {
            [] => Ok(None),
            [root] => Ok(Some(*root)),
            _ => Err(GraphError::MultipleRoots {
                roots: roots.iter().map(|&r| self.name_of(r)).collect(),
            }),
        }
    }

    /// Validation issues; empty iff [`Graph::is_valid`].
    pub fn errors(&self) -> Vec<ValidationIssue> {
        validate::issues(self)
    }

    /// Whether the graph is valid for its flavor.
    pub fn is_valid(&self) -> bool {
        self.errors().is_empty()
    }

    /// Whether `to` is reachable from `from` along child edges.
    pub fn reaches(&self, from: NodeId, to: NodeId) -> bool {
        validate::search_path(self, from, to).found
    }

    /// See [`sync::nearest_delta_ancestors`].
    pub fn nearest_delta_ancestors(&self, id: NodeId) -> BTreeSet<NodeId> {
        sync::nearest_delta_ancestors(self, id)
    }

    /// See [`sync::nearest_delta_descendants`].
    pub fn nearest_delta_descendants(&self, id: NodeId) -> BTreeSet<NodeId> {
        sync::nearest_delta_descendants(self, id)
    }

    /// Whether the timeline's edges equal a from-scratch recomputation.
    /// Always true for step graphs.
    pub fn timeline_is_consistent(&self) -> bool {
        match &self.timeline {
            Some(timeline) => {
                let attached = self
                    .node_ids()
                    .all(|id| timeline.contains(id) == self.is_delta(id))
                    && timeline.len() == self.node_ids().filter(|&id| self.is_delta(id)).count();
                attached && *timeline.edges() == sync::induced_edges(self)
            }
            None => true,
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Mutations
    // ─────────────────────────────────────────────────────────────────────

    /// Add a node.
    ///
    /// The payload kind must match the graph flavor; the name must be
    /// unused. A delta stage gets its timeline node immediately.
    pub fn add_node(&mut self, name: impl Into<String>, payload: NodePayload) -> Result<NodeId, GraphError> {
        let name = name.into();
        self.check_insertable(&name, payload.kind())?;

        let id = self.insert_node(name, payload);
        tracing::debug!(graph = %self.id, node = %id, "node added");
        let mut change = GraphChange::new(self.id, ChangeKind::NodeAdded);
        change.added_nodes.push(id);
        self.finish(change);
        Ok(id)
    }

    /// Rename a node. Renaming to the current name is a no-op.
    pub fn rename_node(&mut self, id: NodeId, name: impl Into<String>) -> Result<(), GraphError> {
        let name = name.into();
        let current = self.require(id)?.name.clone();
        if current == name {
            return Ok(());
        }
        if self.names.contains_key(&name) {
            return Err(GraphError::NameNotUnique(name));
        }

        self.names.remove(&current);
        self.names.insert(name.clone(), id);
        if let Some(node) = self.node_mut(id) {
            node.name = name;
        }
        self.finish(GraphChange::new(self.id, ChangeKind::NodeRenamed));
        Ok(())
    }

    /// Connect `parent → child`.
    ///
    /// Rejected with [`GraphError::DuplicateEdge`] if the pair is already
    /// connected, [`GraphError::CycleViolation`] if `parent` is reachable
    /// from `child`, and (stage graphs) [`GraphError::TimeOrderViolation`]
    /// if both are delta stages and the child starts earlier. All checks
    /// are reads; a rejected call leaves no trace.
    ///
    /// On a stage graph the timeline gains every induced edge the new
    /// connection creates. On a step graph an [`EditorSignal::EditEdge`]
    /// asks the UI for the new edge's conditions.
    pub fn connect(&mut self, parent: NodeId, child: NodeId) -> Result<EdgeId, GraphError> {
        if let Err(err) = self.check_connect(parent, child) {
            tracing::warn!(graph = %self.id, %parent, %child, error = %err, "connection rejected");
            return Err(err);
        }

        let mut change = GraphChange::new(self.id, ChangeKind::EdgeConnected);
        let payload = EdgePayload::for_kind(self.kind.node_kind());
        let affected = self.affected_by_edge(parent, child);
        let edge = self.reconcile(&affected, &mut change, |graph| {
            graph.register_edge(parent, child, payload)
        });
        change.added_edges.push(edge);

        tracing::debug!(
            graph = %self.id,
            %edge,
            %parent,
            %child,
            timeline_added = change.added_timeline_edges.len(),
            "nodes connected"
        );

        self.finish(change);
        if self.kind == GraphKind::Step {
            self.observers.signal(&EditorSignal::EditEdge { graph: self.id, edge });
        }
        Ok(edge)
    }

    /// Destroy an edge, returning it.
    ///
    /// On a stage graph every induced timeline edge that depended on it is
    /// removed.
    pub fn destroy_edge(&mut self, id: EdgeId) -> Result<Edge, GraphError> {
        let mut change = GraphChange::new(self.id, ChangeKind::EdgeDestroyed);
        let edge = self.unlink_edge(id, &mut change)?;
        tracing::debug!(
            graph = %self.id,
            edge = %id,
            timeline_removed = change.removed_timeline_edges.len(),
            "edge destroyed"
        );
        self.finish(change);
        Ok(edge)
    }

    /// Destroy a node and every edge touching it, returning its payload.
    pub fn destroy_node(&mut self, id: NodeId) -> Result<NodePayload, GraphError> {
        let (node, change) = self.remove_node(id, ChangeKind::NodeDestroyed)?;
        tracing::debug!(graph = %self.id, node = %id, name = %node.name, "node destroyed");
        self.finish(change);
        Ok(node.payload)
    }

    /// Change a stage's trigger.
    ///
    /// A new delta offset must respect the time order against every direct
    /// delta parent and child. Switching between delta and listener
    /// attaches or detaches the stage's timeline node and re-derives the
    /// induced edges around it.
    pub fn set_trigger(&mut self, id: NodeId, trigger: Trigger) -> Result<(), GraphError> {
        let node = self.require(id)?;
        let old_kind = match node.trigger() {
            Some(old) => old.kind(),
            None => return Err(GraphError::NotAStage(node.name.clone())),
        };
        validate::check_trigger_order(self, id, &trigger)?;

        let mut change = GraphChange::new(self.id, ChangeKind::TriggerChanged);
        let offset = trigger.start_time();

        if old_kind == trigger.kind() {
            self.replace_trigger(id, trigger);
            if let (Some(offset), Some(timeline)) = (offset, self.timeline.as_mut()) {
                timeline.set_offset(id, offset);
            }
        } else {
            let affected = sync::affected_by_trigger(self, id);
            self.reconcile(&affected, &mut change, |graph| {
                graph.replace_trigger(id, trigger);
                if let (Some(offset), Some(timeline)) = (offset, graph.timeline.as_mut()) {
                    timeline.attach(id, offset);
                }
            });
            if offset.is_none() {
                if let Some(timeline) = self.timeline.as_mut() {
                    change.removed_timeline_edges.extend(timeline.detach(id));
                }
            }
        }

        tracing::debug!(
            graph = %self.id,
            node = %id,
            timeline_added = change.added_timeline_edges.len(),
            timeline_removed = change.removed_timeline_edges.len(),
            "trigger changed"
        );
        self.finish(change);
        Ok(())
    }

    /// Replace a step edge's conditions. The set must not be empty.
    pub fn set_conditions(&mut self, id: EdgeId, conditions: Vec<EdgeCondition>) -> Result<(), GraphError> {
        let edge = self
            .edges
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(GraphError::EdgeNotFound(id))?;
        match &mut edge.payload {
            EdgePayload::Step { conditions: current } => {
                if conditions.is_empty() {
                    return Err(GraphError::EmptyConditions(id));
                }
                *current = conditions;
            }
            EdgePayload::Stage => {
                return Err(GraphError::KindMismatch {
                    expected: GraphKind::Step,
                    found: NodeKind::Stage,
                });
            }
        }
        self.finish(GraphChange::new(self.id, ChangeKind::ConditionsChanged));
        Ok(())
    }

    /// Move a node on the canvas.
    pub fn set_position(&mut self, id: NodeId, position: Position) -> Result<(), GraphError> {
        let mut change = GraphChange::new(self.id, ChangeKind::NodesMoved);
        let node = self.node_mut(id).ok_or(GraphError::NodeNotFound(id))?;
        if node.position != position {
            node.position = position;
            change.moved_nodes.push(id);
        }
        self.finish(change);
        Ok(())
    }

    /// Ask the external parameter editor to open `id`.
    pub fn select_for_edit(&self, id: NodeId) -> Result<(), GraphError> {
        self.require(id)?;
        self.observers.signal(&EditorSignal::EditNode { graph: self.id, node: id });
        Ok(())
    }

    /// Replace the timeline's edges with a from-scratch recomputation.
    pub fn rebuild_timeline(&mut self) {
        let induced = sync::induced_edges(self);
        let mut change = GraphChange::new(self.id, ChangeKind::TimelineRebuilt);
        if let Some(timeline) = self.timeline.as_mut() {
            let delta = sync::diff(timeline.edges(), &induced);
            change.added_timeline_edges = delta.added;
            change.removed_timeline_edges = delta.removed;
            timeline.replace_edges(induced);
        }
        self.finish(change);
    }

    // ─────────────────────────────────────────────────────────────────────
    // Layout
    // ─────────────────────────────────────────────────────────────────────

    /// Lay out the structural view and move every node accordingly.
    pub fn layout_structure(&mut self, config: &LayoutConfig) -> LayoutResult {
        let forest = Forest::from_graph(self, config);
        let result = LayoutOrganizer::new(&forest, config).layout_forest();

        let mut change = GraphChange::new(self.id, ChangeKind::NodesMoved);
        for (&id, &position) in &result.positions {
            if let Some(node) = self.node_mut(id) {
                if node.position != position {
                    node.position = position;
                    change.moved_nodes.push(id);
                }
            }
        }
        self.finish(change);
        result
    }

    /// Lay out the timeline (stage graphs only).
    pub fn layout_timeline(&mut self, config: &LayoutConfig) -> Option<LayoutResult> {
        self.timeline.as_ref()?;
        let (result, moved) = self.apply_timeline_layout(config);
        let mut change = GraphChange::new(self.id, ChangeKind::NodesMoved);
        change.moved_timeline_nodes = moved;
        self.finish(change);
        Some(result)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────

    pub(crate) fn require(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.node(id).ok_or(GraphError::NodeNotFound(id))
    }

    pub(crate) fn name_of(&self, id: NodeId) -> String {
        self.node(id).map(|n| n.name.clone()).unwrap_or_else(|| id.to_string())
    }

    pub(crate) fn check_insertable(&self, name: &str, kind: NodeKind) -> Result<(), GraphError> {
        if kind.graph_kind() != self.kind {
            return Err(GraphError::KindMismatch {
                expected: self.kind,
                found: kind,
            });
        }
        if self.names.contains_key(name) {
            return Err(GraphError::NameNotUnique(name.to_string()));
        }
        Ok(())
    }

    fn check_connect(&self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.require(parent)?;
        self.require(child)?;

        if self.edge_between(parent, child).is_some() {
            return Err(GraphError::DuplicateEdge {
                parent: self.name_of(parent),
                child: self.name_of(child),
            });
        }
        if validate::search_path(self, child, parent).found {
            return Err(GraphError::CycleViolation {
                parent: self.name_of(parent),
                child: self.name_of(child),
            });
        }
        if self.kind == GraphKind::Stage {
            validate::check_time_order(self, parent, child)?;
        }
        Ok(())
    }

    /// Insert a node whose name and kind were already checked.
    pub(crate) fn insert_node(&mut self, name: String, payload: NodePayload) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        let offset = payload.trigger().and_then(Trigger::start_time);
        self.names.insert(name.clone(), id);
        self.nodes.push(Some(Node::new(name, payload)));
        if let (Some(offset), Some(timeline)) = (offset, self.timeline.as_mut()) {
            timeline.attach(id, offset);
        }
        id
    }

    /// Register an edge on both endpoints. Validation happened before.
    pub(crate) fn register_edge(&mut self, parent: NodeId, child: NodeId, payload: EdgePayload) -> EdgeId {
        let id = EdgeId::from_index(self.edges.len());
        self.edges.push(Some(Edge::new(parent, child, payload)));
        if let Some(node) = self.node_mut(parent) {
            node.child_edges.push(id);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent_edges.push(id);
        }
        id
    }

    fn unregister_edge(&mut self, id: EdgeId) -> Option<Edge> {
        let edge = self.edges.get_mut(id.index())?.take()?;
        if let Some(node) = self.node_mut(edge.parent) {
            node.child_edges.retain(|&e| e != id);
        }
        if let Some(node) = self.node_mut(edge.child) {
            node.parent_edges.retain(|&e| e != id);
        }
        Some(edge)
    }

    fn unlink_edge(&mut self, id: EdgeId, change: &mut GraphChange) -> Result<Edge, GraphError> {
        let (parent, child) = self.edge(id).ok_or(GraphError::EdgeNotFound(id))?.key();
        let affected = self.affected_by_edge(parent, child);
        let edge = self
            .reconcile(&affected, change, |graph| graph.unregister_edge(id))
            .ok_or(GraphError::EdgeNotFound(id))?;
        change.removed_edges.push(id);
        Ok(edge)
    }

    pub(crate) fn remove_node(
        &mut self,
        id: NodeId,
        kind: ChangeKind,
    ) -> Result<(Node, GraphChange), GraphError> {
        let node = self.require(id)?;
        let incident: Vec<EdgeId> = node
            .parent_edges
            .iter()
            .chain(node.child_edges.iter())
            .copied()
            .collect();

        let mut change = GraphChange::new(self.id, kind);
        for edge in incident {
            self.unlink_edge(edge, &mut change)?;
        }
        if let Some(timeline) = self.timeline.as_mut() {
            change.removed_timeline_edges.extend(timeline.detach(id));
        }

        let removed = self
            .nodes
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(GraphError::NodeNotFound(id))?;
        self.names.remove(&removed.name);
        change.removed_nodes.push(id);
        Ok((removed, change))
    }

    fn replace_trigger(&mut self, id: NodeId, trigger: Trigger) {
        if let Some(NodePayload::Stage(stage)) = self.node_mut(id).map(|n| &mut n.payload) {
            stage.trigger = trigger;
        }
    }

    fn affected_by_edge(&self, parent: NodeId, child: NodeId) -> BTreeSet<NodeId> {
        if self.timeline.is_some() {
            sync::affected_by_edge(self, parent, child)
        } else {
            BTreeSet::new()
        }
    }

    /// Run `mutate` between two dependency snapshots of `affected` and
    /// apply the difference to the timeline.
    fn reconcile<R>(
        &mut self,
        affected: &BTreeSet<NodeId>,
        change: &mut GraphChange,
        mutate: impl FnOnce(&mut Self) -> R,
    ) -> R {
        if self.timeline.is_none() {
            return mutate(self);
        }

        let before = sync::snapshot(self, affected);
        let out = mutate(self);
        let after = sync::snapshot(self, affected);
        let delta = sync::diff(&before, &after);

        if let Some(timeline) = self.timeline.as_mut() {
            for edge in delta.removed {
                if timeline.remove_edge(&edge) {
                    change.removed_timeline_edges.push(edge);
                }
            }
            for edge in delta.added {
                if timeline.insert_edge(edge) {
                    change.added_timeline_edges.push(edge);
                }
            }
        }
        out
    }

    fn apply_timeline_layout(&mut self, config: &LayoutConfig) -> (LayoutResult, Vec<NodeId>) {
        let forest = Forest::from_timeline(self, config);
        let result = LayoutOrganizer::new(&forest, config).layout_forest();
        let mut moved = Vec::new();
        if let Some(timeline) = self.timeline.as_mut() {
            for (&stage, &position) in &result.positions {
                if timeline.set_position(stage, position) {
                    moved.push(stage);
                }
            }
        }
        (result, moved)
    }

    /// Emit the change, re-running the timeline layout first if enabled.
    pub(crate) fn finish(&mut self, mut change: GraphChange) {
        let relayout = !matches!(change.kind, ChangeKind::NodesMoved | ChangeKind::ConditionsChanged);
        if relayout && self.timeline.is_some() {
            if let Some(config) = self.timeline_layout.clone() {
                let (_, moved) = self.apply_timeline_layout(&config);
                change.moved_timeline_nodes.extend(moved);
            }
        }
        self.observers.change(&change);
    }

    pub(crate) fn signal(&self, signal: EditorSignal) {
        self.observers.signal(&signal);
    }
}

/// Timeline edges a stage graph holds, by stage name. Handy for assertions
/// and reports.
pub fn timeline_edge_names(graph: &Graph) -> Vec<(String, String)> {
    graph
        .timeline()
        .map(|timeline| {
            timeline
                .edges()
                .iter()
                .map(|TimelineEdge { parent, child }| (graph.name_of(*parent), graph.name_of(*child)))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RecordingObserver;
    use crate::types::StepData;

    fn stage(graph: &mut Graph, name: &str, trigger: Trigger) -> NodeId {
        graph.add_node(name, NodePayload::stage(trigger)).unwrap()
    }

    fn step(graph: &mut Graph, name: &str) -> NodeId {
        graph.add_node(name, NodePayload::Step(StepData::new("scan"))).unwrap()
    }

    #[test]
    fn test_names_are_unique() {
        let mut graph = Graph::new(GraphKind::Step);
        let a = step(&mut graph, "a");
        step(&mut graph, "b");

        assert_eq!(
            graph.add_node("a", NodePayload::step("x")),
            Err(GraphError::NameNotUnique("a".to_string()))
        );
        assert_eq!(
            graph.rename_node(a, "b"),
            Err(GraphError::NameNotUnique("b".to_string()))
        );
        graph.rename_node(a, "c").unwrap();
        assert_eq!(graph.node_by_name("c"), Some(a));
        assert_eq!(graph.node_by_name("a"), None);
    }

    #[test]
    fn test_kind_mismatch() {
        let mut graph = Graph::new(GraphKind::Step);
        let err = graph
            .add_node("s", NodePayload::stage(Trigger::delta_seconds(0)))
            .unwrap_err();
        assert_eq!(
            err,
            GraphError::KindMismatch {
                expected: GraphKind::Step,
                found: NodeKind::Stage
            }
        );
        assert!(graph.is_empty());
    }

    #[test]
    fn test_duplicate_and_cycle_rejected_without_trace() {
        let mut graph = Graph::new(GraphKind::Step);
        let a = step(&mut graph, "a");
        let b = step(&mut graph, "b");
        let c = step(&mut graph, "c");
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();

        assert!(matches!(graph.connect(a, b), Err(GraphError::DuplicateEdge { .. })));
        assert!(matches!(graph.connect(c, a), Err(GraphError::CycleViolation { .. })));
        assert!(matches!(graph.connect(a, a), Err(GraphError::CycleViolation { .. })));

        assert_eq!(graph.edge_count(), 2);
        assert!(graph.node(c).unwrap().child_edges().is_empty());
        assert_eq!(graph.node(a).unwrap().parent_edges().len(), 0);
    }

    #[test]
    fn test_time_order_violation() {
        let mut graph = Graph::new(GraphKind::Stage);
        let late = stage(&mut graph, "late", Trigger::delta_seconds(60));
        let early = stage(&mut graph, "early", Trigger::delta_seconds(10));

        let err = graph.connect(late, early).unwrap_err();
        assert!(matches!(err, GraphError::TimeOrderViolation { parent_offset: 60, child_offset: 10, .. }));
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.timeline().unwrap().edges().is_empty());

        graph.connect(early, late).unwrap();
        assert!(graph.timeline().unwrap().has_edge(early, late));
    }

    #[test]
    fn test_step_graph_validity() {
        let mut graph = Graph::new(GraphKind::Step);
        assert_eq!(graph.errors(), vec![ValidationIssue::Empty]);

        let a = step(&mut graph, "a");
        assert!(graph.is_valid());
        assert_eq!(graph.find_root_node(), Ok(Some(a)));

        let b = step(&mut graph, "b");
        assert!(!graph.is_valid());
        assert!(matches!(graph.find_root_node(), Err(GraphError::MultipleRoots { .. })));

        graph.connect(a, b).unwrap();
        assert!(graph.is_valid());
    }

    #[test]
    fn test_stage_graph_allows_many_roots() {
        let mut graph = Graph::new(GraphKind::Stage);
        assert!(!graph.is_valid());
        stage(&mut graph, "a", Trigger::delta_seconds(0));
        stage(&mut graph, "b", Trigger::http_listener());
        assert!(graph.is_valid());
        assert_eq!(graph.find_roots().len(), 2);
        assert!(matches!(
            graph.find_root_node(),
            Err(GraphError::MultipleRoots { roots }) if roots == ["a", "b"]
        ));
    }

    #[test]
    fn test_destroy_node_cascades() {
        let mut graph = Graph::new(GraphKind::Stage);
        let a = stage(&mut graph, "a", Trigger::delta_seconds(0));
        let b = stage(&mut graph, "b", Trigger::delta_seconds(5));
        let c = stage(&mut graph, "c", Trigger::delta_seconds(9));
        graph.connect(a, b).unwrap();
        graph.connect(b, c).unwrap();

        graph.destroy_node(b).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert!(graph.node(b).is_none());
        assert!(!graph.timeline().unwrap().contains(b));
        assert!(graph.timeline().unwrap().edges().is_empty());
        assert!(graph.timeline_is_consistent());
        assert_eq!(graph.destroy_node(b).unwrap_err(), GraphError::NodeNotFound(b));
    }

    #[test]
    fn test_trigger_change_rejects_order_violation() {
        let mut graph = Graph::new(GraphKind::Stage);
        let a = stage(&mut graph, "a", Trigger::delta_seconds(10));
        let b = stage(&mut graph, "b", Trigger::delta_seconds(20));
        graph.connect(a, b).unwrap();

        let err = graph.set_trigger(b, Trigger::delta_seconds(5)).unwrap_err();
        assert!(matches!(err, GraphError::TimeOrderViolation { .. }));
        assert_eq!(graph.node(b).unwrap().trigger(), Some(&Trigger::delta_seconds(20)));

        graph.set_trigger(b, Trigger::delta_seconds(30)).unwrap();
        let offset = graph.timeline().unwrap().node(b).unwrap().offset;
        assert_eq!(offset.num_seconds(), 30);
    }

    #[test]
    fn test_set_trigger_needs_stage() {
        let mut graph = Graph::new(GraphKind::Step);
        let a = step(&mut graph, "a");
        assert_eq!(
            graph.set_trigger(a, Trigger::delta_seconds(0)),
            Err(GraphError::NotAStage("a".to_string()))
        );
    }

    #[test]
    fn test_conditions() {
        let mut graph = Graph::new(GraphKind::Step);
        let a = step(&mut graph, "a");
        let b = step(&mut graph, "b");
        let edge = graph.connect(a, b).unwrap();

        assert_eq!(graph.set_conditions(edge, vec![]), Err(GraphError::EmptyConditions(edge)));
        graph
            .set_conditions(edge, vec![EdgeCondition::new("result", "OK")])
            .unwrap();
        assert_eq!(graph.edge(edge).unwrap().payload.conditions().len(), 1);
    }

    #[test]
    fn test_one_notification_per_call() {
        let recorder = RecordingObserver::shared();
        let mut graph = Graph::new(GraphKind::Stage);
        graph.subscribe(recorder.clone());

        let a = stage(&mut graph, "a", Trigger::delta_seconds(0));
        let b = stage(&mut graph, "b", Trigger::delta_seconds(1));
        let edge = graph.connect(a, b).unwrap();
        assert_eq!(recorder.changes().len(), 3);

        let last = recorder.last_change().unwrap();
        assert_eq!(last.kind, ChangeKind::EdgeConnected);
        assert_eq!(last.added_edges, vec![edge]);
        assert_eq!(last.added_timeline_edges, vec![TimelineEdge::new(a, b)]);

        let _ = graph.connect(a, b);
        assert_eq!(recorder.changes().len(), 3);

        graph.select_for_edit(a).unwrap();
        assert_eq!(
            recorder.signals(),
            vec![EditorSignal::EditNode { graph: graph.id(), node: a }]
        );
    }

    #[test]
    fn test_step_connect_requests_edge_editing() {
        let recorder = RecordingObserver::shared();
        let mut graph = Graph::new(GraphKind::Step);
        graph.subscribe(recorder.clone());
        let a = step(&mut graph, "a");
        let b = step(&mut graph, "b");
        let edge = graph.connect(a, b).unwrap();

        assert_eq!(
            recorder.signals(),
            vec![EditorSignal::EditEdge { graph: graph.id(), edge }]
        );
    }

    #[test]
    fn test_timeline_autolayout_reports_moves() {
        let recorder = RecordingObserver::shared();
        let mut graph = Graph::new(GraphKind::Stage);
        graph.subscribe(recorder.clone());
        graph.set_timeline_layout(Some(LayoutConfig::timeline()));

        let a = stage(&mut graph, "a", Trigger::delta_seconds(0));
        stage(&mut graph, "b", Trigger::delta_seconds(0));

        let last = recorder.last_change().unwrap();
        assert!(!last.moved_timeline_nodes.is_empty());
        let pa = graph.timeline().unwrap().node(a).unwrap().position;
        let pb = graph
            .timeline()
            .unwrap()
            .node(graph.node_by_name("b").unwrap())
            .unwrap()
            .position;
        assert_ne!(pa, pb);
    }
}
