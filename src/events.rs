//! Change notification for graph instances.
//!
//! Each graph carries its own observer list; there is no process-wide
//! channel. Observers are invoked synchronously at the end of the mutating
//! call, once per call.
//!
//! ## Re-entrancy
//!
//! Observers receive the change description, never the graph. An observer
//! must not call back into mutating operations of the graph that notified
//! it; doing so (for example through shared interior mutability) is
//! unsupported and its behavior is undefined.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timeline::TimelineEdge;
use crate::types::{EdgeId, NodeId};

/// Identity of one graph instance, used to scope notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GraphId(Uuid);

impl GraphId {
    /// Generate a fresh graph identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GraphId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GraphId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which mutating call produced a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeKind {
    /// `add_node` or a restore from the holding area.
    NodeAdded,
    /// `rename_node`.
    NodeRenamed,
    /// `destroy_node` or a move to the holding area.
    NodeDestroyed,
    /// `connect`.
    EdgeConnected,
    /// `destroy_edge`.
    EdgeDestroyed,
    /// `set_conditions`.
    ConditionsChanged,
    /// `set_trigger`.
    TriggerChanged,
    /// `set_position` or a layout pass.
    NodesMoved,
    /// `rebuild_timeline`.
    TimelineRebuilt,
}

/// Description of one mutating call, enough for incremental rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphChange {
    /// Graph that changed.
    pub graph: GraphId,
    /// Operation that produced the change.
    pub kind: ChangeKind,
    /// Nodes created.
    pub added_nodes: Vec<NodeId>,
    /// Nodes removed.
    pub removed_nodes: Vec<NodeId>,
    /// Structural edges created.
    pub added_edges: Vec<EdgeId>,
    /// Structural edges removed.
    pub removed_edges: Vec<EdgeId>,
    /// Timeline edges created.
    pub added_timeline_edges: Vec<TimelineEdge>,
    /// Timeline edges removed.
    pub removed_timeline_edges: Vec<TimelineEdge>,
    /// Structural nodes whose position changed.
    pub moved_nodes: Vec<NodeId>,
    /// Stages whose timeline node position changed.
    pub moved_timeline_nodes: Vec<NodeId>,
}

impl GraphChange {
    /// Create an empty change record.
    pub fn new(graph: GraphId, kind: ChangeKind) -> Self {
        Self {
            graph,
            kind,
            added_nodes: Vec::new(),
            removed_nodes: Vec::new(),
            added_edges: Vec::new(),
            removed_edges: Vec::new(),
            added_timeline_edges: Vec::new(),
            removed_timeline_edges: Vec::new(),
            moved_nodes: Vec::new(),
            moved_timeline_nodes: Vec::new(),
        }
    }

    /// Whether the timeline was touched.
    pub fn touches_timeline(&self) -> bool {
        !self.added_timeline_edges.is_empty() || !self.removed_timeline_edges.is_empty()
    }
}

/// Signals for collaborators outside the structure itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EditorSignal {
    /// A node was selected for parameter editing.
    EditNode {
        /// Graph holding the node.
        graph: GraphId,
        /// Selected node.
        node: NodeId,
    },
    /// A freshly connected step edge needs its conditions.
    EditEdge {
        /// Graph holding the edge.
        graph: GraphId,
        /// Edge to edit.
        edge: EdgeId,
    },
    /// A node left the structure for the holding area.
    MovedToHolding {
        /// Graph the node left.
        graph: GraphId,
        /// Node name (its handle is gone).
        name: String,
    },
    /// A node came back from the holding area.
    MovedFromHolding {
        /// Graph the node joined.
        graph: GraphId,
        /// New handle of the node.
        node: NodeId,
    },
}

/// Receiver of graph notifications.
pub trait GraphObserver: Send + Sync {
    /// Called once at the end of every mutating call.
    fn on_change(&self, change: &GraphChange);

    /// Called when an editor signal is raised.
    fn on_signal(&self, _signal: &EditorSignal) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpObserver;

impl GraphObserver for NoOpObserver {
    fn on_change(&self, _change: &GraphChange) {}
}

/// Observer that records everything, for tests and previews.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    changes: Mutex<Vec<GraphChange>>,
    signals: Mutex<Vec<EditorSignal>>,
}

impl RecordingObserver {
    /// Create a shareable recorder.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// All changes seen so far.
    pub fn changes(&self) -> Vec<GraphChange> {
        self.changes.lock().clone()
    }

    /// All signals seen so far.
    pub fn signals(&self) -> Vec<EditorSignal> {
        self.signals.lock().clone()
    }

    /// The most recent change.
    pub fn last_change(&self) -> Option<GraphChange> {
        self.changes.lock().last().cloned()
    }

    /// Forget everything recorded.
    pub fn clear(&self) {
        self.changes.lock().clear();
        self.signals.lock().clear();
    }
}

impl GraphObserver for RecordingObserver {
    fn on_change(&self, change: &GraphChange) {
        self.changes.lock().push(change.clone());
    }

    fn on_signal(&self, signal: &EditorSignal) {
        self.signals.lock().push(signal.clone());
    }
}

/// Observers registered on one graph instance.
#[derive(Default, Clone)]
pub(crate) struct ObserverList {
    observers: Vec<Arc<dyn GraphObserver>>,
}

impl ObserverList {
    pub(crate) fn push(&mut self, observer: Arc<dyn GraphObserver>) {
        self.observers.push(observer);
    }

    pub(crate) fn change(&self, change: &GraphChange) {
        for observer in &self.observers {
            observer.on_change(change);
        }
    }

    pub(crate) fn signal(&self, signal: &EditorSignal) {
        for observer in &self.observers {
            observer.on_signal(signal);
        }
    }
}

impl std::fmt::Debug for ObserverList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverList")
            .field("len", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graph_ids_are_unique() {
        let id = GraphId::new();
        assert_ne!(id, GraphId::new());
        assert_eq!(id.as_uuid().get_version_num(), 4);
    }

    #[test]
    fn test_touches_timeline() {
        let graph = GraphId::new();
        let mut change = GraphChange::new(graph, ChangeKind::EdgeConnected);
        assert!(!change.touches_timeline());

        change
            .removed_timeline_edges
            .push(TimelineEdge::new(NodeId::from_index(0), NodeId::from_index(1)));
        assert!(change.touches_timeline());
    }

    #[test]
    fn test_recording_observer() {
        let recorder = RecordingObserver::shared();
        let mut list = ObserverList::default();
        list.push(recorder.clone());
        list.push(Arc::new(NoOpObserver));

        let graph = GraphId::new();
        list.change(&GraphChange::new(graph, ChangeKind::NodeAdded));
        list.signal(&EditorSignal::MovedToHolding {
            graph,
            name: "recon".to_string(),
        });

        assert_eq!(recorder.changes().len(), 1);
        assert_eq!(recorder.signals().len(), 1);
        assert_eq!(recorder.last_change().map(|c| c.kind), Some(ChangeKind::NodeAdded));

        recorder.clear();
        assert!(recorder.changes().is_empty());
    }
}
