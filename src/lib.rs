//! # stage-graph-kernel
//!
//! Consistency kernel for attack-scenario templates.
//!
//! A template is a graph of *stages*, each holding a graph of *steps*. The
//! kernel answers one question:
//!
//! > After this edit, is the template still well-formed, and when does each
//! > stage run relative to the others?
//!
//! ## Core Contract
//!
//! 1. Structural graphs stay acyclic with unique names and unique edges
//! 2. A delta stage never starts before a delta stage it depends on
//! 3. The timeline always equals the delta-dependency closure of the
//!    stage graph, bridging through listener stages
//! 4. Layouts are deterministic for the same structure and configuration
//!
//! ## Architecture
//!
//! ```text
//! TemplateDescription ──► Template ──► Graph (stages) ──► Graph (steps)
//!                                        │
//!                          connect / destroy / set_trigger
//!                                        │ snapshot → mutate → diff
//!                                        ▼
//!                                     Timeline ──► LayoutOrganizer
//!                                        │
//!                                  GraphObserver
//! ```
//!
//! ## Determinism Guarantees
//!
//! - Timeline edges are ordered by (parent, child)
//! - Sibling order is case-folded name, then a per-view tiebreak
//! - Fingerprints hash the identity-free canonical form

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod types;
pub mod graph;
pub mod sync;
pub mod timeline;
pub mod layout;
pub mod events;
pub mod template;
pub mod canonical;

// Re-exports
pub use types::{
    NodeId, Node, NodeKind, NodePayload, StepData, StageData, Position,
    EdgeId, Edge, EdgeCondition, EdgePayload,
    Trigger, TriggerKind, DeltaTrigger, ListenerTrigger, ListenerKind,
};
pub use graph::{
    Graph, GraphKind, GraphError, ValidationIssue, PathSearch,
    CanonicalGraph, HeldNode, HoldingArea, compare, timeline_edge_names,
};
pub use timeline::{Timeline, TimelineEdge, TimelineNode};
pub use sync::{DependencyDiff, induced_edges};
pub use layout::{
    BoundingBox, Bound, Forest, ForestNode, LayoutConfig, LayoutOrganizer,
    LayoutResult, LayoutSettings, Orientation, TreeLayout,
};
pub use events::{
    ChangeKind, EditorSignal, GraphChange, GraphId, GraphObserver,
    NoOpObserver, RecordingObserver,
};
pub use template::{
    Template, TemplateDescription, StageDescription, StepDescription,
    SuccessorDescription, TemplateError,
};
pub use canonical::CanonicalHasher;

/// Schema version of the template description format.
/// Increment on breaking changes to any description type.
pub const TEMPLATE_SCHEMA_VERSION: &str = "1.0.0";
