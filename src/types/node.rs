//! Node types for stage and step graphs.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::edge::EdgeId;
use super::trigger::Trigger;
use crate::graph::{Graph, GraphKind};

/// Stable handle to a node slot inside its owning graph.
///
/// Identifiers are never reused within one graph instance, so a handle to a
/// destroyed node stays invalid instead of aliasing a newer node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    /// Slot index inside the owning graph's arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// 2-D position of a node on the editor canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Position {
    /// Create a new position.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Kind discriminator for nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// A single attack step.
    Step,
    /// A stage grouping steps under one trigger.
    Stage,
}

impl NodeKind {
    /// Graph flavor that holds nodes of this kind.
    pub fn graph_kind(&self) -> GraphKind {
        match self {
            Self::Step => GraphKind::Step,
            Self::Stage => GraphKind::Stage,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step => write!(f, "step"),
            Self::Stage => write!(f, "stage"),
        }
    }
}

/// Payload of a step node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepData {
    /// Module executed by the step.
    pub module: String,
    /// Module arguments, preserved opaquely.
    #[serde(default)]
    pub arguments: BTreeMap<String, serde_json::Value>,
}

impl StepData {
    /// Create step data for a module without arguments.
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            arguments: BTreeMap::new(),
        }
    }

    /// Add a module argument.
    pub fn with_argument(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.arguments.insert(key.into(), value);
        self
    }
}

/// Payload of a stage node.
///
/// A stage is composite: it owns the step graph executed when it fires.
#[derive(Debug)]
pub struct StageData {
    /// Scheduling anchor.
    pub trigger: Trigger,
    /// Steps executed by this stage.
    pub steps: Graph,
}

impl StageData {
    /// Create a stage with an empty step graph.
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            steps: Graph::new(GraphKind::Step),
        }
    }

    /// Replace the stage's step graph.
    pub fn with_steps(mut self, steps: Graph) -> Self {
        self.steps = steps;
        self
    }
}

/// Tagged node payload.
#[derive(Debug)]
pub enum NodePayload {
    /// Step node.
    Step(StepData),
    /// Stage node.
    Stage(StageData),
}

impl NodePayload {
    /// Shorthand for a stage payload with an empty step graph.
    pub fn stage(trigger: Trigger) -> Self {
        Self::Stage(StageData::new(trigger))
    }

    /// Shorthand for a step payload.
    pub fn step(module: impl Into<String>) -> Self {
        Self::Step(StepData::new(module))
    }

    /// Kind discriminator.
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Step(_) => NodeKind::Step,
            Self::Stage(_) => NodeKind::Stage,
        }
    }

    /// Trigger of a stage payload.
    pub fn trigger(&self) -> Option<&Trigger> {
        match self {
            Self::Stage(stage) => Some(&stage.trigger),
            Self::Step(_) => None,
        }
    }
}

/// A node in a stage or step graph.
///
/// Adjacency is stored as ordered lists of edge handles; the edges
/// themselves live in the owning graph's arena.
#[derive(Debug)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) payload: NodePayload,
    pub(crate) parent_edges: Vec<EdgeId>,
    pub(crate) child_edges: Vec<EdgeId>,
    pub(crate) position: Position,
}

impl Node {
    pub(crate) fn new(name: String, payload: NodePayload) -> Self {
        Self {
            name,
            payload,
            parent_edges: Vec::new(),
            child_edges: Vec::new(),
            position: Position::default(),
        }
    }

    /// Name, unique within the owning graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node payload.
    pub fn payload(&self) -> &NodePayload {
        &self.payload
    }

    /// Mutable access to a step payload.
    pub fn step_mut(&mut self) -> Option<&mut StepData> {
        match &mut self.payload {
            NodePayload::Step(step) => Some(step),
            NodePayload::Stage(_) => None,
        }
    }

    /// Mutable access to a stage's step graph.
    ///
    /// The trigger is not exposed mutably; use `Graph::set_trigger` so the
    /// timeline stays in sync.
    pub fn steps_mut(&mut self) -> Option<&mut Graph> {
        match &mut self.payload {
            NodePayload::Stage(stage) => Some(&mut stage.steps),
            NodePayload::Step(_) => None,
        }
    }

    /// Kind discriminator.
    pub fn kind(&self) -> NodeKind {
        self.payload.kind()
    }

    /// Trigger, for stage nodes.
    pub fn trigger(&self) -> Option<&Trigger> {
        self.payload.trigger()
    }

    /// Whether the node is a stage anchored to a relative time.
    pub fn is_delta(&self) -> bool {
        self.trigger().is_some_and(Trigger::is_delta)
    }

    /// Incoming edges, in connection order.
    pub fn parent_edges(&self) -> &[EdgeId] {
        &self.parent_edges
    }

    /// Outgoing edges, in connection order.
    pub fn child_edges(&self) -> &[EdgeId] {
        &self.child_edges
    }

    /// Whether the node has no incoming edges.
    pub fn is_root(&self) -> bool {
        self.parent_edges.is_empty()
    }

    /// Canvas position.
    pub fn position(&self) -> Position {
        self.position
    }
}
