//! Core types for the stage graph kernel.

pub mod node;
pub mod edge;
pub mod trigger;

pub use node::{NodeId, Node, NodeKind, NodePayload, StepData, StageData, Position};
pub use edge::{EdgeId, Edge, EdgeCondition, EdgePayload};
pub use trigger::{Trigger, TriggerKind, DeltaTrigger, ListenerTrigger, ListenerKind};
