//! Template descriptions: the serialized form of a scenario template.
//!
//! ## Format
//!
//! ```text
//! {
//!   "name": "phishing",
//!   "stages": [
//!     { "name": "recon", "trigger_type": "delta",
//!       "trigger_args": { "minutes": 5 },
//!       "depends_on": [],
//!       "steps": [
//!         { "name": "scan", "module": "nmap", "arguments": { ... },
//!           "next": [ { "step": "exploit", "type": "result", "value": "OK" } ] },
//!         { "name": "exploit", "module": "ms17_010" }
//!       ] },
//!     { "name": "wait", "trigger_type": "HTTPListener",
//!       "trigger_args": { "port": 8080 }, "depends_on": ["recon"] }
//!   ]
//! }
//! ```
//!
//! Several `next` entries for the same successor become one edge with
//! several conditions. An entry without `type` adds the edge without a
//! condition.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::graph::{Graph, GraphError, GraphKind};
use crate::types::{
    DeltaTrigger, EdgeCondition, ListenerKind, ListenerTrigger, NodeId, NodePayload, StageData, StepData,
    Trigger,
};

/// `trigger_type` spelling of delta triggers.
pub const DELTA_TRIGGER_TYPE: &str = "delta";

/// Serialized template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateDescription {
    /// Template name.
    #[serde(default)]
    pub name: String,
    /// Stages in creation order.
    #[serde(default)]
    pub stages: Vec<StageDescription>,
}

/// Serialized stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescription {
    /// Unique stage name.
    pub name: String,
    /// `delta`, `HTTPListener` or `MSFListener`.
    pub trigger_type: String,
    /// Trigger arguments; `hours`/`minutes`/`seconds` for delta triggers.
    #[serde(default)]
    pub trigger_args: BTreeMap<String, serde_json::Value>,
    /// Names of the stages this one depends on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    /// Steps in creation order.
    #[serde(default)]
    pub steps: Vec<StepDescription>,
}

/// Serialized step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDescription {
    /// Unique step name within its stage.
    pub name: String,
    /// Module executed by the step.
    pub module: String,
    /// Module arguments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub arguments: BTreeMap<String, serde_json::Value>,
    /// Successor steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next: Vec<SuccessorDescription>,
}

/// One successor entry of a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessorDescription {
    /// Successor step name.
    pub step: String,
    /// Condition output type.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Condition value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// Error type for template import.
#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    /// The description is not valid JSON for the format.
    #[error("Invalid template JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// `trigger_type` is not one of the known spellings.
    #[error("Stage {stage}: unknown trigger type {trigger_type}")]
    UnknownTriggerType {
        /// Stage name.
        stage: String,
        /// Offending spelling.
        trigger_type: String,
    },
    /// Delta trigger arguments could not be read.
    #[error("Stage {stage}: invalid trigger arguments: {reason}")]
    InvalidTriggerArgs {
        /// Stage name.
        stage: String,
        /// Parser message.
        reason: String,
    },
    /// `depends_on` names a stage that does not exist.
    #[error("Stage {stage} depends on unknown stage {dependency}")]
    UnknownDependency {
        /// Stage name.
        stage: String,
        /// Missing dependency.
        dependency: String,
    },
    /// `next` names a step that does not exist in the same stage.
    #[error("Step {stage}/{step}: unknown successor {successor}")]
    UnknownSuccessor {
        /// Stage name.
        stage: String,
        /// Step name.
        step: String,
        /// Missing successor.
        successor: String,
    },
    /// The structure itself was rejected.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// A scenario template: a named stage graph.
#[derive(Debug)]
pub struct Template {
    /// Template name.
    pub name: String,
    /// Stage graph; every stage owns its step graph.
    pub stages: Graph,
}

impl Template {
    /// Create an empty template.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: Graph::new(GraphKind::Stage),
        }
    }

    /// Parse and import a JSON description.
    pub fn from_json(json: &str) -> Result<Self, TemplateError> {
        let description: TemplateDescription = serde_json::from_str(json)?;
        Self::from_description(&description)
    }

    /// Build the stage graph and every step graph of a description.
    ///
    /// Stages and steps are created in description order, then connected.
    /// Connections go through the regular checks, so cycles, duplicate
    /// dependencies and time-order violations are rejected.
    pub fn from_description(description: &TemplateDescription) -> Result<Self, TemplateError> {
        let mut template = Self::new(description.name.clone());

        let mut ids = Vec::with_capacity(description.stages.len());
        for stage in &description.stages {
            let trigger = parse_trigger(stage)?;
            let steps = build_steps(stage)?;
            ids.push(template.stages.add_node(
                stage.name.clone(),
                NodePayload::Stage(StageData::new(trigger).with_steps(steps)),
            )?);
        }

        for (stage, &child) in description.stages.iter().zip(&ids) {
            for dependency in &stage.depends_on {
                let parent = template.stages.node_by_name(dependency).ok_or_else(|| {
                    TemplateError::UnknownDependency {
                        stage: stage.name.clone(),
                        dependency: dependency.clone(),
                    }
                })?;
                template.stages.connect(parent, child)?;
            }
        }

        template.stages.rebuild_timeline();
        tracing::debug!(
            template = %template.name,
            stages = template.stages.len(),
            timeline_edges = template.stages.timeline().map_or(0, |t| t.edges().len()),
            "template imported"
        );
        Ok(template)
    }

    /// Export the template in creation order.
    pub fn describe(&self) -> TemplateDescription {
        let stages = self
            .stages
            .nodes()
            .filter_map(|(id, node)| match node.payload() {
                NodePayload::Stage(stage) => Some(StageDescription {
                    name: node.name().to_string(),
                    trigger_type: trigger_type(&stage.trigger),
                    trigger_args: trigger_args(&stage.trigger),
                    depends_on: self
                        .stages
                        .parents(id)
                        .into_iter()
                        .filter_map(|p| self.stages.node(p).map(|n| n.name().to_string()))
                        .collect(),
                    steps: describe_steps(&stage.steps),
                }),
                NodePayload::Step(_) => None,
            })
            .collect();

        TemplateDescription {
            name: self.name.clone(),
            stages,
        }
    }

    /// Export as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, TemplateError> {
        Ok(serde_json::to_string_pretty(&self.describe())?)
    }
}

fn parse_trigger(stage: &StageDescription) -> Result<Trigger, TemplateError> {
    if stage.trigger_type.eq_ignore_ascii_case(DELTA_TRIGGER_TYPE) {
        let args = serde_json::Value::Object(stage.trigger_args.clone().into_iter().collect());
        let delta: DeltaTrigger =
            serde_json::from_value(args).map_err(|e| TemplateError::InvalidTriggerArgs {
                stage: stage.name.clone(),
                reason: e.to_string(),
            })?;
        return Ok(Trigger::Delta(delta));
    }

    match ListenerKind::from_str(&stage.trigger_type) {
        Some(kind) => Ok(Trigger::Listener(ListenerTrigger {
            kind,
            args: stage.trigger_args.clone(),
        })),
        None => Err(TemplateError::UnknownTriggerType {
            stage: stage.name.clone(),
            trigger_type: stage.trigger_type.clone(),
        }),
    }
}

fn trigger_type(trigger: &Trigger) -> String {
    match trigger {
        Trigger::Delta(_) => DELTA_TRIGGER_TYPE.to_string(),
        Trigger::Listener(listener) => listener.kind.trigger_type().to_string(),
    }
}

fn trigger_args(trigger: &Trigger) -> BTreeMap<String, serde_json::Value> {
    match trigger {
        Trigger::Delta(delta) => BTreeMap::from([
            ("hours".to_string(), delta.hours.into()),
            ("minutes".to_string(), delta.minutes.into()),
            ("seconds".to_string(), delta.seconds.into()),
        ]),
        Trigger::Listener(listener) => listener.args.clone(),
    }
}

fn build_steps(stage: &StageDescription) -> Result<Graph, TemplateError> {
    let mut graph = Graph::new(GraphKind::Step);
    let mut ids: Vec<NodeId> = Vec::with_capacity(stage.steps.len());
    for step in &stage.steps {
        let data = StepData {
            module: step.module.clone(),
            arguments: step.arguments.clone(),
        };
        ids.push(graph.add_node(step.name.clone(), NodePayload::Step(data))?);
    }

    for (step, &parent) in stage.steps.iter().zip(&ids) {
        // Successors in first-mention order, conditions grouped per successor.
        let mut grouped: Vec<(String, Vec<EdgeCondition>)> = Vec::new();
        for successor in &step.next {
            let index = match grouped.iter().position(|(name, _)| *name == successor.step) {
                Some(index) => index,
                None => {
                    grouped.push((successor.step.clone(), Vec::new()));
                    grouped.len() - 1
                }
            };
            if let Some(kind) = &successor.kind {
                grouped[index]
                    .1
                    .push(EdgeCondition::new(kind.clone(), successor.value.clone().unwrap_or_default()));
            }
        }

        for (successor, conditions) in grouped {
            let child = graph
                .node_by_name(&successor)
                .ok_or_else(|| TemplateError::UnknownSuccessor {
                    stage: stage.name.clone(),
                    step: step.name.clone(),
                    successor: successor.clone(),
                })?;
            let edge = graph.connect(parent, child)?;
            if !conditions.is_empty() {
                graph.set_conditions(edge, conditions)?;
            }
        }
    }
    Ok(graph)
}

fn describe_steps(graph: &Graph) -> Vec<StepDescription> {
    graph
        .nodes()
        .filter_map(|(_, node)| {
            let NodePayload::Step(step) = node.payload() else {
                return None;
            };
            let next = node
                .child_edges()
                .iter()
                .filter_map(|&e| graph.edge(e))
                .flat_map(|edge| {
                    let successor = graph
                        .node(edge.child)
                        .map(|n| n.name().to_string())
                        .unwrap_or_default();
                    let conditions = edge.payload.conditions();
                    if conditions.is_empty() {
                        vec![SuccessorDescription {
                            step: successor,
                            kind: None,
                            value: None,
                        }]
                    } else {
                        conditions
                            .iter()
                            .map(|c| SuccessorDescription {
                                step: successor.clone(),
                                kind: Some(c.kind.clone()),
                                value: Some(c.value.clone()),
                            })
                            .collect()
                    }
                })
                .collect();
            Some(StepDescription {
                name: node.name().to_string(),
                module: step.module.clone(),
                arguments: step.arguments.clone(),
                next,
            })
        })
        .collect()
}
