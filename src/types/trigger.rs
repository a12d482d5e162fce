//! Stage trigger descriptors.
//!
//! A stage starts either at a fixed offset from the scenario start (a
//! *delta* trigger) or when an external event arrives (a *listener*
//! trigger). Only delta triggers have a position in time before runtime.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

/// Discriminator for the two trigger families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Relative-time trigger.
    Delta,
    /// Event trigger.
    Listener,
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delta => write!(f, "delta"),
            Self::Listener => write!(f, "listener"),
        }
    }
}

/// Relative-time trigger: the stage starts this long after the scenario.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeltaTrigger {
    /// Hours component.
    #[serde(default)]
    pub hours: u32,
    /// Minutes component.
    #[serde(default)]
    pub minutes: u32,
    /// Seconds component.
    #[serde(default)]
    pub seconds: u32,
}

impl DeltaTrigger {
    /// Create a delta trigger from its components.
    pub fn new(hours: u32, minutes: u32, seconds: u32) -> Self {
        Self { hours, minutes, seconds }
    }

    /// Create a delta trigger from a plain number of seconds.
    pub fn from_seconds(total: u32) -> Self {
        Self {
            hours: total / 3600,
            minutes: (total % 3600) / 60,
            seconds: total % 60,
        }
    }

    /// Total offset in seconds.
    pub fn total_seconds(&self) -> i64 {
        i64::from(self.hours) * 3600 + i64::from(self.minutes) * 60 + i64::from(self.seconds)
    }

    /// Offset from the scenario start.
    pub fn offset(&self) -> Duration {
        Duration::seconds(self.total_seconds())
    }
}

// Two delta triggers are ordered by the instant they fire, not by components.
impl PartialOrd for DeltaTrigger {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeltaTrigger {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.total_seconds()
            .cmp(&other.total_seconds())
            .then_with(|| (self.hours, self.minutes, self.seconds).cmp(&(other.hours, other.minutes, other.seconds)))
    }
}

/// Kind of external event a listener waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ListenerKind {
    /// HTTP request hitting a configured route.
    Http,
    /// Metasploit session becoming available.
    Msf,
}

impl ListenerKind {
    /// Parse a listener kind from its template `trigger_type` spelling.
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "httplistener" | "http" => Some(Self::Http),
            "msflistener" | "msf" => Some(Self::Msf),
            _ => None,
        }
    }

    /// The `trigger_type` spelling used in template descriptions.
    pub fn trigger_type(&self) -> &'static str {
        match self {
            Self::Http => "HTTPListener",
            Self::Msf => "MSFListener",
        }
    }
}

impl fmt::Display for ListenerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trigger_type())
    }
}

/// Event trigger. Arguments are preserved opaquely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerTrigger {
    /// What the listener waits for.
    pub kind: ListenerKind,
    /// Listener arguments (host, port, routes, ...).
    #[serde(default)]
    pub args: BTreeMap<String, serde_json::Value>,
}

impl ListenerTrigger {
    /// Create a listener trigger without arguments.
    pub fn new(kind: ListenerKind) -> Self {
        Self {
            kind,
            args: BTreeMap::new(),
        }
    }

    /// Add an argument.
    pub fn with_arg(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.args.insert(key.into(), value);
        self
    }
}

/// Scheduling anchor of a stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "args", rename_all = "snake_case")]
pub enum Trigger {
    /// Fixed offset from the scenario start.
    Delta(DeltaTrigger),
    /// External event; start time unknown until runtime.
    Listener(ListenerTrigger),
}

impl Trigger {
    /// Shorthand for a delta trigger of `seconds`.
    pub fn delta_seconds(seconds: u32) -> Self {
        Self::Delta(DeltaTrigger::from_seconds(seconds))
    }

    /// Shorthand for an HTTP listener without arguments.
    pub fn http_listener() -> Self {
        Self::Listener(ListenerTrigger::new(ListenerKind::Http))
    }

    /// Trigger family.
    pub fn kind(&self) -> TriggerKind {
        match self {
            Self::Delta(_) => TriggerKind::Delta,
            Self::Listener(_) => TriggerKind::Listener,
        }
    }

    /// Whether the trigger is a relative-time trigger.
    pub fn is_delta(&self) -> bool {
        matches!(self, Self::Delta(_))
    }

    /// Start time relative to the scenario start, if known before runtime.
    pub fn start_time(&self) -> Option<Duration> {
        match self {
            Self::Delta(delta) => Some(delta.offset()),
            Self::Listener(_) => None,
        }
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::Delta(DeltaTrigger::default())
    }
}
