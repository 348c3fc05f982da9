//! Node snapshot - one swarm node as seen by a single poll cycle
//!
//! Nodes are produced fresh by every `list_nodes` call and are never mutated
//! in place. Toggling builds a new [`Labels`] value which is sent back to the
//! directory as a full replacement.

use std::collections::BTreeMap;
use std::fmt;

/// Label map of a node. Ordered so that updates and logs are deterministic.
pub type Labels = BTreeMap<String, String>;

/// A swarm node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Opaque unique identifier assigned by the orchestrator
    pub id: String,

    /// Object version observed in the snapshot, used for optimistic updates
    pub version: Option<u64>,

    /// Hostname, used for watch and toggle matching
    pub hostname: String,

    /// Manager or worker
    pub role: NodeRole,

    /// Whether the orchestrator reports the node as schedulable (`active`)
    pub available: bool,

    /// Operating system and architecture
    pub platform: Platform,

    /// Current label map
    pub labels: Labels,
}

/// Platform description of a node
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub architecture: String,
}

/// Role of a node within the swarm
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeRole {
    Manager,
    Worker,
    Unknown(String),
}

impl NodeRole {
    /// Parse the orchestrator's role string
    pub fn parse(raw: &str) -> Self {
        match raw {
            "manager" => Self::Manager,
            "worker" => Self::Worker,
            other => Self::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manager => write!(f, "manager"),
            Self::Worker => write!(f, "worker"),
            Self::Unknown(raw) => write!(f, "{}", raw),
        }
    }
}

/// Scheduling availability as reported by the orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Active,
    Pause,
    Drain,
    Unknown(String),
}

impl Availability {
    /// Parse the orchestrator's availability string
    pub fn parse(raw: &str) -> Self {
        match raw {
            "active" => Self::Active,
            "pause" => Self::Pause,
            "drain" => Self::Drain,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Only `active` counts as available
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Active)
    }
}

impl Node {
    /// Create an available worker node with no labels
    pub fn new(id: impl Into<String>, hostname: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: None,
            hostname: hostname.into(),
            role: NodeRole::Worker,
            available: true,
            platform: Platform::default(),
            labels: Labels::new(),
        }
    }

    /// Set availability
    pub fn with_available(mut self, available: bool) -> Self {
        self.available = available;
        self
    }

    /// Add a label
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Set the object version
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    /// Set the role
    pub fn with_role(mut self, role: NodeRole) -> Self {
        self.role = role;
        self
    }
}
