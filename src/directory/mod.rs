//! Node directory - the cluster control plane as seen by the toggler
//!
//! The poll loop only needs two things from the orchestrator: a snapshot of
//! all nodes and a way to replace one node's label map. Both sit behind the
//! [`NodeDirectory`] trait so the core can run against the Docker Engine API
//! in production and against [`InMemoryDirectory`] in tests.

pub mod docker;
pub mod dry_run;
pub mod memory;

pub use docker::{DockerDirectory, DockerHost, DEFAULT_DOCKER_HOST, DEFAULT_REQUEST_TIMEOUT_SECS};
pub use dry_run::DryRunDirectory;
pub use memory::{InMemoryDirectory, LabelUpdate};

use async_trait::async_trait;
use thiserror::Error;

use crate::cluster::{Labels, Node};

/// Errors returned by a node directory
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("Node {0} not found")]
    NodeNotFound(String),

    #[error("Node {node} changed since version {version}: {message}")]
    VersionConflict {
        node: String,
        version: u64,
        message: String,
    },

    #[error("Invalid docker host: {0}")]
    InvalidHost(String),

    #[error("Request timeout must be at least one second")]
    InvalidTimeout,

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

// ============================================================================
// SBIO: Trait for abstraction (allows mocking in tests)
// ============================================================================

#[async_trait]
pub trait NodeDirectory: Send + Sync {
    /// Fetch a fresh snapshot of every node in the cluster.
    async fn list_nodes(&self) -> Result<Vec<Node>, DirectoryError>;

    /// Replace the label map of `node` with `labels`.
    ///
    /// `node` is the snapshot entry the new map was derived from; its
    /// `version` is used for an optimistic update when the backend supports
    /// one.
    async fn update_node_labels(&self, node: &Node, labels: Labels) -> Result<(), DirectoryError>;
}
