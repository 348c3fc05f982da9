//! In-memory node directory
//!
//! Holds a mutable list of nodes behind a mutex, records every label update
//! and can be told to fail listings or updates. Used by unit and integration
//! tests, and by dry-run mode to capture the writes a cycle would make.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{DirectoryError, NodeDirectory};
use crate::cluster::{Labels, Node};

/// A recorded `update_node_labels` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelUpdate {
    pub node_id: String,
    pub hostname: String,
    pub labels: Labels,
}

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    nodes: Mutex<Vec<Node>>,
    updates: Mutex<Vec<LabelUpdate>>,
    fail_list: AtomicBool,
    fail_updates: AtomicBool,
    check_versions: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self {
            nodes: Mutex::new(nodes),
            ..Default::default()
        }
    }

    /// Make `list_nodes` fail until switched off again
    pub fn set_fail_list(&self, fail: bool) {
        self.fail_list.store(fail, Ordering::SeqCst);
    }

    /// Make `update_node_labels` fail until switched off again
    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    /// Reject updates whose snapshot version differs from the stored one
    pub fn set_check_versions(&self, check: bool) {
        self.check_versions.store(check, Ordering::SeqCst);
    }

    /// Current state of a node by id
    pub fn node(&self, id: &str) -> Option<Node> {
        self.lock_nodes().iter().find(|n| n.id == id).cloned()
    }

    /// Change a node's availability, as an operator draining it would
    pub fn set_available(&self, hostname: &str, available: bool) {
        for node in self.lock_nodes().iter_mut() {
            if node.hostname == hostname {
                node.available = available;
                node.version = node.version.map(|v| v + 1);
            }
        }
    }

    /// Drop a node, as if it had left the swarm
    pub fn remove_node(&self, id: &str) {
        self.lock_nodes().retain(|n| n.id != id);
    }

    /// Every update call received so far
    pub fn updates(&self) -> Vec<LabelUpdate> {
        self.lock_updates().clone()
    }

    pub fn update_count(&self) -> usize {
        self.lock_updates().len()
    }

    fn lock_nodes(&self) -> MutexGuard<'_, Vec<Node>> {
        self.nodes.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_updates(&self) -> MutexGuard<'_, Vec<LabelUpdate>> {
        self.updates.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl NodeDirectory for InMemoryDirectory {
    async fn list_nodes(&self) -> Result<Vec<Node>, DirectoryError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(DirectoryError::Http("connection refused".to_string()));
        }
        Ok(self.lock_nodes().clone())
    }

    async fn update_node_labels(&self, node: &Node, labels: Labels) -> Result<(), DirectoryError> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(DirectoryError::Api {
                status: 500,
                message: "injected update failure".to_string(),
            });
        }

        let mut nodes = self.lock_nodes();
        let stored = nodes
            .iter_mut()
            .find(|n| n.id == node.id)
            .ok_or_else(|| DirectoryError::NodeNotFound(node.id.clone()))?;

        if self.check_versions.load(Ordering::SeqCst) {
            if let (Some(seen), Some(current)) = (node.version, stored.version) {
                if seen != current {
                    return Err(DirectoryError::VersionConflict {
                        node: node.id.clone(),
                        version: seen,
                        message: "update out of sequence".to_string(),
                    });
                }
            }
        }

        stored.labels = labels.clone();
        stored.version = stored.version.map(|v| v + 1);
        drop(nodes);

        self.lock_updates().push(LabelUpdate {
            node_id: node.id.clone(),
            hostname: node.hostname.clone(),
            labels,
        });
        Ok(())
    }
}
