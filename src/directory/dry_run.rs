//! Read-only view over another directory
//!
//! Listings go to the wrapped directory, label updates are only recorded.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use super::{DirectoryError, LabelUpdate, NodeDirectory};
use crate::cluster::{Labels, Node};

pub struct DryRunDirectory<D> {
    inner: D,
    planned: Mutex<Vec<LabelUpdate>>,
}

impl<D: NodeDirectory> DryRunDirectory<D> {
    pub fn new(inner: D) -> Self {
        Self {
            inner,
            planned: Mutex::new(Vec::new()),
        }
    }

    /// Updates that would have been sent
    pub fn planned(&self) -> Vec<LabelUpdate> {
        self.planned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl<D: NodeDirectory> NodeDirectory for DryRunDirectory<D> {
    async fn list_nodes(&self) -> Result<Vec<Node>, DirectoryError> {
        self.inner.list_nodes().await
    }

    async fn update_node_labels(&self, node: &Node, labels: Labels) -> Result<(), DirectoryError> {
        info!(node = %node.id, hostname = %node.hostname, "Dry run: skipping label update");
        self.planned
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(LabelUpdate {
                node_id: node.id.clone(),
                hostname: node.hostname.clone(),
                labels,
            });
        Ok(())
    }
}
