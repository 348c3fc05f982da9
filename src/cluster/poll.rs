//! Poll loop - evaluates the watched nodes and toggles labels on a timer
//!
//! Each cycle:
//! 1. Lists every node from the directory
//! 2. Decides whether all watched nodes are unavailable
//! 3. Disables or enables the configured labels on every toggle node
//!
//! Nothing is carried between cycles. A cycle always runs to completion;
//! shutdown is only observed while sleeping between cycles, so a node update
//! is never interrupted halfway.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::availability::{all_unavailable, available_watched};
use super::toggle::{toggle, ToggleDirection};
use crate::config::Settings;
use crate::directory::{DirectoryError, NodeDirectory};

/// What happened to one toggle node during a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOutcome {
    /// Labels were rewritten with one update call
    Changed,
    /// Labels were already in the target state
    Unchanged,
    /// Node disappeared before it could be updated
    Skipped(String),
    /// The update call failed; retried next cycle
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub node_id: String,
    pub hostname: String,
    pub outcome: NodeOutcome,
}

/// Summary of one poll cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Direction applied this cycle, `None` if the snapshot could not be read
    pub direction: Option<ToggleDirection>,
    /// Per toggle-node results in snapshot order
    pub nodes: Vec<NodeReport>,
    /// Listing error that aborted the cycle
    pub error: Option<String>,
}

impl CycleReport {
    fn listing_failed(error: String) -> Self {
        Self {
            error: Some(error),
            ..Default::default()
        }
    }

    pub fn all_unavailable(&self) -> Option<bool> {
        self.direction.map(|d| d == ToggleDirection::Disable)
    }

    pub fn changed_count(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Changed))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Failed(_)))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, NodeOutcome::Skipped(_)))
    }

    fn count(&self, pred: impl Fn(&NodeOutcome) -> bool) -> usize {
        self.nodes.iter().filter(|n| pred(&n.outcome)).count()
    }
}

/// Drives the label toggle against a node directory
pub struct PollLoop<D: ?Sized> {
    directory: Arc<D>,
    settings: Arc<Settings>,
}

impl<D: ?Sized> Clone for PollLoop<D> {
    fn clone(&self) -> Self {
        Self {
            directory: Arc::clone(&self.directory),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<D> PollLoop<D>
where
    D: NodeDirectory + ?Sized + 'static,
{
    pub fn new(directory: Arc<D>, settings: Arc<Settings>) -> Self {
        Self {
            directory,
            settings,
        }
    }

    /// Run a single evaluation cycle
    pub async fn run_cycle(&self) -> CycleReport {
        let nodes = match self.directory.list_nodes().await {
            Ok(nodes) => nodes,
            Err(e) => {
                error!("Failed to list nodes: {}", e);
                return CycleReport::listing_failed(e.to_string());
            }
        };

        let settings = &self.settings;
        let all_unavailable = all_unavailable(&nodes, &settings.watch);
        if all_unavailable {
            warn!("All watched nodes are unavailable");
        } else {
            debug!(
                available = ?available_watched(&nodes, &settings.watch),
                "One or more watched nodes are available"
            );
        }

        let direction = ToggleDirection::from_all_unavailable(all_unavailable);
        let mut report = CycleReport {
            direction: Some(direction),
            ..Default::default()
        };

        for node in nodes
            .iter()
            .filter(|node| settings.is_toggle_target(&node.hostname))
        {
            let result = toggle(
                self.directory.as_ref(),
                direction,
                node,
                settings.labels.as_slice(),
                &settings.prefix,
            )
            .await;

            let outcome = match result {
                Ok(true) => NodeOutcome::Changed,
                Ok(false) => NodeOutcome::Unchanged,
                Err(DirectoryError::NodeNotFound(id)) => {
                    warn!(hostname = %node.hostname, "Node {} vanished before update, skipping", id);
                    NodeOutcome::Skipped(format!("node {} not found", id))
                }
                Err(e @ DirectoryError::VersionConflict { .. }) => {
                    warn!(hostname = %node.hostname, "Node changed during cycle: {}", e);
                    NodeOutcome::Failed(e.to_string())
                }
                Err(e) => {
                    error!(
                        node = %node.id,
                        hostname = %node.hostname,
                        "Failed to {} labels: {}",
                        direction,
                        e
                    );
                    NodeOutcome::Failed(e.to_string())
                }
            };

            report.nodes.push(NodeReport {
                node_id: node.id.clone(),
                hostname: node.hostname.clone(),
                outcome,
            });
        }

        if report.changed_count() > 0 || report.failed_count() > 0 {
            info!(
                %direction,
                changed = report.changed_count(),
                failed = report.failed_count(),
                skipped = report.skipped_count(),
                "Poll cycle finished"
            );
        }

        report
    }

    /// Run cycles until `shutdown` turns true or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            watch = ?self.settings.watch,
            toggle = ?self.settings.toggle,
            labels = ?self.settings.labels,
            prefix = %self.settings.prefix,
            "Poll loop started, evaluating every {}s",
            self.settings.interval.as_secs()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            // A panic inside one cycle must not take the loop down with it
            let cycle = tokio::spawn({
                let this = self.clone();
                async move { this.run_cycle().await }
            });
            if let Err(e) = cycle.await {
                error!("Poll cycle aborted: {}", e);
            }

            tokio::select! {
                _ = tokio::time::sleep(self.settings.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Poll loop shutting down");
    }
}

/// Spawn the poll loop as a background task
///
/// Returns a shutdown sender (send `true` to stop after the current cycle)
/// and the task handle.
pub fn spawn_poll_loop<D>(
    directory: Arc<D>,
    settings: Arc<Settings>,
) -> (watch::Sender<bool>, JoinHandle<()>)
where
    D: NodeDirectory + ?Sized + 'static,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let poll = PollLoop::new(directory, settings);
    let handle = tokio::spawn(poll.run(shutdown_rx));
    (shutdown_tx, handle)
}
