use clap::{ArgAction, Parser, ValueEnum};
use std::path::PathBuf;

use crate::cluster::{CycleReport, NodeOutcome, ToggleDirection};
use crate::config::{PartialConfig, Settings};
use crate::directory::{LabelUpdate, DEFAULT_DOCKER_HOST, DEFAULT_REQUEST_TIMEOUT_SECS};

#[derive(Parser, Debug)]
#[command(name = "swarm-constraint")]
#[command(about = "Toggles one or more constraints depending on node availability")]
#[command(version)]
pub struct Args {
    /// A node whose availability is to be watched (repeatable)
    #[arg(long, value_name = "HOSTNAME")]
    pub watch: Vec<String>,

    /// A node for which constraints are to be toggled (repeatable)
    #[arg(long, value_name = "HOSTNAME")]
    pub toggle: Vec<String>,

    /// Toggle labels on every node in the swarm instead of a --toggle list
    #[arg(long, conflicts_with = "toggle")]
    pub all_nodes: bool,

    /// A label to toggle according to availability of the watched nodes (repeatable, KEY or KEY=VALUE)
    #[arg(long, value_name = "LABEL")]
    pub label: Vec<String>,

    /// The prefix to use for disabled labels [default: disabled]
    #[arg(long, value_name = "PREFIX")]
    pub prefix: Option<String>,

    /// YAML file whose values are merged into the command line options
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Seconds between poll cycles [default: 10]
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Docker Engine endpoint of a swarm manager
    #[arg(long, env = "DOCKER_HOST", default_value = DEFAULT_DOCKER_HOST)]
    pub docker_host: String,

    /// Docker Engine request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Evaluate one cycle, print the planned label changes and exit without writing
    #[arg(long)]
    pub dry_run: bool,

    /// Log output format
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Enable verbose logging output (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Args {
    /// The command line as a configuration source
    pub fn to_partial(&self) -> PartialConfig {
        PartialConfig {
            watch: self.watch.clone(),
            toggle: self.toggle.clone(),
            all_nodes: self.all_nodes,
            label: self.label.clone(),
            prefix: self.prefix.clone(),
            interval: self.interval,
        }
    }

    /// Default log filter for the `-v` count
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

// ============================================================================
// SBIO: Pure display logic (no I/O - returns formatted strings)
// ============================================================================

/// Format the result of a dry-run cycle.
pub fn format_dry_run(settings: &Settings, report: &CycleReport, planned: &[LabelUpdate]) -> String {
    let mut output = String::new();

    output.push_str(&format!(
        "swarm-constraint v{} - Dry Run Mode\n\n",
        env!("CARGO_PKG_VERSION")
    ));

    output.push_str(&format!("Watch:  {}\n", join(settings.watch.iter())));
    if settings.toggle.is_empty() {
        output.push_str("Toggle: (all nodes)\n");
    } else {
        output.push_str(&format!("Toggle: {}\n", join(settings.toggle.iter())));
    }
    output.push_str(&format!("Labels: {}\n", join(settings.labels.iter())));
    output.push_str(&format!("Prefix: {}\n\n", settings.prefix));

    if let Some(error) = &report.error {
        output.push_str(&format!("Failed to list nodes: {}\n", error));
        return output;
    }

    match report.direction {
        Some(ToggleDirection::Disable) => {
            output.push_str("All watched nodes are unavailable: labels would be disabled\n")
        }
        Some(ToggleDirection::Enable) => {
            output.push_str("One or more watched nodes are available: labels would be enabled\n")
        }
        None => {}
    }

    if report.nodes.is_empty() {
        output.push_str("\nNo toggle nodes found.\n");
        return output;
    }

    output.push_str("\nToggle nodes:\n");
    for node in &report.nodes {
        let status = match &node.outcome {
            NodeOutcome::Changed => "would change".to_string(),
            NodeOutcome::Unchanged => "unchanged".to_string(),
            NodeOutcome::Skipped(reason) => format!("skipped ({})", reason),
            NodeOutcome::Failed(reason) => format!("failed ({})", reason),
        };
        output.push_str(&format!("  [{}] {}: {}\n", node.hostname, node.node_id, status));

        if let Some(update) = planned.iter().find(|u| u.node_id == node.node_id) {
            for (key, value) in &update.labels {
                output.push_str(&format!("      {}={}\n", key, value));
            }
        }
    }

    output
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(String::as_str).collect::<Vec<_>>().join(", ")
}
