//! Availability aggregation over the watched nodes

use std::collections::BTreeSet;

use super::node::Node;

/// Returns `true` when no watched node in the snapshot is available.
///
/// A watch set that matches no node at all also yields `true`: a watched node
/// that has disappeared from the swarm is treated the same as one that is
/// down, so the labels fall back to their disabled state.
pub fn all_unavailable(nodes: &[Node], watch: &BTreeSet<String>) -> bool {
    !nodes
        .iter()
        .any(|node| node.available && watch.contains(&node.hostname))
}

/// Hostnames of the watched nodes that are currently available
pub fn available_watched<'a>(nodes: &'a [Node], watch: &BTreeSet<String>) -> Vec<&'a str> {
    nodes
        .iter()
        .filter(|node| node.available && watch.contains(&node.hostname))
        .map(|node| node.hostname.as_str())
        .collect()
}
