//! Label toggling
//!
//! Every requested label on a toggle node is in one of two states:
//!
//! - **Enabled**: present under its original key, e.g. `priority=high`
//! - **Disabled**: present under the prefixed key, e.g. `disabled.priority=high`
//!
//! Disabling renames enabled labels to their prefixed key, enabling renames
//! them back. Values are moved verbatim. Both directions are idempotent: a
//! label already in the target state is not found in the source state and is
//! left alone, so repeated cycles stop writing once the state is reached.

use std::fmt;

use tracing::{debug, info};

use super::node::{Labels, Node};
use crate::directory::{DirectoryError, NodeDirectory};

/// Separator between the prefix and the original key
pub const PREFIX_SEPARATOR: char = '.';

/// Namespace used for disabled labels
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prefix(String);

impl Prefix {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self(prefix.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `prefix.key`
    pub fn apply(&self, key: &str) -> String {
        format!("{}{}{}", self.0, PREFIX_SEPARATOR, key)
    }

    /// Inverse of [`Prefix::apply`]. Only a literal `prefix.` head is removed.
    pub fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        key.strip_prefix(self.0.as_str())?
            .strip_prefix(PREFIX_SEPARATOR)
    }

    /// True when `key` starts with `prefix.`
    pub fn is_prefixed(&self, key: &str) -> bool {
        self.strip(key).is_some()
    }
}

impl fmt::Display for Prefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Direction of a toggle, decided once per cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleDirection {
    Disable,
    Enable,
}

impl ToggleDirection {
    /// Disable when every watched node is unavailable, enable otherwise
    pub fn from_all_unavailable(all_unavailable: bool) -> Self {
        if all_unavailable {
            Self::Disable
        } else {
            Self::Enable
        }
    }
}

impl fmt::Display for ToggleDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disable => write!(f, "disable"),
            Self::Enable => write!(f, "enable"),
        }
    }
}

/// A single key rename
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelRename {
    pub from: String,
    pub to: String,
    pub value: String,
}

/// Result of planning a toggle against one label map
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// The label map after all renames
    pub labels: Labels,
    /// Renames that produced it, in request order
    pub renames: Vec<LabelRename>,
}

impl ToggleOutcome {
    pub fn changed(&self) -> bool {
        !self.renames.is_empty()
    }
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Rename every requested key present unprefixed to its prefixed form.
///
/// An existing prefixed entry for the same key is overwritten by the value
/// being moved.
pub fn plan_disable<K: AsRef<str>>(labels: &Labels, keys: &[K], prefix: &Prefix) -> ToggleOutcome {
    plan(labels, keys, |key| (key.to_string(), prefix.apply(key)))
}

/// Rename every requested key present in prefixed form back to the original key.
pub fn plan_enable<K: AsRef<str>>(labels: &Labels, keys: &[K], prefix: &Prefix) -> ToggleOutcome {
    plan(labels, keys, |key| (prefix.apply(key), key.to_string()))
}

/// Plan a toggle in the given direction
pub fn plan_toggle<K: AsRef<str>>(
    direction: ToggleDirection,
    labels: &Labels,
    keys: &[K],
    prefix: &Prefix,
) -> ToggleOutcome {
    match direction {
        ToggleDirection::Disable => plan_disable(labels, keys, prefix),
        ToggleDirection::Enable => plan_enable(labels, keys, prefix),
    }
}

fn plan<K, F>(labels: &Labels, keys: &[K], rename: F) -> ToggleOutcome
where
    K: AsRef<str>,
    F: Fn(&str) -> (String, String),
{
    let mut next = labels.clone();
    let mut renames = Vec::new();

    for key in keys {
        let (from, to) = rename(key.as_ref());
        let Some(value) = next.remove(&from) else {
            continue;
        };
        next.insert(to.clone(), value.clone());
        renames.push(LabelRename { from, to, value });
    }

    ToggleOutcome {
        labels: next,
        renames,
    }
}

// ============================================================================
// SBIO: I/O wrapper - one directory write per changed node
// ============================================================================

/// Disable the requested labels on `node`.
///
/// Returns `Ok(true)` when one update was sent, `Ok(false)` when none of the
/// keys was enabled and nothing was written.
pub async fn disable<D, K>(
    directory: &D,
    node: &Node,
    keys: &[K],
    prefix: &Prefix,
) -> Result<bool, DirectoryError>
where
    D: NodeDirectory + ?Sized,
    K: AsRef<str>,
{
    toggle(directory, ToggleDirection::Disable, node, keys, prefix).await
}

/// Enable the requested labels on `node`. Mirror of [`disable`].
pub async fn enable<D, K>(
    directory: &D,
    node: &Node,
    keys: &[K],
    prefix: &Prefix,
) -> Result<bool, DirectoryError>
where
    D: NodeDirectory + ?Sized,
    K: AsRef<str>,
{
    toggle(directory, ToggleDirection::Enable, node, keys, prefix).await
}

/// Apply a toggle in the given direction to `node`
pub async fn toggle<D, K>(
    directory: &D,
    direction: ToggleDirection,
    node: &Node,
    keys: &[K],
    prefix: &Prefix,
) -> Result<bool, DirectoryError>
where
    D: NodeDirectory + ?Sized,
    K: AsRef<str>,
{
    let outcome = plan_toggle(direction, &node.labels, keys, prefix);

    if !outcome.changed() {
        debug!(node = %node.id, hostname = %node.hostname, %direction, "Labels already in place");
        return Ok(false);
    }

    for rename in &outcome.renames {
        info!(
            node = %node.id,
            hostname = %node.hostname,
            "{} the label \"{}={}\" as \"{}\"",
            match direction {
                ToggleDirection::Disable => "Disabling",
                ToggleDirection::Enable => "Enabling",
            },
            rename.from,
            rename.value,
            rename.to
        );
    }

    directory.update_node_labels(node, outcome.labels).await?;
    Ok(true)
}
