//! # Swarm placement constraints
//!
//! Watches the availability of a set of swarm nodes and toggles labels on
//! another set of nodes. When every watched node is unavailable the
//! configured labels are renamed to `prefix.key` on the toggle nodes, so
//! placement constraints keyed on the original name stop matching there. As
//! soon as one watched node is available again the labels get their original
//! names back.
//!
//! ```text
//!   watch nodes              toggle nodes
//!   ┌────────┐               ┌──────────────────────────┐
//!   │ db-1 ✗ │  all down ──▶ │ disabled.priority=high   │
//!   │ db-2 ✗ │               └──────────────────────────┘
//!   └────────┘
//!   ┌────────┐               ┌──────────────────────────┐
//!   │ db-1 ✓ │  any up ────▶ │ priority=high            │
//!   │ db-2 ✗ │               └──────────────────────────┘
//!   └────────┘
//! ```
//!
//! The workloads themselves are never touched; the scheduler does the rest.

pub mod availability;
pub mod node;
pub mod poll;
pub mod toggle;

pub use availability::{all_unavailable, available_watched};
pub use node::{Availability, Labels, Node, NodeRole, Platform};
pub use poll::{spawn_poll_loop, CycleReport, NodeOutcome, NodeReport, PollLoop};
pub use toggle::{
    disable, enable, plan_disable, plan_enable, plan_toggle, toggle, LabelRename, Prefix,
    ToggleDirection, ToggleOutcome, PREFIX_SEPARATOR,
};

/// Default time between poll cycles in seconds
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
