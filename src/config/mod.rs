pub mod file;
pub mod settings;

pub use file::{merge, parse_config, PartialConfig};
pub use settings::{LabelSpec, Settings, DEFAULT_PREFIX};

use std::path::Path;
use thiserror::Error;

/// Errors raised while building the settings. All of them are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("No {0} given; pass --{0} or set it in the config file")]
    Missing(&'static str),

    #[error("--all-nodes and a toggle list are mutually exclusive")]
    ConflictingToggle,

    #[error("Invalid label: {0}")]
    InvalidLabel(String),

    #[error("Invalid prefix '{0}': must not contain whitespace or '=' and must not be only dots")]
    InvalidPrefix(String),

    #[error("Poll interval must be at least one second")]
    InvalidInterval,
}

// ============================================================================
// SBIO: I/O wrapper - thin layer over pure functions
// ============================================================================

/// Load and parse a configuration file from disk.
pub fn load_config_file(path: &Path) -> Result<PartialConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}
