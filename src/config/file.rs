use serde::Deserialize;

use super::ConfigError;

/// One source of configuration, either the command line or the YAML file.
///
/// ```yaml
/// watch:
///   - db-primary
/// toggle:
///   - app-1
///   - app-2
/// # or, instead of a toggle list:
/// # all_nodes: true
/// label:
///   - priority
///   - ssd=true
/// prefix: disabled
/// interval: 10
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialConfig {
    /// Hostnames whose availability is watched
    #[serde(default)]
    pub watch: Vec<String>,

    /// Hostnames whose labels are toggled
    #[serde(default)]
    pub toggle: Vec<String>,

    /// Toggle labels on every node instead of a `toggle` list
    #[serde(default)]
    pub all_nodes: bool,

    /// Label keys, optionally written as `key=value`
    #[serde(default)]
    pub label: Vec<String>,

    #[serde(default)]
    pub prefix: Option<String>,

    /// Poll interval in seconds
    #[serde(default)]
    pub interval: Option<u64>,
}

// ============================================================================
// SBIO: Pure business logic (no I/O)
// ============================================================================

/// Parse a configuration file from its YAML contents
pub fn parse_config(content: &str) -> Result<PartialConfig, ConfigError> {
    if content.trim().is_empty() {
        return Ok(PartialConfig::default());
    }
    serde_yaml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Combine two sources. Lists are concatenated with `primary` first and
/// duplicates dropped, scalars from `primary` win.
pub fn merge(primary: PartialConfig, secondary: PartialConfig) -> PartialConfig {
    PartialConfig {
        watch: merge_lists(primary.watch, secondary.watch),
        toggle: merge_lists(primary.toggle, secondary.toggle),
        all_nodes: primary.all_nodes || secondary.all_nodes,
        label: merge_lists(primary.label, secondary.label),
        prefix: primary.prefix.or(secondary.prefix),
        interval: primary.interval.or(secondary.interval),
    }
}

fn merge_lists(primary: Vec<String>, secondary: Vec<String>) -> Vec<String> {
    let mut merged: Vec<String> = Vec::with_capacity(primary.len() + secondary.len());
    for item in primary.into_iter().chain(secondary) {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
watch:
  - db-1
  - db-2
toggle: [app-1]
label:
  - priority
  - ssd=true
prefix: paused
interval: 30
"#;
        let config = parse_config(yaml).unwrap();
        assert_eq!(config.watch, vec!["db-1", "db-2"]);
        assert_eq!(config.toggle, vec!["app-1"]);
        assert_eq!(config.label, vec!["priority", "ssd=true"]);
        assert_eq!(config.prefix.as_deref(), Some("paused"));
        assert_eq!(config.interval, Some(30));
        assert!(!config.all_nodes);
    }

    #[test]
    fn test_parse_all_nodes() {
        let config = parse_config("watch: [db-1]\nall_nodes: true\nlabel: [priority]\n").unwrap();
        assert!(config.all_nodes);
        assert!(config.toggle.is_empty());
    }

    #[test]
    fn test_parse_empty_config() {
        assert_eq!(parse_config("").unwrap(), PartialConfig::default());
        assert_eq!(parse_config("  \n").unwrap(), PartialConfig::default());
    }

    #[test]
    fn test_parse_rejects_unknown_keys() {
        let result = parse_config("watchers: [db-1]\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_merge_is_additive() {
        let cli = PartialConfig {
            watch: vec!["db-1".to_string()],
            label: vec!["priority".to_string()],
            prefix: Some("cli".to_string()),
            ..Default::default()
        };
        let file = PartialConfig {
            watch: vec!["db-2".to_string(), "db-1".to_string()],
            toggle: vec!["app-1".to_string()],
            prefix: Some("file".to_string()),
            interval: Some(5),
            ..Default::default()
        };

        let merged = merge(cli, file);
        assert_eq!(merged.watch, vec!["db-1", "db-2"]);
        assert_eq!(merged.toggle, vec!["app-1"]);
        assert_eq!(merged.label, vec!["priority"]);
        assert_eq!(merged.prefix.as_deref(), Some("cli"));
        assert_eq!(merged.interval, Some(5));
        assert!(!merged.all_nodes);

        let from_file = PartialConfig {
            all_nodes: true,
            ..Default::default()
        };
        assert!(merge(PartialConfig::default(), from_file).all_nodes);
    }
}
