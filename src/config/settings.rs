//! Resolved runtime settings
//!
//! Built once at startup from the command line and the optional file, checked,
//! and then only read. The poll loop holds them for its whole lifetime.

use std::collections::BTreeSet;
use std::time::Duration;

use super::file::{merge, PartialConfig};
use super::ConfigError;
use crate::cluster::{Prefix, DEFAULT_POLL_INTERVAL_SECS};

/// Prefix used when none is configured
pub const DEFAULT_PREFIX: &str = "disabled";

/// A requested label. Only the key takes part in matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub key: String,
    pub value: Option<String>,
}

impl LabelSpec {
    /// Parse `key` or `key=value`
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let (key, value) = match raw.split_once('=') {
            Some((key, value)) => (key.trim(), Some(value.to_string())),
            None => (raw.trim(), None),
        };

        if key.is_empty() {
            return Err(ConfigError::InvalidLabel(format!(
                "'{}' has an empty key",
                raw
            )));
        }
        if key.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidLabel(format!(
                "'{}' contains whitespace",
                key
            )));
        }

        Ok(Self {
            key: key.to_string(),
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Hostnames whose availability decides the toggle direction
    pub watch: BTreeSet<String>,
    /// Hostnames whose labels are toggled; empty means every node
    pub toggle: BTreeSet<String>,
    /// Label keys to toggle, in configured order
    pub labels: Vec<String>,
    pub prefix: Prefix,
    pub interval: Duration,
}

impl Settings {
    /// Build settings directly, without validation
    pub fn new<W, T, L>(watch: W, toggle: T, labels: L, prefix: impl Into<String>) -> Self
    where
        W: IntoIterator,
        W::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
        L: IntoIterator,
        L::Item: Into<String>,
    {
        Self {
            watch: watch.into_iter().map(Into::into).collect(),
            toggle: toggle.into_iter().map(Into::into).collect(),
            labels: labels.into_iter().map(Into::into).collect(),
            prefix: Prefix::new(prefix),
            interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Merge the command line with the optional file and validate the result
    pub fn resolve(cli: PartialConfig, file: Option<PartialConfig>) -> Result<Self, ConfigError> {
        let merged = match file {
            Some(file) => merge(cli, file),
            None => cli,
        };
        Self::from_partial(merged)
    }

    fn from_partial(config: PartialConfig) -> Result<Self, ConfigError> {
        let mut labels = Vec::new();
        for raw in &config.label {
            let key = LabelSpec::parse(raw)?.key;
            if !labels.contains(&key) {
                labels.push(key);
            }
        }

        let interval = config.interval.unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        if interval == 0 {
            return Err(ConfigError::InvalidInterval);
        }

        // An empty toggle set means every node, which has to be asked for
        let toggle = hostnames(config.toggle);
        match (config.all_nodes, toggle.is_empty()) {
            (false, true) => return Err(ConfigError::Missing("toggle")),
            (true, false) => return Err(ConfigError::ConflictingToggle),
            _ => {}
        }

        let settings = Self {
            watch: hostnames(config.watch),
            toggle,
            labels,
            prefix: Prefix::new(
                config
                    .prefix
                    .unwrap_or_else(|| DEFAULT_PREFIX.to_string())
                    .trim(),
            ),
            interval: Duration::from_secs(interval),
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the loop cannot act on
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.is_empty() {
            return Err(ConfigError::Missing("watch"));
        }
        if self.labels.is_empty() {
            return Err(ConfigError::Missing("label"));
        }

        let prefix = self.prefix.as_str();
        if prefix.is_empty() {
            return Err(ConfigError::Missing("prefix"));
        }
        if prefix.chars().any(|c| c.is_whitespace() || c == '=') || prefix.chars().all(|c| c == '.') {
            return Err(ConfigError::InvalidPrefix(prefix.to_string()));
        }

        // A key that already carries the prefix could never be enabled again
        if let Some(key) = self.labels.iter().find(|key| self.prefix.is_prefixed(key)) {
            return Err(ConfigError::InvalidLabel(format!(
                "'{}' already starts with the prefix '{}.'",
                key, self.prefix
            )));
        }

        Ok(())
    }

    /// Whether labels on `hostname` are toggled
    pub fn is_toggle_target(&self, hostname: &str) -> bool {
        self.toggle.is_empty() || self.toggle.contains(hostname)
    }
}

fn hostnames(raw: Vec<String>) -> BTreeSet<String> {
    raw.into_iter()
        .map(|h| h.trim().to_string())
        .filter(|h| !h.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(watch: &[&str], toggle: &[&str], label: &[&str]) -> PartialConfig {
        PartialConfig {
            watch: watch.iter().map(|s| s.to_string()).collect(),
            toggle: toggle.iter().map(|s| s.to_string()).collect(),
            label: label.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_label_spec_parse() {
        assert_eq!(
            LabelSpec::parse("priority").unwrap(),
            LabelSpec {
                key: "priority".to_string(),
                value: None
            }
        );
        let spec = LabelSpec::parse("priority=high").unwrap();
        assert_eq!(spec.key, "priority");
        assert_eq!(spec.value.as_deref(), Some("high"));

        let spec = LabelSpec::parse("a=b=c").unwrap();
        assert_eq!(spec.key, "a");
        assert_eq!(spec.value.as_deref(), Some("b=c"));

        assert!(LabelSpec::parse("=high").is_err());
        assert!(LabelSpec::parse("").is_err());
        assert!(LabelSpec::parse("two words").is_err());
    }

    #[test]
    fn test_resolve_defaults() {
        let settings = Settings::resolve(cli(&["n1"], &["n2"], &["priority=high"]), None).unwrap();

        assert_eq!(settings.labels, vec!["priority"]);
        assert_eq!(settings.prefix.as_str(), DEFAULT_PREFIX);
        assert_eq!(settings.interval, Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
        assert!(settings.watch.contains("n1"));
        assert!(settings.is_toggle_target("n2"));
        assert!(!settings.is_toggle_target("n3"));
    }

    #[test]
    fn test_resolve_merges_file() {
        let file = PartialConfig {
            watch: vec!["n4".to_string()],
            label: vec!["priority".to_string(), "ssd".to_string()],
            prefix: Some("off".to_string()),
            interval: Some(3),
            ..Default::default()
        };
        let settings =
            Settings::resolve(cli(&["n1"], &["n2"], &["priority=high"]), Some(file)).unwrap();

        assert_eq!(settings.watch.len(), 2);
        assert_eq!(settings.labels, vec!["priority", "ssd"]);
        assert_eq!(settings.prefix.as_str(), "off");
        assert_eq!(settings.interval, Duration::from_secs(3));
    }

    #[test]
    fn test_missing_values_fail() {
        assert!(matches!(
            Settings::resolve(cli(&[], &["n2"], &["p"]), None),
            Err(ConfigError::Missing("watch"))
        ));
        assert!(matches!(
            Settings::resolve(cli(&["n1"], &[], &["p"]), None),
            Err(ConfigError::Missing("toggle"))
        ));
        assert!(matches!(
            Settings::resolve(cli(&["n1"], &["n2"], &[]), None),
            Err(ConfigError::Missing("label"))
        ));
        assert!(matches!(
            Settings::resolve(cli(&["  "], &["n2"], &["p"]), None),
            Err(ConfigError::Missing("watch"))
        ));

        let mut empty_prefix = cli(&["n1"], &["n2"], &["p"]);
        empty_prefix.prefix = Some(" ".to_string());
        assert!(matches!(
            Settings::resolve(empty_prefix, None),
            Err(ConfigError::Missing("prefix"))
        ));
    }

    #[test]
    fn test_invalid_values_fail() {
        let mut bad_prefix = cli(&["n1"], &["n2"], &["p"]);
        bad_prefix.prefix = Some("dis abled".to_string());
        assert!(matches!(
            Settings::resolve(bad_prefix, None),
            Err(ConfigError::InvalidPrefix(_))
        ));

        let mut zero_interval = cli(&["n1"], &["n2"], &["p"]);
        zero_interval.interval = Some(0);
        assert!(matches!(
            Settings::resolve(zero_interval, None),
            Err(ConfigError::InvalidInterval)
        ));

        assert!(matches!(
            Settings::resolve(cli(&["n1"], &["n2"], &["disabled.priority"]), None),
            Err(ConfigError::InvalidLabel(_))
        ));
    }

    #[test]
    fn test_empty_toggle_means_all_nodes() {
        let settings = Settings::new(["n1"], Vec::<String>::new(), ["priority"], "disabled");
        assert!(settings.is_toggle_target("anything"));
    }

    #[test]
    fn test_all_nodes_opt_in() {
        let mut all = cli(&["n1"], &[], &["priority"]);
        all.all_nodes = true;
        let settings = Settings::resolve(all, None).unwrap();
        assert!(settings.toggle.is_empty());
        assert!(settings.is_toggle_target("n2"));
        assert!(settings.is_toggle_target("n1"));

        // blank entries do not count as a toggle list
        let mut blank = cli(&["n1"], &[" "], &["priority"]);
        blank.all_nodes = true;
        assert!(Settings::resolve(blank, None).is_ok());

        let mut both = cli(&["n1"], &["n2"], &["priority"]);
        both.all_nodes = true;
        assert!(matches!(
            Settings::resolve(both, None),
            Err(ConfigError::ConflictingToggle)
        ));

        // the flag may come from the file while the rest is on the command line
        let file = PartialConfig {
            all_nodes: true,
            ..Default::default()
        };
        let settings = Settings::resolve(cli(&["n1"], &[], &["priority"]), Some(file)).unwrap();
        assert!(settings.is_toggle_target("anything"));
    }
}
