//! Configuration management
//!
//! TOML configuration with environment variable overrides and sensible
//! defaults. The node registry lives here as plain data and is handed to
//! whatever builds the store client; nothing in the crate keeps a global
//! registry.

use crate::aggregation::FetchOptions;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    /// Store cluster configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Aggregation tuning
    #[serde(default)]
    pub aggregation: AggregationConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One store node
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NodeDescriptor {
    /// Node name, unique within the registry
    pub name: String,

    /// Protocol-buffers endpoint, `host:port`
    pub pb_host_port: String,

    /// Node installation root (a leading `~` is expanded)
    pub rel_path: String,
}

/// Store cluster configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Known nodes
    #[serde(default = "default_nodes")]
    pub nodes: Vec<NodeDescriptor>,

    /// Connection timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

/// Aggregation configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AggregationConfig {
    /// Per-fetch timeout in milliseconds (0 = none)
    #[serde(default)]
    pub fetch_timeout_ms: u64,

    /// Maximum concurrent row fetches (0 = unbounded)
    #[serde(default)]
    pub max_in_flight: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace) or a full filter directive
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

// Default value functions
fn default_nodes() -> Vec<NodeDescriptor> {
    vec![NodeDescriptor {
        name: "devA".to_string(),
        pb_host_port: "127.0.0.1:10017".to_string(),
        rel_path: "~/src/riak_ee/dev/dev1/".to_string(),
    }]
}
fn default_connect_timeout_ms() -> u64 { 5_000 }
fn default_log_level() -> String { "info".to_string() }

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            nodes: default_nodes(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 0,
            max_in_flight: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file {}: {}", path, e))?;

        toml::from_str(&contents)
            .map_err(|e| format!("Failed to parse config file {}: {}", path, e))
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self, String> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// - `QTS_NODES`: `name=host:port@path,name=host:port@path`
    /// - `QTS_FETCH_TIMEOUT_MS`, `QTS_MAX_IN_FLIGHT`
    /// - `RUST_LOG`
    pub fn apply_env_overrides(&mut self) -> Result<(), String> {
        if let Ok(nodes) = std::env::var("QTS_NODES") {
            self.store.nodes = parse_nodes(&nodes)?;
        }

        if let Ok(timeout) = std::env::var("QTS_FETCH_TIMEOUT_MS") {
            if let Ok(t) = timeout.parse() {
                self.aggregation.fetch_timeout_ms = t;
            }
        }
        if let Ok(limit) = std::env::var("QTS_MAX_IN_FLIGHT") {
            if let Ok(l) = limit.parse() {
                self.aggregation.max_in_flight = l;
            }
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.store.nodes.is_empty() {
            return Err("At least one store node must be configured".to_string());
        }

        let mut names = HashSet::new();
        for node in &self.store.nodes {
            if node.name.is_empty() {
                return Err("Node name cannot be empty".to_string());
            }
            if !names.insert(node.name.as_str()) {
                return Err(format!("Duplicate node name: {}", node.name));
            }
            if !is_host_port(&node.pb_host_port) {
                return Err(format!(
                    "Node {} has invalid host:port '{}'",
                    node.name, node.pb_host_port
                ));
            }
        }

        if self.store.connect_timeout_ms == 0 {
            return Err("Connect timeout must be > 0".to_string());
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<(), String> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;

        std::fs::write(path, contents)
            .map_err(|e| format!("Failed to write config file {}: {}", path, e))
    }

    /// Fetch options for the aggregation engine
    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: (self.aggregation.fetch_timeout_ms > 0)
                .then(|| Duration::from_millis(self.aggregation.fetch_timeout_ms)),
            max_in_flight: (self.aggregation.max_in_flight > 0)
                .then_some(self.aggregation.max_in_flight),
        }
    }

    /// Look up a node by name
    pub fn node(&self, name: &str) -> Option<&NodeDescriptor> {
        self.store.nodes.iter().find(|n| n.name == name)
    }

    /// Register a node, replacing any node with the same name
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        pb_host_port: impl Into<String>,
        rel_path: impl Into<String>,
    ) {
        let node = NodeDescriptor {
            name: name.into(),
            pb_host_port: pb_host_port.into(),
            rel_path: rel_path.into(),
        };
        match self.store.nodes.iter_mut().find(|n| n.name == node.name) {
            Some(existing) => *existing = node,
            None => self.store.nodes.push(node),
        }
    }

    /// Remove a node by name, returning it if it was registered
    pub fn remove_node(&mut self, name: &str) -> Option<NodeDescriptor> {
        let index = self.store.nodes.iter().position(|n| n.name == name)?;
        Some(self.store.nodes.remove(index))
    }

    /// Pick a node at random
    pub fn any_node(&self) -> Option<&NodeDescriptor> {
        self.store.nodes.choose(&mut rand::thread_rng())
    }

    /// Endpoints of every node, in registry order
    pub fn endpoints(&self) -> Vec<&str> {
        self.store
            .nodes
            .iter()
            .map(|n| n.pb_host_port.as_str())
            .collect()
    }
}

/// Parse `name=host:port@path` entries separated by commas
fn parse_nodes(entries: &str) -> Result<Vec<NodeDescriptor>, String> {
    entries.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (name, rest) = entry
                .split_once('=')
                .ok_or_else(|| format!("Invalid node entry '{}': expected name=host:port@path", entry))?;
            let (pb_host_port, rel_path) = rest.split_once('@').unwrap_or((rest, ""));
            Ok(NodeDescriptor {
                name: name.to_string(),
                pb_host_port: pb_host_port.to_string(),
                rel_path: rel_path.to_string(),
            })
        })
        .collect()
}

fn is_host_port(value: &str) -> bool {
    match value.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().map_or(false, |p| p > 0),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.store.nodes.len(), 1);
        assert_eq!(config.store.nodes[0].pb_host_port, "127.0.0.1:10017");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_default_fetch_options_are_unbounded() {
        let options = Config::default().fetch_options();
        assert_eq!(options.timeout, None);
        assert_eq!(options.max_in_flight, None);
    }

    #[test]
    fn test_fetch_options_from_config() {
        let mut config = Config::default();
        config.aggregation.fetch_timeout_ms = 250;
        config.aggregation.max_in_flight = 8;
        let options = config.fetch_options();
        assert_eq!(options.timeout, Some(Duration::from_millis(250)));
        assert_eq!(options.max_in_flight, Some(8));
    }

    #[test]
    fn test_duplicate_node_names_rejected() {
        let mut config = Config::default();
        let node = config.store.nodes[0].clone();
        config.store.nodes.push(node);
        assert!(config.validate().unwrap_err().contains("Duplicate"));
    }

    #[test]
    fn test_invalid_host_port_rejected() {
        let mut config = Config::default();
        config.store.nodes[0].pb_host_port = "localhost".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_nodes() {
        let nodes = parse_nodes("a=10.0.0.1:8087@/opt/a, b=10.0.0.2:8087").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].rel_path, "/opt/a");
        assert_eq!(nodes[1].name, "b");
        assert_eq!(nodes[1].rel_path, "");
        assert!(parse_nodes("nonsense").is_err());
    }

    #[test]
    fn test_node_lookup_and_random_pick() {
        let mut config = Config::default();
        config.store.nodes.push(NodeDescriptor {
            name: "devB".to_string(),
            pb_host_port: "127.0.0.1:10027".to_string(),
            rel_path: "/tmp/dev2".to_string(),
        });
        assert_eq!(config.node("devB").unwrap().pb_host_port, "127.0.0.1:10027");
        assert!(config.node("devC").is_none());
        let picked = config.any_node().unwrap();
        assert!(config.endpoints().contains(&picked.pb_host_port.as_str()));
    }

    #[test]
    fn test_add_node_replaces_by_name() {
        let mut config = Config::default();
        config.add_node("devB", "127.0.0.1:10027", "/tmp/dev2");
        config.add_node("devA", "127.0.0.1:10018", "/tmp/dev1");

        assert_eq!(config.store.nodes.len(), 2);
        assert_eq!(config.endpoints(), vec!["127.0.0.1:10018", "127.0.0.1:10027"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_remove_node() {
        let mut config = Config::default();
        config.add_node("devB", "127.0.0.1:10027", "");

        let removed = config.remove_node("devA").unwrap();
        assert_eq!(removed.pb_host_port, "127.0.0.1:10017");
        assert!(config.remove_node("devA").is_none());
        assert_eq!(config.any_node().unwrap().name, "devB");

        config.remove_node("devB");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("qts.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.aggregation.max_in_flight = 4;
        config.save_to_file(path).unwrap();

        let loaded = Config::from_file(path).unwrap();
        assert_eq!(loaded.aggregation.max_in_flight, 4);
        assert_eq!(loaded.store.nodes, config.store.nodes);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str("[aggregation]\nfetch_timeout_ms = 100\n").unwrap();
        assert_eq!(config.aggregation.fetch_timeout_ms, 100);
        assert_eq!(config.store.nodes[0].name, "devA");
        assert_eq!(config.logging.level, "info");
    }
}
