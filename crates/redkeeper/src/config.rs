//! Configuration module for redkeeper
//!
//! One YAML file describes everything a pass needs: the static shard
//! layout, the Sentinel fleet, and the proxy pool assignments.

use std::collections::BTreeMap;

use proxygen::PoolSpec;
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Cluster layout
    pub cluster: ClusterConfig,
    /// Sentinel fleet connection URLs
    pub sentinels: Vec<String>,
    /// Sentinel registration parameters
    #[serde(default)]
    pub sentinel: SentinelConfig,
    /// Proxy pool assignments
    pub pools: BTreeMap<String, PoolSpec>,
}

impl KeeperConfig {
    /// Load configuration from YAML file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_yaml(&content)
    }

    /// Load configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Cluster layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster name
    #[serde(default = "default_cluster_name")]
    pub name: String,
    /// Shard name → ordered cache-server connection URLs
    pub shards: BTreeMap<String, Vec<String>>,
}

/// Sentinel registration parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentinelConfig {
    /// Agreement count Sentinel requires to declare a primary down
    #[serde(default = "default_monitor_quorum")]
    pub monitor_quorum: u32,
    /// Failure-detection timeout set on newly registered shards
    #[serde(default = "default_down_after_ms")]
    pub down_after_ms: u64,
    /// Snapshots that must structurally agree before the topology is
    /// trusted
    #[serde(default = "default_snapshot_quorum")]
    pub snapshot_quorum: usize,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            monitor_quorum: default_monitor_quorum(),
            down_after_ms: default_down_after_ms(),
            snapshot_quorum: default_snapshot_quorum(),
        }
    }
}

// Default value functions

fn default_cluster_name() -> String {
    "default".to_string()
}

fn default_monitor_quorum() -> u32 {
    2
}

fn default_down_after_ms() -> u64 {
    30000
}

fn default_snapshot_quorum() -> usize {
    2
}

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}
