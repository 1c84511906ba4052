//! Topology snapshots
//!
//! One snapshot is produced per Sentinel query. Snapshots from different
//! Sentinels may list shards and servers in different orders while
//! describing the same topology, so comparison happens only after
//! canonicalization (stable sort by shard name and server address).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::server::Role;

/// What one Sentinel reported about one server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerView {
    pub role: Role,
    /// Extra configuration parameters read directly from the server, when
    /// requested (`slave-read-only`, `appendonly`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub config: BTreeMap<String, String>,
}

impl ServerView {
    pub fn new(role: Role) -> Self {
        Self {
            role,
            config: BTreeMap::new(),
        }
    }
}

/// What one Sentinel reported about one shard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardView {
    pub name: String,
    /// (address, view) per server; the primary is always present
    pub servers: Vec<(String, ServerView)>,
}

impl ShardView {
    /// Address of the server reported as primary
    pub fn master_addr(&self) -> Option<&str> {
        self.servers
            .iter()
            .find(|(_, view)| view.role == Role::Primary)
            .map(|(addr, _)| addr.as_str())
    }
}

/// Full cluster topology as observed by one Sentinel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopologySnapshot {
    pub shards: Vec<ShardView>,
}

impl TopologySnapshot {
    /// Stable-sort shards by name and servers by address
    ///
    /// Two snapshots describing the same topology compare equal after
    /// this, regardless of the order the Sentinel listed entries in.
    pub fn canonicalize(&mut self) {
        for shard in &mut self.shards {
            shard.servers.sort_by(|a, b| a.0.cmp(&b.0));
        }
        self.shards.sort_by(|a, b| a.name.cmp(&b.name));
    }

    /// Shard name → primary address
    pub fn master_addrs(&self) -> BTreeMap<String, String> {
        self.shards
            .iter()
            .filter_map(|shard| {
                shard
                    .master_addr()
                    .map(|addr| (shard.name.clone(), addr.to_string()))
            })
            .collect()
    }
}
