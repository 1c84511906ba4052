//! Sharded cluster
//!
//! A named collection of shards, rebuilt fresh from a static server-list
//! configuration on every pass. Construction discovers every shard;
//! partial clusters are never returned.

use std::collections::BTreeMap;

use resp_client::{ClientFactory, ConnUrl};
use tracing::info;

use crate::error::TopologyError;
use crate::server::CacheServer;
use crate::shard::Shard;

/// A named collection of shards
pub struct ShardedCluster {
    name: String,
    shards: BTreeMap<String, Shard>,
}

impl std::fmt::Debug for ShardedCluster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShardedCluster")
            .field("name", &self.name)
            .field("shards", &self.shards.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ShardedCluster {
    /// Build the cluster from a shard → server-URL mapping and discover
    /// every shard
    ///
    /// Any shard's failure (bad connection string, transport error,
    /// violated single-primary invariant) fails the whole construction;
    /// callers retry on the next tick.
    pub async fn discover(
        name: impl Into<String>,
        spec: &BTreeMap<String, Vec<String>>,
        factory: &dyn ClientFactory,
    ) -> Result<Self, TopologyError> {
        let name = name.into();
        let mut shards = BTreeMap::new();

        for (shard_name, urls) in spec {
            let mut servers = Vec::with_capacity(urls.len());
            for (idx, url) in urls.iter().enumerate() {
                let parsed = ConnUrl::parse(url)
                    .map_err(|e| TopologyError::client(url.clone(), e))?;
                let client = factory
                    .open(url)
                    .await
                    .map_err(|e| TopologyError::client(parsed.addr(), e))?;
                let server_name = format!("{}-{}", shard_name, idx);
                servers.push(CacheServer::new(server_name, &parsed, client));
            }

            let mut shard = Shard::new(shard_name.clone(), servers);
            shard.discover().await?;
            shards.insert(shard_name.clone(), shard);
        }

        info!(cluster = %name, shards = shards.len(), "cluster discovered");
        Ok(Self { name, shards })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Shards in name order
    pub fn shards(&self) -> impl Iterator<Item = &Shard> {
        self.shards.values()
    }

    pub fn shard(&self, name: &str) -> Option<&Shard> {
        self.shards.get(name)
    }

    pub fn len(&self) -> usize {
        self.shards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.is_empty()
    }

    /// Shard name → primary address, for every shard
    pub fn master_addrs(&self) -> Result<BTreeMap<String, String>, TopologyError> {
        let mut addrs = BTreeMap::new();
        for shard in self.shards.values() {
            let (host, port) = shard.master_addr()?;
            addrs.insert(shard.name().to_string(), format!("{}:{}", host, port));
        }
        Ok(addrs)
    }
}
