//! Pool document assembly

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::server::ProxyServer;
use crate::{
    ProxyGenError, AUTO_EJECT_HOSTS, DISTRIBUTION, HASH, HASH_TAG, HEALTH_LISTEN, HEALTH_SERVER,
    SERVER_FAILURE_LIMIT,
};

/// Static description of one proxy server pool
///
/// `shards` assigns each physical shard an ordered list of logical shard
/// names; a pool may multiplex several logical names onto one physical
/// shard, which lets shards be consolidated without churning the proxy
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSpec {
    /// Bind address of the pool's listener
    pub listen: String,
    /// Server connect/response timeout in milliseconds
    pub timeout_ms: u64,
    /// Listen backlog
    pub backlog: u32,
    /// Connect to all servers at startup
    #[serde(default)]
    pub preconnect: bool,
    /// Physical shard → logical shard names
    pub shards: BTreeMap<String, Vec<String>>,
}

/// The serialized shape of one real pool; field order is part of the
/// external contract
#[derive(Serialize)]
struct PoolDocument<'a> {
    listen: &'a str,
    hash: &'a str,
    hash_tag: &'a str,
    distribution: &'a str,
    timeout: u64,
    backlog: u32,
    preconnect: bool,
    redis: bool,
    auto_eject_hosts: bool,
    server_failure_limit: u32,
    servers: Vec<ProxyServer>,
}

/// The serialized shape of the fixed liveness pool
#[derive(Serialize)]
struct HealthDocument<'a> {
    listen: &'a str,
    redis: bool,
    servers: [&'a str; 1],
}

/// Synthesize the proxy configuration document
///
/// `masters` maps each physical shard to its currently discovered primary
/// address. Every logical shard name resolves to the primary of its
/// assigned physical shard, at priority 1. The fixed `health` pool is
/// always appended last, independent of the real topology; it exists
/// purely so the proxy process itself can be liveness-probed.
pub fn render(
    pools: &BTreeMap<String, PoolSpec>,
    masters: &BTreeMap<String, String>,
) -> Result<Value, ProxyGenError> {
    let mut document = Map::new();

    for (pool_name, spec) in pools {
        let mut servers = Vec::new();
        for (shard, logical_names) in &spec.shards {
            let addr = masters
                .get(shard)
                .ok_or_else(|| ProxyGenError::UnknownShard {
                    pool: pool_name.clone(),
                    shard: shard.clone(),
                })?;
            for logical in logical_names {
                servers.push(ProxyServer::new(addr.clone(), 1, logical.clone()));
            }
        }
        debug!(pool = %pool_name, servers = servers.len(), "assembled pool");

        let pool = PoolDocument {
            listen: &spec.listen,
            hash: HASH,
            hash_tag: HASH_TAG,
            distribution: DISTRIBUTION,
            timeout: spec.timeout_ms,
            backlog: spec.backlog,
            preconnect: spec.preconnect,
            redis: true,
            auto_eject_hosts: AUTO_EJECT_HOSTS,
            server_failure_limit: SERVER_FAILURE_LIMIT,
            servers,
        };
        document.insert(pool_name.clone(), serde_json::to_value(&pool)?);
    }

    let health = HealthDocument {
        listen: HEALTH_LISTEN,
        redis: true,
        servers: [HEALTH_SERVER],
    };
    document.insert("health".to_string(), serde_json::to_value(&health)?);

    Ok(Value::Object(document))
}
