//! Sharding-proxy configuration synthesis
//!
//! Consumes a trusted topology (shard name → discovered primary address)
//! and a static pool layout, and emits the configuration document the
//! sharding proxy consumes. Hash function, hash-tag delimiter,
//! distribution algorithm, protocol mode, and host auto-ejection are
//! invariants of the deployed topology: changing any of them would
//! silently reroute keys for already-cached data, so they are module
//! constants, not configuration.

mod pool;
mod server;

pub use pool::{render, PoolSpec};
pub use server::ProxyServer;

/// Consistent-hash function applied to keys
pub const HASH: &str = "fnv1a_64";
/// Hash-tag delimiter pair
pub const HASH_TAG: &str = "{}";
/// Key distribution algorithm
pub const DISTRIBUTION: &str = "ketama";
/// Failed hosts are never auto-ejected; doing so would reshuffle the ring
pub const AUTO_EJECT_HOSTS: bool = false;
/// Failure count before ejection; irrelevant with ejection disabled
pub const SERVER_FAILURE_LIMIT: u32 = 0;

/// Listen address of the fixed liveness pool
pub const HEALTH_LISTEN: &str = "127.0.0.1:22333";
/// Placeholder server entry of the liveness pool
pub const HEALTH_SERVER: &str = "127.0.0.1:6379:1 dummy";

/// Proxy configuration synthesis error
#[derive(Debug, thiserror::Error)]
pub enum ProxyGenError {
    #[error("invalid server token '{0}'")]
    InvalidServerToken(String),

    /// A pool assignment references a physical shard the topology does
    /// not contain
    #[error("pool {pool} references unknown shard {shard}")]
    UnknownShard { pool: String, shard: String },

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}
