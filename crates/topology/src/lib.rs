//! Shard discovery, Sentinel registration, and quorum reconciliation
//!
//! Everything here is ephemeral: servers, shards, clusters, and pools are
//! created, populated, and discarded within one discovery/reconcile pass.
//! Client handles are exclusively owned by the entity that created them
//! and released when the pass's values drop.
//!
//! Failure-tolerance policies differ by path and deliberately so:
//! shard discovery and per-Sentinel registration are fail-fast (write
//! safety), pool-wide snapshot collection is fail-soft (read
//! availability).

pub mod cluster;
pub mod error;
pub mod pool;
pub mod sentinel;
pub mod server;
pub mod shard;
pub mod snapshot;

pub use cluster::ShardedCluster;
pub use error::TopologyError;
pub use pool::{apply_quorum, PoolMonitorOutcome, SentinelPool};
pub use sentinel::{MonitorOutcome, MonitorParams, Sentinel, SnapshotOptions};
pub use server::{CacheServer, Role};
pub use shard::{Shard, PLACEHOLDER_MASTER};
pub use snapshot::{ServerView, ShardView, TopologySnapshot};
