//! redkeeper - one-shot reconcile pass
//!
//! Each invocation re-observes the live cluster from scratch: discover
//! shard roles, register unwatched shards with every Sentinel,
//! quorum-reconcile the Sentinels' topology views, and synthesize the
//! sharding proxy's configuration document. Nothing is persisted between
//! passes; the surrounding orchestration decides when to run the next one
//! and what to do with the artifact.

pub mod config;

pub use config::{ConfigError, KeeperConfig};

use resp_client::{ClientFactory, RespFactory};
use topology::{MonitorParams, SentinelPool, ShardedCluster, SnapshotOptions};
use tracing::{info, warn};

/// Run one discovery/reconcile/synthesis pass and return the proxy
/// configuration document
pub async fn run_pass(config: &KeeperConfig) -> anyhow::Result<serde_json::Value> {
    let factory = RespFactory;
    run_pass_with(config, &factory).await
}

/// `run_pass` with an injectable client factory
pub async fn run_pass_with(
    config: &KeeperConfig,
    factory: &dyn ClientFactory,
) -> anyhow::Result<serde_json::Value> {
    info!(
        cluster = %config.cluster.name,
        shards = config.cluster.shards.len(),
        sentinels = config.sentinels.len(),
        "starting reconcile pass"
    );

    // Discovery validates the single-primary invariant per shard; any
    // shard failure aborts the pass.
    let cluster =
        ShardedCluster::discover(&config.cluster.name, &config.cluster.shards, factory).await?;

    let mut pool = SentinelPool::connect(&config.sentinels, factory).await?;

    let params = MonitorParams {
        quorum: config.sentinel.monitor_quorum,
        down_after_ms: config.sentinel.down_after_ms,
    };
    let registration = pool.monitor(&cluster, params).await;
    for (sentinel, shards) in &registration.changed {
        info!(sentinel = %sentinel, shards = ?shards, "registered shards");
    }
    if let Some(error) = registration.error {
        // Partial registration is safe (idempotent per member), but a
        // failing member means the pass cannot be trusted to completion.
        return Err(error.into());
    }

    // Synthesis only needs each shard's primary; skip replica resolution
    // and the costly per-server config reads.
    let options = SnapshotOptions {
        only_primary: true,
        ..SnapshotOptions::default()
    };
    let snapshot = pool
        .snapshot(config.sentinel.snapshot_quorum, factory, options)
        .await?;

    let agreed = snapshot.master_addrs();
    let discovered = cluster.master_addrs()?;
    if agreed != discovered {
        // Both answers are internally consistent; the Sentinels' quorum
        // view wins, but the divergence is worth surfacing.
        warn!(
            ?discovered,
            ?agreed,
            "sentinel quorum view differs from direct discovery"
        );
    }

    let document = proxygen::render(&config.pools, &agreed)?;
    info!(pools = config.pools.len() + 1, "proxy configuration synthesized");
    Ok(document)
}
