//! Sentinel pool and quorum reconciliation
//!
//! A set of Sentinel replicas watching the same logical cluster. The pool
//! drives per-member registration (fail-fast: a write path) and collects
//! per-member topology snapshots (fail-soft: a read path), then trusts a
//! snapshot only once enough members structurally agree on it.

use std::collections::BTreeMap;

use resp_client::{ClientFactory, ConnUrl};
use tracing::{info, warn};

use crate::cluster::ShardedCluster;
use crate::error::TopologyError;
use crate::sentinel::{MonitorParams, Sentinel, SnapshotOptions};
use crate::snapshot::TopologySnapshot;

/// Result of a pool-wide registration sweep
///
/// `changed` maps each processed member's name to the shards it newly
/// registered. The sweep stops at the first member error, but results
/// from members processed before the failure are kept; registration is
/// idempotent per member, so partial application across members is always
/// safe.
#[derive(Debug, Default)]
pub struct PoolMonitorOutcome {
    pub changed: BTreeMap<String, Vec<String>>,
    pub error: Option<TopologyError>,
}

/// An ordered set of Sentinel replicas watching one cluster
pub struct SentinelPool {
    sentinels: Vec<Sentinel>,
}

impl SentinelPool {
    pub fn new(sentinels: Vec<Sentinel>) -> Self {
        Self { sentinels }
    }

    /// Connect to every Sentinel URL
    ///
    /// Any malformed URL or failed connection aborts pool construction.
    pub async fn connect(
        urls: &[String],
        factory: &dyn ClientFactory,
    ) -> Result<Self, TopologyError> {
        let mut sentinels = Vec::with_capacity(urls.len());
        for (idx, url) in urls.iter().enumerate() {
            let parsed = ConnUrl::parse(url)
                .map_err(|e| TopologyError::client(url.clone(), e))?;
            let client = factory
                .open(url)
                .await
                .map_err(|e| TopologyError::client(parsed.addr(), e))?;
            sentinels.push(Sentinel::new(format!("sentinel-{}", idx), &parsed, client));
        }
        Ok(Self { sentinels })
    }

    pub fn len(&self) -> usize {
        self.sentinels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentinels.is_empty()
    }

    /// Run the registration sweep on every member in turn
    pub async fn monitor(
        &mut self,
        cluster: &ShardedCluster,
        params: MonitorParams,
    ) -> PoolMonitorOutcome {
        let mut outcome = PoolMonitorOutcome::default();

        for sentinel in &mut self.sentinels {
            let member = sentinel.monitor(cluster, params).await;
            if !member.changed.is_empty() {
                outcome
                    .changed
                    .insert(sentinel.name().to_string(), member.changed);
            }
            if let Some(error) = member.error {
                outcome.error = Some(error);
                return outcome;
            }
        }

        outcome
    }

    /// Collect every member's topology snapshot and reconcile them by
    /// quorum vote
    ///
    /// A member that errors is skipped, not fatal: a degraded pool may
    /// still answer as long as `quorum` members structurally agree.
    pub async fn snapshot(
        &mut self,
        quorum: usize,
        factory: &dyn ClientFactory,
        options: SnapshotOptions,
    ) -> Result<TopologySnapshot, TopologyError> {
        let mut snapshots = Vec::with_capacity(self.sentinels.len());

        for sentinel in &mut self.sentinels {
            match sentinel.snapshot(factory, options).await {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => {
                    warn!(
                        sentinel = %sentinel.name(),
                        error = %e,
                        "skipping sentinel during snapshot collection"
                    );
                }
            }
        }

        let responses = snapshots.len();
        let agreed = apply_quorum(snapshots, quorum)?;
        info!(
            responses,
            quorum,
            shards = agreed.shards.len(),
            "topology agreed by quorum"
        );
        Ok(agreed)
    }
}

/// Accept the first snapshot that enough of the collected snapshots
/// structurally agree with
///
/// Each snapshot is canonicalized first, so unordered-but-equal
/// topologies count as agreeing. If no snapshot reaches `quorum`, the
/// vote fails; callers must not fabricate an answer by falling back to a
/// majority or the first response — they retry on the next tick.
pub fn apply_quorum(
    mut snapshots: Vec<TopologySnapshot>,
    quorum: usize,
) -> Result<TopologySnapshot, TopologyError> {
    for snapshot in &mut snapshots {
        snapshot.canonicalize();
    }

    for idx in 0..snapshots.len() {
        let agreeing = snapshots
            .iter()
            .filter(|other| **other == snapshots[idx])
            .count();
        if agreeing >= quorum {
            return Ok(snapshots.swap_remove(idx));
        }
    }

    Err(TopologyError::NoQuorum {
        required: quorum,
        responses: snapshots.len(),
    })
}
