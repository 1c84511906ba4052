//! Monitoring agent (Sentinel)
//!
//! Wraps one Sentinel instance behind the client seam. Stateless: no
//! topology is cached, every query reaches the live agent.

use resp_client::{ClientFactory, CommandClient, ConnUrl};
use tracing::{debug, info};

use crate::cluster::ShardedCluster;
use crate::error::TopologyError;
use crate::server::Role;
use crate::snapshot::{ServerView, ShardView, TopologySnapshot};

/// Registration parameters applied when a shard is first watched
#[derive(Debug, Clone, Copy)]
pub struct MonitorParams {
    /// Sentinel agreement count required to declare a primary down
    pub quorum: u32,
    /// Failure-detection timeout handed to `SENTINEL SET`
    pub down_after_ms: u64,
}

/// Options controlling what a topology snapshot resolves
///
/// The two `with_*` flags independently gate opening a direct connection
/// to each resolved server; those connections materially increase call
/// cost and are only opened when the data is actually required
/// downstream.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotOptions {
    /// Resolve only each shard's primary, skipping replica enumeration
    pub only_primary: bool,
    /// Read the `slave-read-only` parameter from each resolved server
    pub with_read_only: bool,
    /// Read the `appendonly` persistence parameter from each resolved
    /// server
    pub with_persistence: bool,
}

impl SnapshotOptions {
    fn needs_direct_connection(&self) -> bool {
        self.with_read_only || self.with_persistence
    }
}

/// Result of one registration sweep
///
/// `changed` lists the shards newly registered during this call; it is
/// retained even when a later shard in the same sweep failed, because
/// registration is idempotent and partial progress is safe.
#[derive(Debug, Default)]
pub struct MonitorOutcome {
    pub changed: Vec<String>,
    pub error: Option<TopologyError>,
}

/// One Sentinel instance
pub struct Sentinel {
    name: String,
    host: String,
    port: u16,
    client: Box<dyn CommandClient>,
}

impl Sentinel {
    /// Wrap a connected client for the Sentinel at `url`
    pub fn new(name: impl Into<String>, url: &ConnUrl, client: Box<dyn CommandClient>) -> Self {
        Self {
            name: name.into(),
            host: url.host.clone(),
            port: url.port,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether this Sentinel currently watches every one of `names`
    ///
    /// An empty watch list is always false, never vacuously true.
    pub async fn is_monitoring_shards(&mut self, names: &[&str]) -> Result<bool, TopologyError> {
        let masters = self
            .client
            .sentinel_masters()
            .await
            .map_err(|e| TopologyError::client(self.addr(), e))?;
        if masters.is_empty() {
            return Ok(false);
        }
        Ok(names
            .iter()
            .all(|name| masters.iter().any(|m| m.name == *name)))
    }

    /// Register every shard of `cluster` this Sentinel does not yet watch
    ///
    /// A shard is unwatched exactly when `SENTINEL master` returns the
    /// verbatim unknown-master error; any other error aborts the sweep.
    /// Registration resolves the primary from the already-validated shard,
    /// issues the watch command with the target quorum, then sets the
    /// failure-detection timeout.
    pub async fn monitor(&mut self, cluster: &ShardedCluster, params: MonitorParams) -> MonitorOutcome {
        let mut outcome = MonitorOutcome::default();

        for shard in cluster.shards() {
            match self.client.sentinel_master(shard.name()).await {
                Ok(_) => {
                    debug!(sentinel = %self.name, shard = %shard.name(), "already watched");
                }
                Err(e) if e.is_unknown_master() => {
                    let (ip, port) = match shard.master_addr() {
                        Ok(addr) => addr,
                        Err(e) => {
                            outcome.error = Some(e);
                            return outcome;
                        }
                    };
                    if let Err(e) = self
                        .client
                        .sentinel_monitor(shard.name(), &ip, port, params.quorum)
                        .await
                    {
                        outcome.error = Some(TopologyError::client(self.addr(), e));
                        return outcome;
                    }
                    if let Err(e) = self
                        .client
                        .sentinel_set(
                            shard.name(),
                            "down-after-milliseconds",
                            &params.down_after_ms.to_string(),
                        )
                        .await
                    {
                        outcome.error = Some(TopologyError::client(self.addr(), e));
                        return outcome;
                    }
                    info!(
                        sentinel = %self.name,
                        shard = %shard.name(),
                        master = %format!("{}:{}", ip, port),
                        "registered shard"
                    );
                    outcome.changed.push(shard.name().to_string());
                }
                Err(e) => {
                    outcome.error = Some(TopologyError::client(self.addr(), e));
                    return outcome;
                }
            }
        }

        outcome
    }

    /// Collect this Sentinel's view of the full topology
    ///
    /// A primary flagged both subjectively and objectively down fails the
    /// snapshot rather than being reported as a usable address. Replicas
    /// flagged down are skipped individually.
    pub async fn snapshot(
        &mut self,
        factory: &dyn ClientFactory,
        options: SnapshotOptions,
    ) -> Result<TopologySnapshot, TopologyError> {
        let masters = self
            .client
            .sentinel_masters()
            .await
            .map_err(|e| TopologyError::client(self.addr(), e))?;

        let mut shards = Vec::with_capacity(masters.len());
        for master in masters {
            if master.subjectively_down() && master.objectively_down() {
                return Err(TopologyError::UnreachableMaster {
                    addr: master.addr(),
                    shard: master.name,
                    sentinel: self.name.clone(),
                });
            }

            let mut servers = Vec::new();
            let mut view = ServerView::new(Role::Primary);
            if options.needs_direct_connection() {
                view.config = self.read_config(factory, &master.addr(), options).await?;
            }
            servers.push((master.addr(), view));

            if !options.only_primary {
                let replicas = self
                    .client
                    .sentinel_replicas(&master.name)
                    .await
                    .map_err(|e| TopologyError::client(self.addr(), e))?;
                for replica in replicas {
                    if replica.is_down() {
                        debug!(
                            sentinel = %self.name,
                            shard = %master.name,
                            replica = %replica.addr(),
                            "skipping down replica"
                        );
                        continue;
                    }
                    let mut view = ServerView::new(Role::Replica);
                    if options.needs_direct_connection() {
                        view.config = self.read_config(factory, &replica.addr(), options).await?;
                    }
                    servers.push((replica.addr(), view));
                }
            }

            shards.push(ShardView {
                name: master.name,
                servers,
            });
        }

        Ok(TopologySnapshot { shards })
    }

    /// Open a direct connection to `addr` and read the requested
    /// parameters; the connection is dropped as soon as the reads finish
    async fn read_config(
        &self,
        factory: &dyn ClientFactory,
        addr: &str,
        options: SnapshotOptions,
    ) -> Result<std::collections::BTreeMap<String, String>, TopologyError> {
        let url = format!("redis://{}", addr);
        let mut client = factory
            .open(&url)
            .await
            .map_err(|e| TopologyError::client(addr, e))?;

        let mut config = std::collections::BTreeMap::new();
        if options.with_read_only {
            if let Some(value) = client
                .config_get("slave-read-only")
                .await
                .map_err(|e| TopologyError::client(addr, e))?
            {
                config.insert("slave-read-only".to_string(), value);
            }
        }
        if options.with_persistence {
            if let Some(value) = client
                .config_get("appendonly")
                .await
                .map_err(|e| TopologyError::client(addr, e))?
            {
                config.insert("appendonly".to_string(), value);
            }
        }
        Ok(config)
    }

    /// Subscribe to a Sentinel notification channel (e.g.
    /// `+switch-master`)
    ///
    /// Available to callers that want event-driven updates; the reconcile
    /// pass itself never requires it.
    pub async fn subscribe(&mut self, channel: &str) -> Result<(), TopologyError> {
        self.client
            .subscribe(channel)
            .await
            .map_err(|e| TopologyError::client(self.addr(), e))
    }
}

impl std::fmt::Debug for Sentinel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sentinel")
            .field("name", &self.name)
            .field("addr", &self.addr())
            .finish()
    }
}
