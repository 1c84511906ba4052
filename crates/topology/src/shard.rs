//! Shard
//!
//! An ordered set of cache servers expected to replicate from a single
//! primary. Discovery enforces the single-primary invariant; every
//! downstream operation (bootstrap, Sentinel registration, address
//! resolution) depends on it.

use tracing::{info, warn};

use crate::error::TopologyError;
use crate::server::{CacheServer, Role};

/// Replication target freshly provisioned servers are configured with
/// before a shard is bootstrapped
pub const PLACEHOLDER_MASTER: (&str, u16) = ("127.0.0.1", 6379);

/// A set of cache servers holding one logical slice of data
pub struct Shard {
    name: String,
    servers: Vec<CacheServer>,
}

impl Shard {
    pub fn new(name: impl Into<String>, servers: Vec<CacheServer>) -> Self {
        Self {
            name: name.into(),
            servers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn servers(&self) -> &[CacheServer] {
        &self.servers
    }

    /// Discover every member's role, then enforce the single-primary
    /// invariant
    ///
    /// Exactly one primary is the only valid outcome: zero is `NoPrimary`,
    /// more than one is `SplitBrain`. Both are fatal to the discovery call
    /// and no master address may be derived from the shard afterwards.
    pub async fn discover(&mut self) -> Result<(), TopologyError> {
        for server in &mut self.servers {
            server.discover().await?;
        }

        match self.primary_count() {
            1 => Ok(()),
            0 => Err(TopologyError::NoPrimary {
                shard: self.name.clone(),
            }),
            primaries => Err(TopologyError::SplitBrain {
                shard: self.name.clone(),
                primaries,
            }),
        }
    }

    fn primary_count(&self) -> usize {
        self.servers
            .iter()
            .filter(|s| s.role() == Role::Primary)
            .count()
    }

    /// Address of the shard's primary
    ///
    /// Only answers after a discovery pass established exactly one
    /// primary.
    pub fn master_addr(&self) -> Result<(String, u16), TopologyError> {
        if self.primary_count() != 1 {
            return Err(TopologyError::NoPrimary {
                shard: self.name.clone(),
            });
        }
        let primary = self
            .servers
            .iter()
            .find(|s| s.role() == Role::Primary)
            .ok_or_else(|| TopologyError::NoPrimary {
                shard: self.name.clone(),
            })?;
        Ok((primary.host().to_string(), primary.port()))
    }

    /// Bootstrap a freshly created shard into a primary/replica topology
    ///
    /// Expects every member to still replicate from the placeholder
    /// loopback address. The member at `master_index` is promoted; members
    /// still pointing at the placeholder are repointed at it; members
    /// already pointing elsewhere are left untouched with their observed
    /// role recorded. Idempotent: against an already-bootstrapped shard no
    /// commands are issued.
    pub async fn init(&mut self, master_index: usize) -> Result<(), TopologyError> {
        if master_index >= self.servers.len() {
            return Err(TopologyError::NoPrimary {
                shard: self.name.clone(),
            });
        }

        for server in &mut self.servers {
            server.discover().await?;
        }

        let master_host = self.servers[master_index].host().to_string();
        let master_port = self.servers[master_index].port();

        if self.servers[master_index].role() != Role::Primary {
            info!(
                shard = %self.name,
                server = %self.servers[master_index].name(),
                "promoting to primary"
            );
            self.servers[master_index].replicate_from(None).await?;
        }

        for (idx, server) in self.servers.iter_mut().enumerate() {
            if idx == master_index {
                continue;
            }
            match server.replicating_from() {
                Some((host, port))
                    if host == PLACEHOLDER_MASTER.0 && *port == PLACEHOLDER_MASTER.1 =>
                {
                    info!(
                        shard = %self.name,
                        server = %server.name(),
                        master = %format!("{}:{}", master_host, master_port),
                        "attaching replica"
                    );
                    server
                        .replicate_from(Some((master_host.as_str(), master_port)))
                        .await?;
                }
                Some((host, port)) if *host == master_host && *port == master_port => {
                    // Already attached to the chosen primary
                }
                other => {
                    // Already configured elsewhere; record what we observed
                    warn!(
                        shard = %self.name,
                        server = %server.name(),
                        role = %server.role(),
                        replicating_from = ?other,
                        "leaving member untouched during init"
                    );
                }
            }
        }

        Ok(())
    }
}

impl std::fmt::Debug for Shard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shard")
            .field("name", &self.name)
            .field("servers", &self.servers)
            .finish()
    }
}
