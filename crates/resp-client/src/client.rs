//! Typed command interface
//!
//! `CommandClient` is the single seam between the topology layer and the
//! wire: every remote primitive this system needs on a cache server or a
//! Sentinel is one method here, so tests swap the whole transport for a
//! scripted fake.

use async_trait::async_trait;

use crate::records::{MasterRecord, ReplicaRecord};
use crate::RespError;

/// Sentinel reply text meaning "this master name is not registered"
///
/// Matched verbatim: it is the signal that a shard still needs a
/// `SENTINEL MONITOR` call, and must not be confused with transport-level
/// failures.
pub const UNKNOWN_MASTER: &str = "ERR No such master with that name";

/// Client error
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Invalid connection string '{url}': {reason}")]
    ConnectionString { url: String, reason: String },
    #[error("Transport error: {0}")]
    Transport(#[from] RespError),
    #[error("Server error: {0}")]
    Server(String),
    #[error("Decode error: {0}")]
    Decode(String),
    #[error("Unexpected reply: {0}")]
    UnexpectedReply(String),
}

impl ClientError {
    /// Whether this is the Sentinel "unknown master" reply
    pub fn is_unknown_master(&self) -> bool {
        matches!(self, ClientError::Server(msg) if msg == UNKNOWN_MASTER)
    }
}

/// Role reported by a cache server's `ROLE` command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoleInfo {
    /// The server is a primary
    Primary,
    /// The server replicates from `master_host:master_port`
    Replica {
        master_host: String,
        master_port: u16,
    },
}

/// The remote command set this system relies on
///
/// Cache-server methods come first, Sentinel administrative methods after.
/// Calls are never retried or masked here; every failure surfaces to the
/// caller.
#[async_trait]
pub trait CommandClient: Send {
    /// `ROLE`
    async fn role(&mut self) -> Result<RoleInfo, ClientError>;

    /// `CONFIG GET <param>`; `None` when the server does not know the
    /// parameter
    async fn config_get(&mut self, param: &str) -> Result<Option<String>, ClientError>;

    /// `CONFIG SET <param> <value>`
    async fn config_set(&mut self, param: &str, value: &str) -> Result<(), ClientError>;

    /// `SLAVEOF <host> <port>`, or `SLAVEOF NO ONE` when `target` is `None`
    async fn replicate_from(&mut self, target: Option<(&str, u16)>) -> Result<(), ClientError>;

    /// `SENTINEL master <name>`
    async fn sentinel_master(&mut self, name: &str) -> Result<MasterRecord, ClientError>;

    /// `SENTINEL masters`
    async fn sentinel_masters(&mut self) -> Result<Vec<MasterRecord>, ClientError>;

    /// `SENTINEL slaves <name>`
    async fn sentinel_replicas(&mut self, name: &str) -> Result<Vec<ReplicaRecord>, ClientError>;

    /// `SENTINEL monitor <name> <ip> <port> <quorum>`
    async fn sentinel_monitor(
        &mut self,
        name: &str,
        ip: &str,
        port: u16,
        quorum: u32,
    ) -> Result<(), ClientError>;

    /// `SENTINEL set <name> <param> <value>`
    async fn sentinel_set(
        &mut self,
        name: &str,
        param: &str,
        value: &str,
    ) -> Result<(), ClientError>;

    /// `SUBSCRIBE <channel>` (change notifications, e.g. `+switch-master`)
    async fn subscribe(&mut self, channel: &str) -> Result<(), ClientError>;
}

/// Opens client connections from connection strings
///
/// The topology layer never names a concrete transport; it asks a factory
/// for a boxed client per server/agent, which keeps discovery passes
/// independent and trivially fakeable.
#[async_trait]
pub trait ClientFactory: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn CommandClient>, ClientError>;
}
