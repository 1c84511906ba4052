//! Cache server
//!
//! One addressable Redis server, wrapping an exclusively owned client
//! handle. Role and read-only state are discovery outputs, only ever set
//! by a live query.

use resp_client::{CommandClient, ConnUrl, RoleInfo};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TopologyError;

/// Replication role of a cache server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Primary,
    Replica,
    /// Not yet discovered, or the last discovery failed
    Unknown,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Primary => write!(f, "primary"),
            Role::Replica => write!(f, "replica"),
            Role::Unknown => write!(f, "unknown"),
        }
    }
}

/// One addressable cache server
pub struct CacheServer {
    name: String,
    host: String,
    port: u16,
    role: Role,
    read_only: bool,
    replicating_from: Option<(String, u16)>,
    client: Box<dyn CommandClient>,
}

impl CacheServer {
    /// Wrap a connected client for the server at `url`
    pub fn new(name: impl Into<String>, url: &ConnUrl, client: Box<dyn CommandClient>) -> Self {
        Self {
            name: name.into(),
            host: url.host.clone(),
            port: url.port,
            role: Role::Unknown,
            read_only: false,
            replicating_from: None,
            client,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Role observed by the last successful discovery
    pub fn role(&self) -> Role {
        self.role
    }

    /// Read-only flag observed by the last successful discovery; only
    /// meaningful for replicas
    pub fn read_only(&self) -> bool {
        self.read_only
    }

    /// Replication target observed by the last successful discovery
    pub fn replicating_from(&self) -> Option<&(String, u16)> {
        self.replicating_from.as_ref()
    }

    /// Query the live server for its role; replicas additionally report
    /// whether they are read-only
    ///
    /// Results are committed only after every query succeeds. On error the
    /// previous values remain and must be treated as untrustworthy.
    pub async fn discover(&mut self) -> Result<(), TopologyError> {
        let role = self
            .client
            .role()
            .await
            .map_err(|e| TopologyError::client(self.addr(), e))?;

        let (role, replicating_from, read_only) = match role {
            RoleInfo::Primary => (Role::Primary, None, false),
            RoleInfo::Replica {
                master_host,
                master_port,
            } => {
                let value = self
                    .client
                    .config_get("slave-read-only")
                    .await
                    .map_err(|e| TopologyError::client(self.addr(), e))?;
                let read_only = value.as_deref() == Some("yes");
                (Role::Replica, Some((master_host, master_port)), read_only)
            }
        };

        self.role = role;
        self.replicating_from = replicating_from;
        self.read_only = read_only;
        debug!(server = %self.name, addr = %self.addr(), role = %self.role, "discovered role");
        Ok(())
    }

    /// Point this server's replication at `target`, or promote it with
    /// `SLAVEOF NO ONE` when `target` is `None`
    pub async fn replicate_from(&mut self, target: Option<(&str, u16)>) -> Result<(), TopologyError> {
        self.client
            .replicate_from(target)
            .await
            .map_err(|e| TopologyError::client(self.addr(), e))
    }
}

impl std::fmt::Debug for CacheServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheServer")
            .field("name", &self.name)
            .field("addr", &self.addr())
            .field("role", &self.role)
            .field("read_only", &self.read_only)
            .finish()
    }
}
