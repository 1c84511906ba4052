//! Proxy server entry token
//!
//! The proxy's parser consumes each server entry as a single compact
//! token, `"<ip>:<port>:<priority> <logical_name>"`, not a structured
//! object. The text shape is an external compatibility contract and must
//! round-trip byte-for-byte.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::ProxyGenError;

/// One server entry in a proxy pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyServer {
    /// `ip:port`
    pub addr: String,
    pub priority: u32,
    /// Logical shard name this entry routes
    pub name: String,
}

impl ProxyServer {
    pub fn new(addr: impl Into<String>, priority: u32, name: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            priority,
            name: name.into(),
        }
    }
}

impl std::fmt::Display for ProxyServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{} {}", self.addr, self.priority, self.name)
    }
}

impl std::str::FromStr for ProxyServer {
    type Err = ProxyGenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ProxyGenError::InvalidServerToken(s.to_string());

        let (token, name) = s.split_once(' ').ok_or_else(invalid)?;
        if name.is_empty() || name.contains(' ') {
            return Err(invalid());
        }
        let (addr, priority) = token.rsplit_once(':').ok_or_else(invalid)?;
        // addr itself must still be ip:port
        if !addr.contains(':') {
            return Err(invalid());
        }
        let priority = priority.parse::<u32>().map_err(|_| invalid())?;

        Ok(Self {
            addr: addr.to_string(),
            priority,
            name: name.to_string(),
        })
    }
}

impl Serialize for ProxyServer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ProxyServer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
