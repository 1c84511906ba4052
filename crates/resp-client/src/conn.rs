//! TCP connection executing RESP commands
//!
//! One connection per server/agent, exclusively owned by the entity that
//! created it, released when the discovery pass drops it. No pooling, no
//! internal retries.

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tracing::debug;

use crate::client::{ClientError, ClientFactory, CommandClient, RoleInfo};
use crate::encoder::encode_command;
use crate::reader::ReplyReader;
use crate::records::{decode_role, MasterRecord, ReplicaRecord};
use crate::RespValue;

/// Parsed connection string: `redis://host:port`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnUrl {
    pub host: String,
    pub port: u16,
}

impl ConnUrl {
    /// Parse a `redis://host:port` connection string
    ///
    /// Malformed input fails here, before any network activity, so a bad
    /// entry aborts construction of the owning collection.
    pub fn parse(url: &str) -> Result<Self, ClientError> {
        let invalid = |reason: &str| ClientError::ConnectionString {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let rest = url
            .strip_prefix("redis://")
            .ok_or_else(|| invalid("expected redis:// scheme"))?;
        let (host, port) = rest
            .rsplit_once(':')
            .ok_or_else(|| invalid("expected host:port"))?;
        if host.is_empty() {
            return Err(invalid("empty host"));
        }
        let port = port
            .parse::<u16>()
            .map_err(|_| invalid("invalid port"))?;

        Ok(Self {
            host: host.to_string(),
            port,
        })
    }

    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for ConnUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "redis://{}:{}", self.host, self.port)
    }
}

/// A live RESP connection
///
/// `execute` writes one command and reads exactly one reply. An `-ERR`
/// reply surfaces as `ClientError::Server` with its text preserved
/// verbatim, which is what lets callers match Sentinel's unknown-master
/// reply exactly.
pub struct RespConnection {
    url: ConnUrl,
    reader: ReplyReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RespConnection {
    /// Connect to a server given its connection string
    pub async fn connect(url: &str) -> Result<Self, ClientError> {
        let url = ConnUrl::parse(url)?;
        let stream = TcpStream::connect((url.host.as_str(), url.port))
            .await
            .map_err(|e| ClientError::Transport(e.into()))?;
        let (read_half, write_half) = stream.into_split();
        debug!("connected to {}", url.addr());
        Ok(Self {
            url,
            reader: ReplyReader::new(read_half),
            writer: write_half,
        })
    }

    /// Execute one command and read its reply
    pub async fn execute(&mut self, args: &[&str]) -> Result<RespValue, ClientError> {
        self.writer
            .write_all(&encode_command(args))
            .await
            .map_err(|e| ClientError::Transport(e.into()))?;
        let reply = self.reader.read_reply().await?;
        match reply {
            RespValue::Error(text) => {
                Err(ClientError::Server(String::from_utf8_lossy(&text).into_owned()))
            }
            other => Ok(other),
        }
    }

    /// Shut down the connection
    ///
    /// Dropping the value has the same effect; `close` exists so callers
    /// can release at a definite point and observe shutdown errors.
    pub async fn close(mut self) -> Result<(), ClientError> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| ClientError::Transport(e.into()))?;
        debug!("closed connection to {}", self.url.addr());
        Ok(())
    }

    fn expect_ok(reply: RespValue) -> Result<(), ClientError> {
        match reply.as_str() {
            Some("OK") => Ok(()),
            _ => Err(ClientError::UnexpectedReply(format!(
                "expected +OK, got {:?}",
                reply
            ))),
        }
    }
}

#[async_trait]
impl CommandClient for RespConnection {
    async fn role(&mut self) -> Result<RoleInfo, ClientError> {
        let reply = self.execute(&["ROLE"]).await?;
        decode_role(&reply)
    }

    async fn config_get(&mut self, param: &str) -> Result<Option<String>, ClientError> {
        let reply = self.execute(&["CONFIG", "GET", param]).await?;
        let items = reply.as_array().ok_or_else(|| {
            ClientError::UnexpectedReply("CONFIG GET reply is not an array".to_string())
        })?;
        // Reply is [name, value]; an unknown parameter yields an empty array
        match items.get(1) {
            Some(value) => {
                let value = value.as_str().ok_or_else(|| {
                    ClientError::Decode(format!("non-string value for parameter '{}'", param))
                })?;
                Ok(Some(value.to_string()))
            }
            None => Ok(None),
        }
    }

    async fn config_set(&mut self, param: &str, value: &str) -> Result<(), ClientError> {
        let reply = self.execute(&["CONFIG", "SET", param, value]).await?;
        Self::expect_ok(reply)
    }

    async fn replicate_from(&mut self, target: Option<(&str, u16)>) -> Result<(), ClientError> {
        let reply = match target {
            Some((host, port)) => {
                let port = port.to_string();
                self.execute(&["SLAVEOF", host, &port]).await?
            }
            None => self.execute(&["SLAVEOF", "NO", "ONE"]).await?,
        };
        Self::expect_ok(reply)
    }

    async fn sentinel_master(&mut self, name: &str) -> Result<MasterRecord, ClientError> {
        let reply = self.execute(&["SENTINEL", "master", name]).await?;
        MasterRecord::from_reply(&reply)
    }

    async fn sentinel_masters(&mut self) -> Result<Vec<MasterRecord>, ClientError> {
        let reply = self.execute(&["SENTINEL", "masters"]).await?;
        let items = reply.as_array().ok_or_else(|| {
            ClientError::UnexpectedReply("SENTINEL masters reply is not an array".to_string())
        })?;
        items.iter().map(MasterRecord::from_reply).collect()
    }

    async fn sentinel_replicas(&mut self, name: &str) -> Result<Vec<ReplicaRecord>, ClientError> {
        let reply = self.execute(&["SENTINEL", "slaves", name]).await?;
        let items = reply.as_array().ok_or_else(|| {
            ClientError::UnexpectedReply("SENTINEL slaves reply is not an array".to_string())
        })?;
        items.iter().map(ReplicaRecord::from_reply).collect()
    }

    async fn sentinel_monitor(
        &mut self,
        name: &str,
        ip: &str,
        port: u16,
        quorum: u32,
    ) -> Result<(), ClientError> {
        let port = port.to_string();
        let quorum = quorum.to_string();
        let reply = self
            .execute(&["SENTINEL", "monitor", name, ip, &port, &quorum])
            .await?;
        Self::expect_ok(reply)
    }

    async fn sentinel_set(
        &mut self,
        name: &str,
        param: &str,
        value: &str,
    ) -> Result<(), ClientError> {
        let reply = self.execute(&["SENTINEL", "set", name, param, value]).await?;
        Self::expect_ok(reply)
    }

    async fn subscribe(&mut self, channel: &str) -> Result<(), ClientError> {
        let reply = self.execute(&["SUBSCRIBE", channel]).await?;
        match reply.as_array() {
            Some(items) if items.first().and_then(RespValue::as_str) == Some("subscribe") => Ok(()),
            _ => Err(ClientError::UnexpectedReply(format!(
                "expected subscribe confirmation, got {:?}",
                reply
            ))),
        }
    }
}

/// Factory producing live RESP connections
pub struct RespFactory;

#[async_trait]
impl ClientFactory for RespFactory {
    async fn open(&self, url: &str) -> Result<Box<dyn CommandClient>, ClientError> {
        Ok(Box::new(RespConnection::connect(url).await?))
    }
}
