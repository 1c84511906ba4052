//! Topology error taxonomy
//!
//! Two failure families live here and must stay distinguishable in logs:
//! transient failures (`Client`) that the next reconcile tick may clear,
//! and structural failures (`NoPrimary`, `SplitBrain`, `NoQuorum`) that
//! mean the cluster itself needs investigation.

use resp_client::ClientError;

/// Topology error
#[derive(Debug, thiserror::Error)]
pub enum TopologyError {
    /// A remote call against `target` failed (connection string, transport,
    /// or decode); never retried here
    #[error("client error on {target}: {source}")]
    Client {
        target: String,
        #[source]
        source: ClientError,
    },

    /// Discovery found no primary in the shard
    #[error("shard {shard} has no primary")]
    NoPrimary { shard: String },

    /// Discovery found more than one primary in the shard
    #[error("shard {shard} is split-brained: {primaries} servers claim primary")]
    SplitBrain { shard: String, primaries: usize },

    /// A Sentinel reports the shard's primary as both subjectively and
    /// objectively down; its address must not be reported as usable
    #[error("shard {shard}: primary {addr} is flagged down by sentinel {sentinel}")]
    UnreachableMaster {
        shard: String,
        addr: String,
        sentinel: String,
    },

    /// No snapshot reached the required agreement count across the pool
    #[error("no topology reached quorum: required {required} matching of {responses} responses")]
    NoQuorum { required: usize, responses: usize },
}

impl TopologyError {
    /// Attach the failing server/agent to a client error
    pub fn client(target: impl Into<String>, source: ClientError) -> Self {
        TopologyError::Client {
            target: target.into(),
            source,
        }
    }
}
