//! Typed decoding of Sentinel reply shapes
//!
//! Sentinel describes masters and replicas as a flat, interleaved sequence
//! of key/value tokens rather than a structured object. Adjacent tokens are
//! paired into a map, then one explicit parse function per reply shape
//! populates a record by field name. Unknown keys are ignored; a field
//! whose expected type cannot be produced from its string value is a
//! decode error.

use std::collections::HashMap;

use crate::client::{ClientError, RoleInfo};
use crate::RespValue;

/// Pair a flat token sequence into a key → value map
///
/// `["name", "pshard01", "ip", "127.0.0.1"]` becomes
/// `{name: pshard01, ip: 127.0.0.1}`. A trailing key without a value is an
/// error.
pub fn pairs_to_map(items: &[RespValue]) -> Result<HashMap<String, String>, ClientError> {
    if items.len() % 2 != 0 {
        return Err(ClientError::Decode(format!(
            "key/value reply has odd length {}",
            items.len()
        )));
    }
    let mut map = HashMap::with_capacity(items.len() / 2);
    for pair in items.chunks(2) {
        let key = pair[0]
            .as_str()
            .ok_or_else(|| ClientError::Decode("non-string key in key/value reply".to_string()))?;
        let value = pair[1].as_str().ok_or_else(|| {
            ClientError::Decode(format!("non-string value for key '{}'", key))
        })?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

fn require<'a>(
    map: &'a HashMap<String, String>,
    field: &str,
) -> Result<&'a str, ClientError> {
    map.get(field)
        .map(String::as_str)
        .ok_or_else(|| ClientError::Decode(format!("missing field '{}'", field)))
}

fn parse_field<T: std::str::FromStr>(
    map: &HashMap<String, String>,
    field: &str,
) -> Result<T, ClientError> {
    let raw = require(map, field)?;
    raw.parse::<T>().map_err(|_| {
        ClientError::Decode(format!(
            "field '{}' has untypable value '{}'",
            field, raw
        ))
    })
}

fn flags_contain(flags: &str, flag: &str) -> bool {
    flags.split(',').any(|f| f == flag)
}

/// One watched master as described by `SENTINEL master`/`SENTINEL masters`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRecord {
    pub name: String,
    pub ip: String,
    pub port: u16,
    /// Comma-separated state flags (`master`, `s_down`, `o_down`, ...)
    pub flags: String,
    pub num_slaves: u32,
    pub quorum: u32,
    pub down_after_milliseconds: u64,
}

impl MasterRecord {
    /// Populate from a flat key/value reply
    pub fn from_reply(reply: &RespValue) -> Result<Self, ClientError> {
        let items = reply
            .as_array()
            .ok_or_else(|| ClientError::Decode("master record is not an array".to_string()))?;
        let map = pairs_to_map(items)?;
        Ok(Self {
            name: require(&map, "name")?.to_string(),
            ip: require(&map, "ip")?.to_string(),
            port: parse_field(&map, "port")?,
            flags: require(&map, "flags")?.to_string(),
            num_slaves: parse_field(&map, "num-slaves")?,
            quorum: parse_field(&map, "quorum")?,
            down_after_milliseconds: parse_field(&map, "down-after-milliseconds")?,
        })
    }

    /// `ip:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Subjectively down, as judged by the one Sentinel asked
    pub fn subjectively_down(&self) -> bool {
        flags_contain(&self.flags, "s_down")
    }

    /// Objectively down, agreed by enough Sentinels
    pub fn objectively_down(&self) -> bool {
        flags_contain(&self.flags, "o_down")
    }
}

/// One replica as described by `SENTINEL slaves <master>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaRecord {
    /// Sentinel names replicas by their address
    pub name: String,
    pub ip: String,
    pub port: u16,
    pub flags: String,
    pub master_link_status: String,
}

impl ReplicaRecord {
    /// Populate from a flat key/value reply
    pub fn from_reply(reply: &RespValue) -> Result<Self, ClientError> {
        let items = reply
            .as_array()
            .ok_or_else(|| ClientError::Decode("replica record is not an array".to_string()))?;
        let map = pairs_to_map(items)?;
        Ok(Self {
            name: require(&map, "name")?.to_string(),
            ip: require(&map, "ip")?.to_string(),
            port: parse_field(&map, "port")?,
            flags: require(&map, "flags")?.to_string(),
            master_link_status: require(&map, "master-link-status")?.to_string(),
        })
    }

    /// `ip:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Flagged down by the Sentinel asked, subjectively or objectively
    pub fn is_down(&self) -> bool {
        flags_contain(&self.flags, "s_down") || flags_contain(&self.flags, "o_down")
    }
}

/// Decode a `ROLE` reply
///
/// `["master", <offset>, [...]]` or
/// `["slave", <host>, <port>, <state>, <offset>]`.
pub fn decode_role(reply: &RespValue) -> Result<RoleInfo, ClientError> {
    let items = reply
        .as_array()
        .ok_or_else(|| ClientError::UnexpectedReply("ROLE reply is not an array".to_string()))?;
    let kind = items
        .first()
        .and_then(RespValue::as_str)
        .ok_or_else(|| ClientError::UnexpectedReply("ROLE reply has no role name".to_string()))?;

    match kind {
        "master" => Ok(RoleInfo::Primary),
        "slave" => {
            let master_host = items
                .get(1)
                .and_then(RespValue::as_str)
                .ok_or_else(|| {
                    ClientError::UnexpectedReply("ROLE slave reply missing master host".to_string())
                })?
                .to_string();
            let master_port = items
                .get(2)
                .and_then(RespValue::as_int)
                .and_then(|p| u16::try_from(p).ok())
                .ok_or_else(|| {
                    ClientError::UnexpectedReply("ROLE slave reply missing master port".to_string())
                })?;
            Ok(RoleInfo::Replica {
                master_host,
                master_port,
            })
        }
        other => Err(ClientError::UnexpectedReply(format!(
            "unsupported role '{}'",
            other
        ))),
    }
}
