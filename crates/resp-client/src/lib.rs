//! RESP client for Redis and Sentinel administrative commands
//!
//! Implements the outbound half of the RESP protocol (command encoding,
//! reply parsing) plus a narrow, type-safe command interface covering the
//! role/config/replication commands on cache servers and the administrative
//! command set on Sentinel.

mod client;
mod conn;
mod encoder;
mod reader;
mod records;

pub use client::{ClientError, ClientFactory, CommandClient, RoleInfo, UNKNOWN_MASTER};
pub use conn::{ConnUrl, RespConnection, RespFactory};
pub use encoder::encode_command;
pub use reader::{ReplyReader, DEFAULT_MAX_REPLY_SIZE};
pub use records::{decode_role, pairs_to_map, MasterRecord, ReplicaRecord};

use bytes::Bytes;
use std::io;

/// RESP data type
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple string: +OK\r\n
    SimpleString(Bytes),
    /// Error: -ERR message\r\n
    Error(Bytes),
    /// Integer: :123\r\n
    Integer(i64),
    /// Bulk string: $5\r\nhello\r\n
    BulkString(Option<Bytes>),
    /// Array: *2\r\n$4\r\nname\r\n$8\r\npshard01\r\n
    Array(Vec<RespValue>),
    /// Null: $-1\r\n
    Null,
}

impl RespValue {
    /// View this value as a UTF-8 string, if it carries text
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => std::str::from_utf8(s).ok(),
            RespValue::BulkString(Some(s)) => std::str::from_utf8(s).ok(),
            _ => None,
        }
    }

    /// View this value as an array of elements
    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(items) => Some(items),
            _ => None,
        }
    }

    /// View this value as an integer
    pub fn as_int(&self) -> Option<i64> {
        match self {
            RespValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// RESP parsing error
#[derive(Debug, thiserror::Error)]
pub enum RespError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Invalid RESP format: {0}")]
    InvalidFormat(String),
    #[error("Unexpected end of input")]
    UnexpectedEof,
    #[error("Integer overflow")]
    IntegerOverflow,
    #[error("Reply too large: {0} bytes (max: {1} bytes)")]
    ReplyTooLarge(usize, usize),
    #[error("Invalid RESP type: {0}")]
    InvalidType(u8),
}
