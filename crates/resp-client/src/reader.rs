//! RESP reply reader
//!
//! Reads single replies from an async stream. A client issues one command
//! and reads exactly one reply, so there is no pipeline or EOF-batch
//! handling here.

use crate::{RespError, RespValue};
use bytes::Bytes;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Default maximum reply size: 16MB
///
/// Sentinel administrative replies are small; this guards against a
/// misbehaving peer streaming an unbounded frame.
pub const DEFAULT_MAX_REPLY_SIZE: usize = 16 * 1024 * 1024;

/// RESP reply reader over a buffered async stream
pub struct ReplyReader<R: AsyncRead + Unpin> {
    reader: BufReader<R>,
    max_bytes: usize,
    bytes_read: usize,
}

impl<R: AsyncRead + Unpin> ReplyReader<R> {
    /// Create a reader with the default reply size limit
    pub fn new(reader: R) -> Self {
        Self::with_max_bytes(reader, DEFAULT_MAX_REPLY_SIZE)
    }

    /// Create a reader with an explicit reply size limit (bytes)
    pub fn with_max_bytes(reader: R, max_bytes: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            max_bytes,
            bytes_read: 0,
        }
    }

    /// Read one complete reply
    ///
    /// Resets the size accounting per reply, so the limit applies to a
    /// single frame rather than the connection lifetime.
    pub async fn read_reply(&mut self) -> Result<RespValue, RespError> {
        self.bytes_read = 0;
        self.parse().await
    }

    fn check_reply_size(&mut self, additional: usize) -> Result<(), RespError> {
        self.bytes_read = self.bytes_read.saturating_add(additional);
        if self.bytes_read > self.max_bytes {
            Err(RespError::ReplyTooLarge(self.bytes_read, self.max_bytes))
        } else {
            Ok(())
        }
    }

    async fn parse(&mut self) -> Result<RespValue, RespError> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            return Err(RespError::UnexpectedEof);
        }

        self.check_reply_size(bytes_read)?;

        let line = line.trim_end();
        if line.is_empty() {
            return Err(RespError::InvalidFormat("Empty line".to_string()));
        }

        match line.as_bytes()[0] {
            b'*' => self.parse_array(line).await,
            b'$' => self.parse_bulk(line).await,
            b':' => parse_int(line),
            b'+' => parse_simple(line),
            b'-' => Ok(RespValue::Error(Bytes::from(line[1..].to_string()))),
            other => Err(RespError::InvalidType(other)),
        }
    }

    /// Parse bulk string body: $5\r\nhello\r\n
    async fn parse_bulk(&mut self, line: &str) -> Result<RespValue, RespError> {
        let len_str = &line[1..];
        let len = len_str.parse::<i64>().map_err(|_| {
            RespError::InvalidFormat(format!("Invalid bulk string length: {}", len_str))
        })?;

        if len == -1 {
            return Ok(RespValue::BulkString(None));
        }
        if len < 0 {
            return Err(RespError::InvalidFormat(format!(
                "Invalid bulk string length: {}",
                len
            )));
        }

        let len = len as usize;
        self.check_reply_size(len + 2)?;

        let mut buffer = vec![0u8; len];
        AsyncReadExt::read_exact(&mut self.reader, &mut buffer).await?;

        let mut crlf = [0u8; 2];
        AsyncReadExt::read_exact(&mut self.reader, &mut crlf).await?;
        if crlf != [b'\r', b'\n'] {
            return Err(RespError::InvalidFormat(
                "Expected \\r\\n after bulk string".to_string(),
            ));
        }

        Ok(RespValue::BulkString(Some(Bytes::from(buffer))))
    }

    /// Parse array header and elements: *2\r\n...
    async fn parse_array(&mut self, line: &str) -> Result<RespValue, RespError> {
        let count_str = &line[1..];
        let count = count_str.parse::<i64>().map_err(|_| {
            RespError::InvalidFormat(format!("Invalid array length: {}", count_str))
        })?;

        if count == -1 {
            return Ok(RespValue::Null);
        }
        if count < 0 {
            return Err(RespError::InvalidFormat(format!(
                "Invalid array length: {}",
                count
            )));
        }

        let count = count as usize;
        if count > 64 * 1024 {
            return Err(RespError::InvalidFormat(format!(
                "Array too large: {} elements",
                count
            )));
        }

        let mut array = Vec::with_capacity(count);
        for _ in 0..count {
            let parse_fut = Box::pin(async { self.parse().await });
            array.push(parse_fut.await?);
        }
        Ok(RespValue::Array(array))
    }
}

fn parse_simple(line: &str) -> Result<RespValue, RespError> {
    let value = &line[1..];
    if value.contains('\r') || value.contains('\n') {
        return Err(RespError::InvalidFormat(
            "Simple string cannot contain CR or LF".to_string(),
        ));
    }
    Ok(RespValue::SimpleString(Bytes::from(value.to_string())))
}

fn parse_int(line: &str) -> Result<RespValue, RespError> {
    let num_str = &line[1..];
    let num = num_str
        .parse::<i128>()
        .map_err(|_| RespError::InvalidFormat(format!("Invalid integer: {}", num_str)))?;

    if num > i64::MAX as i128 || num < i64::MIN as i128 {
        return Err(RespError::IntegerOverflow);
    }

    Ok(RespValue::Integer(num as i64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    #[tokio::test]
    async fn test_read_simple_string() {
        let reader = Builder::new().read(b"+OK\r\n").build();
        let mut reader = ReplyReader::with_max_bytes(reader, 1024);
        let result = reader.read_reply().await.unwrap();
        assert_eq!(result, RespValue::SimpleString(Bytes::from("OK")));
    }

    #[tokio::test]
    async fn test_read_error_reply() {
        let reader = Builder::new()
            .read(b"-ERR No such master with that name\r\n")
            .build();
        let mut reader = ReplyReader::with_max_bytes(reader, 1024);
        let result = reader.read_reply().await.unwrap();
        assert_eq!(
            result,
            RespValue::Error(Bytes::from("ERR No such master with that name"))
        );
    }

    #[tokio::test]
    async fn test_read_flat_pair_array() {
        let reader = Builder::new()
            .read(b"*4\r\n$4\r\nname\r\n$8\r\npshard01\r\n$2\r\nip\r\n$9\r\n127.0.0.1\r\n")
            .build();
        let mut reader = ReplyReader::with_max_bytes(reader, 1024);
        let result = reader.read_reply().await.unwrap();
        let items = result.as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].as_str(), Some("name"));
        assert_eq!(items[1].as_str(), Some("pshard01"));
    }

    #[tokio::test]
    async fn test_read_null_bulk() {
        let reader = Builder::new().read(b"$-1\r\n").build();
        let mut reader = ReplyReader::with_max_bytes(reader, 1024);
        let result = reader.read_reply().await.unwrap();
        assert_eq!(result, RespValue::BulkString(None));
    }

    #[tokio::test]
    async fn test_reply_too_large() {
        let reader = Builder::new().read(b"$9999999999\r\n").build();
        let mut reader = ReplyReader::with_max_bytes(reader, 1024);
        let result = reader.read_reply().await;
        assert!(matches!(result, Err(RespError::ReplyTooLarge(_, _))));
    }

    #[tokio::test]
    async fn test_size_limit_resets_between_replies() {
        let reader = Builder::new()
            .read(b"$600\r\n")
            .read(&[b'a'; 600])
            .read(b"\r\n$600\r\n")
            .read(&[b'b'; 600])
            .read(b"\r\n")
            .build();
        let mut reader = ReplyReader::with_max_bytes(reader, 1024);
        assert!(reader.read_reply().await.is_ok());
        assert!(reader.read_reply().await.is_ok());
    }
}
