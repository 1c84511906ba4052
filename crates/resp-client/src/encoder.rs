//! RESP command encoder
//!
//! A client only ever sends one shape on the wire: an array of bulk
//! strings.

/// Encode a command as a RESP array of bulk strings
pub fn encode_command(args: &[&str]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16 + args.iter().map(|a| a.len() + 16).sum::<usize>());
    buf.extend_from_slice(format!("*{}\r\n", args.len()).as_bytes());
    for arg in args {
        buf.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
        buf.extend_from_slice(arg.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_role() {
        let result = encode_command(&["ROLE"]);
        assert_eq!(String::from_utf8_lossy(&result), "*1\r\n$4\r\nROLE\r\n");
    }

    #[test]
    fn test_encode_sentinel_master() {
        let result = encode_command(&["SENTINEL", "master", "pshard01"]);
        assert_eq!(
            String::from_utf8_lossy(&result),
            "*3\r\n$8\r\nSENTINEL\r\n$6\r\nmaster\r\n$8\r\npshard01\r\n"
        );
    }

    #[test]
    fn test_encode_empty_arg() {
        let result = encode_command(&["CONFIG", "SET", "save", ""]);
        assert_eq!(
            String::from_utf8_lossy(&result),
            "*4\r\n$6\r\nCONFIG\r\n$3\r\nSET\r\n$4\r\nsave\r\n$0\r\n\r\n"
        );
    }
}
