//! Pre-encoded bytes for the replies the server sends constantly.

/// `+OK\r\n`
pub static OK: &[u8] = b"+OK\r\n";

/// `+PONG\r\n`
pub static PONG: &[u8] = b"+PONG\r\n";

/// Null bulk string, `$-1\r\n`
pub static NULL_BULK: &[u8] = b"$-1\r\n";

/// Null array, `*-1\r\n`
pub static NULL_ARRAY: &[u8] = b"*-1\r\n";

/// Empty array, `*0\r\n`
pub static EMPTY_ARRAY: &[u8] = b"*0\r\n";
