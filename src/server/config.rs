//! Server configuration.

use crate::protocol::ParserLimits;
use crate::{
    DEFAULT_DUMP_PATH, DEFAULT_MAX_ARRAY_LEN, DEFAULT_MAX_BULK_LEN, DEFAULT_MAX_INLINE_LEN,
    DEFAULT_MAX_NESTING, DEFAULT_PORT,
};
use std::path::PathBuf;

/// Server configuration.
///
/// A value of zero disables any of the `proto_max_*` bounds and the idle
/// timeout.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bind address.
    pub bind: String,
    /// Port number.
    pub port: u16,
    /// Cap on a single bulk string.
    pub proto_max_bulk_len: usize,
    /// Cap on a single array element count.
    pub proto_max_array_len: usize,
    /// Cap on active array frames while parsing.
    pub proto_max_nesting: usize,
    /// Cap on buffered bytes before a CRLF.
    pub proto_max_inline_len: usize,
    /// Per-connection idle timeout in milliseconds (0 = off).
    pub conn_idle_timeout_ms: u64,
    /// Default snapshot file path.
    pub dump_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            proto_max_bulk_len: DEFAULT_MAX_BULK_LEN,
            proto_max_array_len: DEFAULT_MAX_ARRAY_LEN,
            proto_max_nesting: DEFAULT_MAX_NESTING,
            proto_max_inline_len: DEFAULT_MAX_INLINE_LEN,
            conn_idle_timeout_ms: 0,
            dump_path: PathBuf::from(DEFAULT_DUMP_PATH),
        }
    }
}

impl Config {
    /// The parser bounds this configuration prescribes.
    pub fn parser_limits(&self) -> ParserLimits {
        ParserLimits {
            max_bulk_len: self.proto_max_bulk_len,
            max_array_len: self.proto_max_array_len,
            max_nesting: self.proto_max_nesting,
            max_inline_len: self.proto_max_inline_len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.port, 6379);
        assert_eq!(config.proto_max_bulk_len, 512 * 1024 * 1024);
        assert_eq!(config.proto_max_array_len, 1024 * 1024);
        assert_eq!(config.proto_max_nesting, 128);
        assert_eq!(config.proto_max_inline_len, 64 * 1024);
        assert_eq!(config.conn_idle_timeout_ms, 0);
        assert_eq!(config.dump_path, PathBuf::from("dump.mrdb"));
    }
}
