//! RESP2 protocol implementation.
//!
//! <https://redis.io/docs/reference/protocol-spec/>
//!
//! Each frame on the wire is one of:
//!
//! ```text
//! +<text>\r\n                       simple string
//! -<text>\r\n                       simple error
//! :<decimal_i64>\r\n                integer
//! $<len>\r\n<bytes>\r\n             bulk string; len = -1 is null
//! *<count>\r\n<element>...          array; count = -1 is null
//! ```

mod frame;
mod parser;
mod responses;

pub use frame::Frame;
pub use parser::{Parser, ParserLimits};

/// Type prefix markers.
pub(crate) mod markers {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const SIMPLE_ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}
