//! RESP frame types.
//!
//! A [`Frame`] represents one complete RESP2 message. Frames are cheap to
//! clone (`Bytes` for payloads) and serialize with direct buffer writes.

use super::{markers, responses};
use bytes::{BufMut, Bytes, BytesMut};
use std::fmt;

/// A RESP2 frame.
///
/// RESP2 has two distinct nulls, the null bulk string (`$-1\r\n`) and the
/// null array (`*-1\r\n`); they are kept as separate variants so the encoder
/// can produce the canonical form for each.
#[derive(Clone, PartialEq, Eq)]
pub enum Frame {
    /// Simple string; must not contain CR or LF.
    Simple(String),

    /// Error message; same constraint as simple strings.
    Error(String),

    /// 64-bit signed integer.
    Integer(i64),

    /// Bulk string (binary-safe).
    Bulk(Bytes),

    /// Null bulk string.
    Null,

    /// Array of frames.
    Array(Vec<Frame>),

    /// Null array.
    NullArray,
}

impl Frame {
    /// Create a simple string frame.
    #[inline]
    pub fn simple(s: impl Into<String>) -> Self {
        Self::Simple(s.into())
    }

    /// Create an error frame.
    #[inline]
    pub fn error(s: impl Into<String>) -> Self {
        Self::Error(s.into())
    }

    /// Create a bulk string frame.
    #[inline]
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Self::Bulk(data.into())
    }

    /// Create an `+OK` reply.
    #[inline]
    pub fn ok() -> Self {
        Self::Simple("OK".to_string())
    }

    /// Bulk string holding the decimal rendering of `n`.
    pub fn bulk_from_int(n: i64) -> Self {
        let mut buf = itoa::Buffer::new();
        Self::Bulk(Bytes::copy_from_slice(buf.format(n).as_bytes()))
    }

    /// Serialize the frame into `buf` in canonical RESP2 form.
    pub fn serialize(&self, buf: &mut BytesMut) {
        match self {
            Self::Simple(s) => match s.as_str() {
                "OK" => buf.put_slice(responses::OK),
                "PONG" => buf.put_slice(responses::PONG),
                _ => {
                    buf.put_u8(markers::SIMPLE_STRING);
                    buf.put_slice(s.as_bytes());
                    buf.put_slice(b"\r\n");
                }
            },
            Self::Error(s) => {
                buf.put_u8(markers::SIMPLE_ERROR);
                buf.put_slice(s.as_bytes());
                buf.put_slice(b"\r\n");
            }
            Self::Integer(n) => {
                buf.put_u8(markers::INTEGER);
                let mut tmp = itoa::Buffer::new();
                buf.put_slice(tmp.format(*n).as_bytes());
                buf.put_slice(b"\r\n");
            }
            Self::Bulk(data) => {
                buf.put_u8(markers::BULK_STRING);
                let mut tmp = itoa::Buffer::new();
                buf.put_slice(tmp.format(data.len()).as_bytes());
                buf.put_slice(b"\r\n");
                buf.put_slice(data);
                buf.put_slice(b"\r\n");
            }
            Self::Null => buf.put_slice(responses::NULL_BULK),
            Self::Array(items) => {
                if items.is_empty() {
                    buf.put_slice(responses::EMPTY_ARRAY);
                    return;
                }
                buf.put_u8(markers::ARRAY);
                let mut tmp = itoa::Buffer::new();
                buf.put_slice(tmp.format(items.len()).as_bytes());
                buf.put_slice(b"\r\n");
                for item in items {
                    item.serialize(buf);
                }
            }
            Self::NullArray => buf.put_slice(responses::NULL_ARRAY),
        }
    }

    /// Serialize into a fresh byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = BytesMut::new();
        self.serialize(&mut buf);
        buf.to_vec()
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(s) => write!(f, "Simple({s:?})"),
            Self::Error(s) => write!(f, "Error({s:?})"),
            Self::Integer(n) => write!(f, "Integer({n})"),
            Self::Bulk(b) => write!(f, "Bulk({:?})", String::from_utf8_lossy(b)),
            Self::Null => write!(f, "Null"),
            Self::Array(items) => f.debug_list().entries(items).finish(),
            Self::NullArray => write!(f, "NullArray"),
        }
    }
}
