//! Streaming RESP parser.
//!
//! The parser consumes arbitrary byte chunks and emits complete frames in
//! arrival order. It is push-driven: the "next state" is entirely implicit
//! in the buffer, and each parse step either produces one leaf, opens an
//! array frame, or reports that more bytes are needed.
//!
//! Arrays are not materialised up-front. An explicit stack of partial
//! arrays records how many children each level still expects, so a deeply
//! pipelined or chunked request never forces a re-parse of consumed input.
//!
//! Protocol errors are sticky and terminal: the parser drops all buffered
//! bytes and partial frames, refuses further parsing, and exposes the error
//! message for the session to surface before closing the connection.

use super::{markers, Frame};
use bytes::{Buf, Bytes, BytesMut};
use memchr::memchr;
use std::collections::VecDeque;

/// Size bounds enforced while parsing. A value of zero disables that bound.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParserLimits {
    /// Cap on a single bulk string's declared length.
    pub max_bulk_len: usize,
    /// Cap on a single array's declared element count.
    pub max_array_len: usize,
    /// Cap on concurrently open array frames.
    pub max_nesting: usize,
    /// Cap on buffered bytes before a CRLF is seen.
    pub max_inline_len: usize,
}

/// An array whose header has been consumed but whose children are still
/// arriving.
struct PartialArray {
    expected: usize,
    items: Vec<Frame>,
}

/// Incremental RESP2 parser.
///
/// # Usage
///
/// ```
/// use mini_redis::{Parser, ParserLimits};
///
/// let mut parser = Parser::new(ParserLimits::default());
/// parser.append(b"+OK\r\n");
/// assert_eq!(parser.parse(), 1);
/// assert!(parser.pop_data().is_some());
/// ```
pub struct Parser {
    limits: ParserLimits,
    buffer: BytesMut,
    results: VecDeque<Frame>,
    frames: Vec<PartialArray>,
    error: Option<String>,
}

impl Parser {
    /// Create a parser with the given bounds.
    pub fn new(limits: ParserLimits) -> Self {
        Self {
            limits,
            buffer: BytesMut::with_capacity(4096),
            results: VecDeque::new(),
            frames: Vec::new(),
            error: None,
        }
    }

    /// Append a chunk of bytes to the internal buffer.
    pub fn append(&mut self, chunk: &[u8]) {
        self.buffer.extend_from_slice(chunk);
    }

    /// Extract as many complete frames as the buffer allows.
    ///
    /// Returns the number of frames newly added to the output queue.
    pub fn parse(&mut self) -> usize {
        let before = self.results.len();
        while !self.buffer.is_empty() {
            if !self.try_parse() {
                break;
            }
        }
        self.results.len() - before
    }

    /// Number of parsed frames waiting to be popped.
    pub fn available(&self) -> usize {
        self.results.len()
    }

    /// Returns true if at least one parsed frame is waiting.
    pub fn has_data(&self) -> bool {
        !self.results.is_empty()
    }

    /// Pop the oldest parsed frame.
    pub fn pop_data(&mut self) -> Option<Frame> {
        self.results.pop_front()
    }

    /// Returns true if a protocol error is pending.
    pub fn has_error(&self) -> bool {
        self.error.is_some()
    }

    /// Consume the pending protocol error, if any.
    pub fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    /// Attempt one parse step. Returns false when no progress can be made,
    /// either because more bytes are needed or an error was recorded.
    fn try_parse(&mut self) -> bool {
        if self.error.is_some() {
            return false;
        }

        if self.limits.max_inline_len != 0
            && self.find_crlf().is_none()
            && self.buffer.len() > self.limits.max_inline_len
        {
            self.protocol_error(
                "ERR Protocol error: inline length exceeds proto_max_inline_len",
            );
            return false;
        }

        let (consumed, value) = match self.buffer[0] {
            markers::SIMPLE_STRING => self.parse_simple_string(),
            markers::SIMPLE_ERROR => self.parse_simple_error(),
            markers::BULK_STRING => self.parse_bulk_string(),
            markers::INTEGER => self.parse_integer(),
            markers::ARRAY => self.parse_array(),
            _ => {
                self.protocol_error("ERR Protocol error: unknown prefix");
                return false;
            }
        };

        if consumed == 0 {
            return false;
        }
        self.buffer.advance(consumed);

        if let Some(value) = value {
            self.push_value(value);
        }
        true
    }

    /// Offer a completed value to the innermost open array, closing arrays
    /// that become full, or to the output queue when none is open.
    fn push_value(&mut self, value: Frame) {
        let Some(top) = self.frames.last_mut() else {
            self.results.push_back(value);
            return;
        };
        top.items.push(value);

        while matches!(self.frames.last(), Some(top) if top.items.len() >= top.expected) {
            if let Some(done) = self.frames.pop() {
                let value = Frame::Array(done.items);
                match self.frames.last_mut() {
                    Some(parent) => parent.items.push(value),
                    None => self.results.push_back(value),
                }
            }
        }
    }

    fn protocol_error(&mut self, msg: impl Into<String>) {
        self.error = Some(msg.into());
        self.frames.clear();
        self.buffer.clear();
    }

    fn find_crlf(&self) -> Option<usize> {
        let buf = &self.buffer[..];
        let mut offset = 0;
        while let Some(pos) = memchr(b'\r', &buf[offset..]) {
            let at = offset + pos;
            if at + 1 >= buf.len() {
                return None;
            }
            if buf[at + 1] == b'\n' {
                return Some(at);
            }
            offset = at + 1;
        }
        None
    }

    fn parse_simple_string(&mut self) -> (usize, Option<Frame>) {
        let Some(pos) = self.find_crlf() else {
            return (0, None);
        };
        let payload = &self.buffer[1..pos];
        if payload.iter().any(|&b| b == b'\r' || b == b'\n') {
            self.protocol_error("ERR Protocol error: bad simple string encoding");
            return (0, None);
        }
        let text = String::from_utf8_lossy(payload).into_owned();
        (pos + 2, Some(Frame::Simple(text)))
    }

    fn parse_simple_error(&mut self) -> (usize, Option<Frame>) {
        let Some(pos) = self.find_crlf() else {
            return (0, None);
        };
        let payload = &self.buffer[1..pos];
        if payload.iter().any(|&b| b == b'\r' || b == b'\n') {
            self.protocol_error("ERR Protocol error: bad simple error encoding");
            return (0, None);
        }
        let text = String::from_utf8_lossy(payload).into_owned();
        (pos + 2, Some(Frame::Error(text)))
    }

    fn parse_bulk_string(&mut self) -> (usize, Option<Frame>) {
        let Some(pos) = self.find_crlf() else {
            return (0, None);
        };
        if pos == 1 {
            self.protocol_error("ERR Protocol error: missing bulk length");
            return (0, None);
        }

        let Some(len) = parse_i64(&self.buffer[1..pos]) else {
            self.protocol_error("ERR Protocol error: invalid bulk length");
            return (0, None);
        };
        if len == -1 {
            return (pos + 2, Some(Frame::Null));
        }
        if len < 0 {
            self.protocol_error("ERR Protocol error: invalid bulk length");
            return (0, None);
        }

        let len = len as u64;
        if self.limits.max_bulk_len != 0 && len > self.limits.max_bulk_len as u64 {
            self.protocol_error(
                "ERR Protocol error: bulk length exceeds proto_max_bulk_len",
            );
            return (0, None);
        }
        let Ok(len) = usize::try_from(len) else {
            self.protocol_error("ERR Protocol error: bulk length is too large");
            return (0, None);
        };

        let data_start = pos + 2;
        if self.buffer.len() - data_start < len {
            return (0, None);
        }
        let data_end = data_start + len;
        if self.buffer.len() - data_end < 2 {
            return (0, None);
        }
        if &self.buffer[data_end..data_end + 2] != b"\r\n" {
            self.protocol_error("ERR Protocol error: bad bulk string encoding");
            return (0, None);
        }

        let data = Bytes::copy_from_slice(&self.buffer[data_start..data_end]);
        (data_end + 2, Some(Frame::Bulk(data)))
    }

    fn parse_integer(&mut self) -> (usize, Option<Frame>) {
        let Some(pos) = self.find_crlf() else {
            return (0, None);
        };
        if pos == 1 {
            self.protocol_error("ERR Protocol error: missing integer");
            return (0, None);
        }
        let Some(num) = parse_i64(&self.buffer[1..pos]) else {
            self.protocol_error("ERR Protocol error: invalid integer");
            return (0, None);
        };
        (pos + 2, Some(Frame::Integer(num)))
    }

    fn parse_array(&mut self) -> (usize, Option<Frame>) {
        let Some(pos) = self.find_crlf() else {
            return (0, None);
        };
        if pos == 1 {
            self.protocol_error("ERR Protocol error: missing array length");
            return (0, None);
        }

        let Some(len) = parse_i64(&self.buffer[1..pos]) else {
            self.protocol_error("ERR Protocol error: invalid array length");
            return (0, None);
        };
        if len == 0 {
            return (pos + 2, Some(Frame::Array(Vec::new())));
        }
        if len == -1 {
            return (pos + 2, Some(Frame::NullArray));
        }
        if len < 0 {
            self.protocol_error("ERR Protocol error: invalid array length");
            return (0, None);
        }

        let len = len as u64;
        if self.limits.max_array_len != 0 && len > self.limits.max_array_len as u64 {
            self.protocol_error(
                "ERR Protocol error: array length exceeds proto_max_array_len",
            );
            return (0, None);
        }
        let Ok(len) = usize::try_from(len) else {
            self.protocol_error("ERR Protocol error: array length is too large");
            return (0, None);
        };
        if self.limits.max_nesting != 0 && self.frames.len() + 1 > self.limits.max_nesting {
            self.protocol_error(
                "ERR Protocol error: array nesting exceeds proto_max_nesting",
            );
            return (0, None);
        }

        self.frames.push(PartialArray {
            expected: len,
            items: Vec::with_capacity(len.min(64)),
        });
        (pos + 2, None)
    }
}

fn parse_i64(bytes: &[u8]) -> Option<i64> {
    std::str::from_utf8(bytes).ok()?.parse().ok()
}
