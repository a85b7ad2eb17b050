//! Error types.
//!
//! [`CommandError`] variants render to the exact reply strings the server
//! puts on the wire, so command handlers can return them with `?` and the
//! processor only has to wrap the message in a RESP simple error.

use std::io;
use thiserror::Error;

/// A command-level failure, rendered verbatim into a RESP error reply.
///
/// The connection stays open after any of these; no keyspace state changes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The request frame was not a non-empty array of bulk strings.
    #[error("ERR Protocol error: expected array of bulk strings")]
    InvalidRequest,

    /// Command name not in the dispatch table. Preserves the client's case.
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    /// Argument count outside the command's arity.
    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    /// Malformed options (conflicting flags, unknown keywords).
    #[error("ERR syntax error")]
    Syntax,

    /// An argument that must be a 64-bit integer was not.
    #[error("ERR value is not an integer or out of range")]
    NotInteger,

    /// Checked arithmetic on a counter would wrap.
    #[error("ERR increment or decrement would overflow")]
    Overflow,

    /// Typed command applied to a key of another stored type.
    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    /// The command requires the key to exist.
    #[error("ERR no such key")]
    NoSuchKey,

    /// List index outside the current bounds.
    #[error("ERR index out of range")]
    IndexOutOfRange,

    /// An argument that must be strictly positive was not.
    #[error("ERR value is out of range, must be positive")]
    NotPositive,

    /// A snapshot save or load failed; carries the codec's message.
    #[error("ERR {0}")]
    Persistence(String),
}

/// A snapshot codec failure.
///
/// Save failures leave the live dump file untouched; load failures leave the
/// keyspace untouched.
#[derive(Error, Debug)]
pub enum SnapshotError {
    /// I/O failure while writing or renaming the dump file.
    #[error("save failed: {op}: {source}")]
    Save {
        /// Which step of the save protocol failed.
        op: &'static str,
        /// The underlying OS error.
        source: io::Error,
    },

    /// I/O failure while reading the dump file.
    #[error("load failed: {op}: {source}")]
    Load {
        /// Which step of the load protocol failed.
        op: &'static str,
        /// The underlying OS error.
        source: io::Error,
    },

    /// The dump file's contents did not decode.
    #[error("load failed: {0}")]
    Corrupt(String),
}

impl SnapshotError {
    pub(crate) fn save(op: &'static str, source: io::Error) -> Self {
        Self::Save { op, source }
    }

    pub(crate) fn load(op: &'static str, source: io::Error) -> Self {
        Self::Load { op, source }
    }

    pub(crate) fn corrupt(msg: impl Into<String>) -> Self {
        Self::Corrupt(msg.into())
    }
}
