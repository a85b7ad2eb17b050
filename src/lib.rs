//! # mini-redis
//!
//! A single-node, in-memory key/value server speaking the RESP2 wire
//! protocol over TCP.
//!
//! The server parses pipelined client commands incrementally, applies them
//! atomically against a typed keyspace with optional per-key expirations,
//! and streams encoded replies back. The keyspace can be snapshotted to and
//! restored from a binary dump file.
//!
//! ## Architecture
//!
//! - [`protocol`]: the RESP2 value model, encoder, and streaming parser
//! - [`storage`]: the typed keyspace with its lazy-expiration TTL sidecar
//! - [`persistence`]: the snapshot codec with atomic-via-rename saves
//! - [`commands`]: the command processor executing Redis semantics
//! - [`server`]: the TCP server, per-connection sessions, and the
//!   single-writer execution context that serialises all command work
//!
//! ## Example
//!
//! ```no_run
//! use mini_redis::{Config, Server};
//!
//! #[tokio::main]
//! async fn main() -> std::io::Result<()> {
//!     let server = Server::bind(Config::default()).await?;
//!     server.run().await
//! }
//! ```

#![warn(rust_2018_idioms, trivial_casts, unused_lifetimes, unused_qualifications)]

/// Command validation and execution.
pub mod commands;
/// Error types with their exact wire representations.
pub mod error;
/// Snapshot save/load.
pub mod persistence;
/// RESP2 protocol implementation.
pub mod protocol;
/// TCP server and connection management.
pub mod server;
/// In-memory keyspace.
pub mod storage;

pub use commands::Processor;
pub use error::{CommandError, SnapshotError};
pub use protocol::{Frame, Parser, ParserLimits};
pub use server::{Config, Server};
pub use storage::{Keyspace, Value};

/// Crate version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default server port.
pub const DEFAULT_PORT: u16 = 6379;

/// Default cap on a single bulk string (512 MiB).
pub const DEFAULT_MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Default cap on a single array element count (1 Mi).
pub const DEFAULT_MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Default cap on active array frames while parsing.
pub const DEFAULT_MAX_NESTING: usize = 128;

/// Default cap on buffered bytes before a CRLF (64 KiB).
pub const DEFAULT_MAX_INLINE_LEN: usize = 64 * 1024;

/// Default snapshot file name.
pub const DEFAULT_DUMP_PATH: &str = "dump.mrdb";
