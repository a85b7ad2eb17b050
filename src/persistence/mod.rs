//! Snapshot persistence.
//!
//! A dump file is a point-in-time copy of the keyspace: a 5-byte header
//! followed by the whole dataset encoded as a single RESP array. Saves are
//! atomic via a temp-file-then-rename dance; loads are all-or-nothing.

mod snapshot;

pub use snapshot::{load_from, save_to};
