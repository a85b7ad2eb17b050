//! In-memory keyspace.

mod keyspace;
mod value;

pub use keyspace::{Keyspace, SnapshotEntry, Timestamp};
pub use value::{Value, ValueType};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as Unix epoch milliseconds.
///
/// TTL deadlines and snapshot expiration instants share this representation.
pub fn now_ms() -> Timestamp {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as Timestamp)
        .unwrap_or_default()
}
