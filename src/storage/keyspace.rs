//! The typed keyspace with its TTL sidecar.
//!
//! Expiration is lazy: the only path that removes an expired key is
//! [`Keyspace::find`] (and snapshot creation, which traverses every key).
//! There is no background sweeper.

use super::{now_ms, Value};
use bytes::Bytes;
use std::collections::HashMap;

/// Unix epoch milliseconds.
pub type Timestamp = i64;

/// One entry of a point-in-time snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub key: Bytes,
    pub value: Value,
    /// Absolute expiration instant, if the key had a TTL.
    pub expire_at_ms: Option<Timestamp>,
}

/// The committed state of the database: a map of keys to tagged values plus
/// a disjoint map of expiration deadlines.
///
/// Invariant: the TTL map's key set is a subset of the value map's key set
/// at every quiescent point. A key present in `keys` but absent from `ttl`
/// has no expiration.
#[derive(Debug, Default)]
pub struct Keyspace {
    keys: HashMap<Bytes, Value>,
    ttl: HashMap<Bytes, Timestamp>,
}

impl Keyspace {
    /// Create an empty keyspace.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lazy-expiring lookup.
    ///
    /// Returns `None` if the key is absent, or if it is past its expiration
    /// (in which case both the value and its TTL entry are removed first).
    /// The returned reference stays valid until the next mutation of the
    /// keyspace; repeat access within one command goes through it.
    pub fn find(&mut self, key: &[u8]) -> Option<&mut Value> {
        if !self.keys.contains_key(key) {
            return None;
        }
        if let Some(&deadline) = self.ttl.get(key) {
            if now_ms() >= deadline {
                self.ttl.remove(key);
                self.keys.remove(key);
                return None;
            }
        }
        self.keys.get_mut(key)
    }

    /// Unconditional overwrite. Does not touch any existing TTL; the caller
    /// decides whether to keep or clear it.
    pub fn insert(&mut self, key: Bytes, value: Value) {
        self.keys.insert(key, value);
    }

    /// Remove the key and any TTL it carries.
    pub fn erase(&mut self, key: &[u8]) {
        self.ttl.remove(key);
        self.keys.remove(key);
    }

    /// Set or overwrite the key's expiration to `now + dur_ms`.
    pub fn expire_after(&mut self, key: &Bytes, dur_ms: i64) {
        self.expire_at(key, now_ms().saturating_add(dur_ms));
    }

    /// Set or overwrite the key's expiration to an absolute instant.
    pub fn expire_at(&mut self, key: &Bytes, at: Timestamp) {
        debug_assert!(self.keys.contains_key(&key[..]));
        self.ttl.insert(key.clone(), at);
    }

    /// The key's absolute expiration deadline, if one is set.
    pub fn expires_at(&self, key: &[u8]) -> Option<Timestamp> {
        self.ttl.get(key).copied()
    }

    /// Remaining time in milliseconds, which may be zero or negative.
    /// `None` if the key has no TTL.
    pub fn ttl(&self, key: &[u8]) -> Option<i64> {
        self.ttl.get(key).map(|&deadline| deadline - now_ms())
    }

    /// Remove any TTL without touching the value.
    pub fn clear_expires(&mut self, key: &[u8]) {
        self.ttl.remove(key);
    }

    /// Number of live entries (expired-but-unreaped keys included).
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Produce a point-in-time snapshot.
    ///
    /// Entries already past their expiration are dropped from the snapshot
    /// and reaped from the store, normalising the TTL sidecar.
    pub fn create_snapshot(&mut self) -> Vec<SnapshotEntry> {
        let now = now_ms();
        let expired: Vec<Bytes> = self
            .ttl
            .iter()
            .filter(|&(_, &deadline)| now >= deadline)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            self.erase(key);
        }

        self.keys
            .iter()
            .map(|(key, value)| SnapshotEntry {
                key: key.clone(),
                value: value.clone(),
                expire_at_ms: self.ttl.get(&key[..]).copied(),
            })
            .collect()
    }

    /// Replace the entire keyspace with the given snapshot entries.
    pub fn replace_with_snapshot(&mut self, entries: Vec<SnapshotEntry>) {
        self.keys.clear();
        self.ttl.clear();
        for entry in entries {
            if let Some(at) = entry.expire_at_ms {
                self.ttl.insert(entry.key.clone(), at);
            }
            self.keys.insert(entry.key, entry.value);
        }
    }
}
