//! The MRDB snapshot codec.
//!
//! # Format
//!
//! ```text
//! +---------------+--------------------------------------+
//! | M R D B <ver> | one RESP array, one element per entry |
//! +---------------+--------------------------------------+
//! ```
//!
//! Each entry is a 5-element RESP array:
//!
//! 1. bulk string: key
//! 2. integer: type tag (0=String 1=Integer 2=List 3=Set 4=Hash)
//! 3. value payload (bulk / integer / array of bulks; hashes alternate
//!    field and value, so the array length is even)
//! 4. integer: 1 if the entry carries an expiration, else 0
//! 5. integer: expiration as Unix epoch milliseconds, 0 when absent
//!
//! Entries already expired at load time are silently dropped.

use crate::error::SnapshotError;
use crate::protocol::{Frame, Parser, ParserLimits};
use crate::storage::{now_ms, Keyspace, SnapshotEntry, Value, ValueType};
use bytes::BytesMut;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const MAGIC: &[u8; 4] = b"MRDB";
const VERSION: u8 = 1;

/// Write a snapshot of the keyspace to `path`, replacing any existing file
/// atomically. Expired entries are dropped (and reaped from the store) as a
/// side effect of snapshot creation.
pub fn save_to(path: &Path, keyspace: &mut Keyspace) -> Result<(), SnapshotError> {
    let entries = keyspace.create_snapshot();

    let body = Frame::Array(entries.iter().map(encode_entry).collect());
    let mut buf = BytesMut::new();
    body.serialize(&mut buf);

    save_file(path, &buf)
}

/// Read and decode the snapshot at `path`.
///
/// The caller feeds the returned entries to
/// [`Keyspace::replace_with_snapshot`]; nothing here touches live state, so
/// a failed load leaves the keyspace exactly as it was.
pub fn load_from(path: &Path) -> Result<Vec<SnapshotEntry>, SnapshotError> {
    let raw = fs::read(path).map_err(|e| SnapshotError::load("cannot read file", e))?;

    if raw.len() < MAGIC.len() + 1 {
        return Err(SnapshotError::corrupt("file is too short"));
    }
    if &raw[..MAGIC.len()] != MAGIC {
        return Err(SnapshotError::corrupt("bad format header"));
    }
    if raw[MAGIC.len()] != VERSION {
        return Err(SnapshotError::corrupt("unsupported format version"));
    }

    parse_body(&raw[MAGIC.len() + 1..])
}

fn encode_entry(entry: &SnapshotEntry) -> Frame {
    let payload = match &entry.value {
        Value::String(s) => Frame::Bulk(s.clone()),
        Value::Integer(n) => Frame::Integer(*n),
        Value::List(items) => {
            Frame::Array(items.iter().map(|i| Frame::Bulk(i.clone())).collect())
        }
        Value::Set(members) => {
            Frame::Array(members.iter().map(|m| Frame::Bulk(m.clone())).collect())
        }
        Value::Hash(fields) => Frame::Array(
            fields
                .iter()
                .flat_map(|(k, v)| [Frame::Bulk(k.clone()), Frame::Bulk(v.clone())])
                .collect(),
        ),
    };

    let (has_expire, expire_at_ms) = match entry.expire_at_ms {
        Some(at) => (1, at),
        None => (0, 0),
    };

    Frame::Array(vec![
        Frame::Bulk(entry.key.clone()),
        Frame::Integer(entry.value.type_tag()),
        payload,
        Frame::Integer(has_expire),
        Frame::Integer(expire_at_ms),
    ])
}

/// Write `body` (with the format header) to `path` atomically:
/// first to `<path>.tmp`, then renamed over the target, keeping the old
/// file in `<path>.bak` until the replacement has succeeded.
fn save_file(path: &Path, body: &[u8]) -> Result<(), SnapshotError> {
    let temp_path = sibling(path, ".tmp");
    let backup_path = sibling(path, ".bak");

    let _ = fs::remove_file(&temp_path);

    let mut file = fs::File::create(&temp_path)
        .map_err(|e| SnapshotError::save("cannot open temporary file", e))?;

    let header = [MAGIC[0], MAGIC[1], MAGIC[2], MAGIC[3], VERSION];
    if let Err(e) = file.write_all(&header) {
        let _ = fs::remove_file(&temp_path);
        return Err(SnapshotError::save("cannot write header", e));
    }
    if let Err(e) = file.write_all(body) {
        let _ = fs::remove_file(&temp_path);
        return Err(SnapshotError::save("cannot write body", e));
    }
    if let Err(e) = file.sync_all() {
        let _ = fs::remove_file(&temp_path);
        return Err(SnapshotError::save("cannot flush file", e));
    }
    drop(file);

    let _ = fs::remove_file(&backup_path);

    let moved = match fs::rename(path, &backup_path) {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            let _ = fs::remove_file(&temp_path);
            return Err(SnapshotError::save("cannot move old snapshot", e));
        }
    };

    if let Err(e) = fs::rename(&temp_path, path) {
        if moved {
            let _ = fs::rename(&backup_path, path);
        }
        let _ = fs::remove_file(&temp_path);
        return Err(SnapshotError::save("cannot replace snapshot", e));
    }

    if moved {
        let _ = fs::remove_file(&backup_path);
    }

    Ok(())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

fn parse_body(body: &[u8]) -> Result<Vec<SnapshotEntry>, SnapshotError> {
    // The dump is trusted local data; parse it unbounded.
    let mut parser = Parser::new(ParserLimits::default());
    parser.append(body);
    parser.parse();

    if parser.has_error() {
        let msg = parser
            .take_error()
            .unwrap_or_else(|| "invalid RESP payload".to_string());
        return Err(SnapshotError::corrupt(msg));
    }
    if parser.available() != 1 {
        return Err(SnapshotError::corrupt("invalid snapshot payload"));
    }

    let entries = match parser.pop_data() {
        Some(Frame::Array(entries)) => entries,
        _ => return Err(SnapshotError::corrupt("snapshot root is not an array")),
    };

    let now = now_ms();
    let mut out = Vec::with_capacity(entries.len());
    for frame in entries {
        if let Some(entry) = parse_entry(frame, now)? {
            out.push(entry);
        }
    }
    Ok(out)
}

/// Decode one snapshot entry. Returns `Ok(None)` for an entry that is valid
/// but already expired.
fn parse_entry(frame: Frame, now: i64) -> Result<Option<SnapshotEntry>, SnapshotError> {
    let items = match frame {
        Frame::Array(items) => items,
        _ => return Err(SnapshotError::corrupt("invalid snapshot entry")),
    };
    if items.len() != 5 {
        return Err(SnapshotError::corrupt("malformed snapshot entry"));
    }
    let mut items = items.into_iter();

    let key = match items.next() {
        Some(Frame::Bulk(key)) => key,
        _ => return Err(SnapshotError::corrupt("invalid snapshot key")),
    };

    let tag = match items.next() {
        Some(Frame::Integer(tag)) => tag,
        _ => return Err(SnapshotError::corrupt("invalid type tag")),
    };

    let value = match items.next() {
        Some(payload) => parse_value(tag, payload)?,
        None => return Err(SnapshotError::corrupt("malformed snapshot entry")),
    };

    let has_expire = match items.next() {
        Some(Frame::Integer(flag @ (0 | 1))) => flag,
        _ => return Err(SnapshotError::corrupt("invalid expiration flag")),
    };

    let expire_at_ms = match items.next() {
        Some(Frame::Integer(at)) => at,
        _ => return Err(SnapshotError::corrupt("invalid expiration timestamp")),
    };

    let expire_at_ms = if has_expire == 0 {
        if expire_at_ms != 0 {
            return Err(SnapshotError::corrupt("malformed expiration fields"));
        }
        None
    } else {
        if expire_at_ms <= now {
            return Ok(None);
        }
        Some(expire_at_ms)
    };

    Ok(Some(SnapshotEntry {
        key,
        value,
        expire_at_ms,
    }))
}

fn parse_value(tag: i64, payload: Frame) -> Result<Value, SnapshotError> {
    let value_type = ValueType::from_tag(tag)
        .ok_or_else(|| SnapshotError::corrupt("unknown value type"))?;

    match value_type {
        ValueType::String => match payload {
            Frame::Bulk(s) => Ok(Value::String(s)),
            _ => Err(SnapshotError::corrupt("invalid string value")),
        },
        ValueType::Integer => match payload {
            Frame::Integer(n) => Ok(Value::Integer(n)),
            _ => Err(SnapshotError::corrupt("invalid integer value")),
        },
        ValueType::List => {
            let items = container_items(payload)?;
            let mut list = VecDeque::with_capacity(items.len());
            for item in items {
                match item {
                    Frame::Bulk(elt) => list.push_back(elt),
                    _ => return Err(SnapshotError::corrupt("invalid list element")),
                }
            }
            Ok(Value::List(list))
        }
        ValueType::Set => {
            let items = container_items(payload)?;
            let mut set = HashSet::with_capacity(items.len());
            for item in items {
                match item {
                    Frame::Bulk(member) => {
                        set.insert(member);
                    }
                    _ => return Err(SnapshotError::corrupt("invalid set element")),
                }
            }
            Ok(Value::Set(set))
        }
        ValueType::Hash => {
            let items = container_items(payload)?;
            if items.len() % 2 != 0 {
                return Err(SnapshotError::corrupt("invalid hash length"));
            }
            let mut hash = HashMap::with_capacity(items.len() / 2);
            let mut it = items.into_iter();
            while let (Some(field), Some(value)) = (it.next(), it.next()) {
                match (field, value) {
                    (Frame::Bulk(field), Frame::Bulk(value)) => {
                        hash.insert(field, value);
                    }
                    _ => return Err(SnapshotError::corrupt("invalid hash entry")),
                }
            }
            Ok(Value::Hash(hash))
        }
    }
}

fn container_items(payload: Frame) -> Result<Vec<Frame>, SnapshotError> {
    match payload {
        Frame::Array(items) => Ok(items),
        _ => Err(SnapshotError::corrupt("invalid container value")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn key(s: &str) -> Bytes {
        Bytes::copy_from_slice(s.as_bytes())
    }

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("mrdb-test-{}-{}", std::process::id(), name));
        path
    }

    fn populated_keyspace() -> Keyspace {
        let mut ks = Keyspace::new();
        ks.insert(key("s"), Value::string("hello"));
        ks.insert(key("n"), Value::Integer(-42));
        ks.insert(
            key("l"),
            Value::List(vec![key("a"), key("b"), key("c")].into_iter().collect()),
        );
        ks.insert(
            key("st"),
            Value::Set(vec![key("x"), key("y")].into_iter().collect()),
        );
        ks.insert(
            key("h"),
            Value::Hash(vec![(key("f1"), key("v1")), (key("f2"), key("v2"))]
                .into_iter()
                .collect()),
        );
        ks.expire_at(&key("n"), now_ms() + 120_000);
        ks
    }

    #[test]
    fn save_load_roundtrip() {
        let path = temp_path("roundtrip");
        let mut ks = populated_keyspace();

        save_to(&path, &mut ks).unwrap();
        let entries = load_from(&path).unwrap();

        let mut restored = Keyspace::new();
        restored.replace_with_snapshot(entries);

        assert_eq!(restored.len(), 5);
        assert_eq!(restored.find(b"s"), Some(&mut Value::string("hello")));
        assert_eq!(restored.find(b"n"), Some(&mut Value::Integer(-42)));
        assert!(restored.ttl(b"n").is_some());
        assert!(matches!(restored.find(b"l"), Some(Value::List(l)) if l.len() == 3));
        assert!(matches!(restored.find(b"st"), Some(Value::Set(s)) if s.len() == 2));
        assert!(matches!(restored.find(b"h"), Some(Value::Hash(h)) if h.len() == 2));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn list_order_survives_roundtrip() {
        let path = temp_path("list-order");
        let mut ks = Keyspace::new();
        ks.insert(
            key("l"),
            Value::List(vec![key("1"), key("2"), key("3")].into_iter().collect()),
        );

        save_to(&path, &mut ks).unwrap();
        let mut restored = Keyspace::new();
        restored.replace_with_snapshot(load_from(&path).unwrap());

        match restored.find(b"l") {
            Some(Value::List(items)) => {
                let got: Vec<&[u8]> = items.iter().map(|b| &b[..]).collect();
                assert_eq!(got, vec![b"1" as &[u8], b"2", b"3"]);
            }
            other => panic!("expected list, got {other:?}"),
        }

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn file_begins_with_magic_and_version() {
        let path = temp_path("magic");
        let mut ks = Keyspace::new();
        save_to(&path, &mut ks).unwrap();
        let raw = fs::read(&path).unwrap();
        assert_eq!(&raw[..5], b"MRDB\x01");
        // Empty keyspace body is the empty RESP array.
        assert_eq!(&raw[5..], b"*0\r\n");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_missing_file_fails() {
        let err = load_from(Path::new("/nonexistent/dir/nope.mrdb")).unwrap_err();
        assert!(err.to_string().starts_with("load failed: cannot read file"));
    }

    #[test]
    fn load_rejects_bad_header() {
        let path = temp_path("bad-header");
        fs::write(&path, b"XXXX\x01*0\r\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert_eq!(err.to_string(), "load failed: bad format header");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_bad_version() {
        let path = temp_path("bad-version");
        fs::write(&path, b"MRDB\x02*0\r\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert_eq!(err.to_string(), "load failed: unsupported format version");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_truncated_file() {
        let path = temp_path("short");
        fs::write(&path, b"MRD").unwrap();
        let err = load_from(&path).unwrap_err();
        assert_eq!(err.to_string(), "load failed: file is too short");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_trailing_garbage() {
        let path = temp_path("trailing");
        fs::write(&path, b"MRDB\x01*0\r\n:1\r\n").unwrap();
        let err = load_from(&path).unwrap_err();
        assert_eq!(err.to_string(), "load failed: invalid snapshot payload");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_bad_type_tag() {
        let path = temp_path("bad-tag");
        let body = b"MRDB\x01*1\r\n*5\r\n$1\r\nk\r\n:9\r\n$1\r\nv\r\n:0\r\n:0\r\n";
        fs::write(&path, body).unwrap();
        let err = load_from(&path).unwrap_err();
        assert_eq!(err.to_string(), "load failed: unknown value type");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_odd_hash_payload() {
        let path = temp_path("odd-hash");
        let body = b"MRDB\x01*1\r\n*5\r\n$1\r\nk\r\n:4\r\n*1\r\n$1\r\nf\r\n:0\r\n:0\r\n";
        fs::write(&path, body).unwrap();
        let err = load_from(&path).unwrap_err();
        assert_eq!(err.to_string(), "load failed: invalid hash length");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_bad_expire_flag() {
        let path = temp_path("bad-flag");
        let body = b"MRDB\x01*1\r\n*5\r\n$1\r\nk\r\n:0\r\n$1\r\nv\r\n:2\r\n:0\r\n";
        fs::write(&path, body).unwrap();
        let err = load_from(&path).unwrap_err();
        assert_eq!(err.to_string(), "load failed: invalid expiration flag");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_rejects_timestamp_without_flag() {
        let path = temp_path("stray-ts");
        let body = b"MRDB\x01*1\r\n*5\r\n$1\r\nk\r\n:0\r\n$1\r\nv\r\n:0\r\n:123\r\n";
        fs::write(&path, body).unwrap();
        let err = load_from(&path).unwrap_err();
        assert_eq!(err.to_string(), "load failed: malformed expiration fields");
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn load_drops_expired_entries() {
        let path = temp_path("expired");
        let mut ks = Keyspace::new();
        ks.insert(key("keep"), Value::Integer(1));
        save_to(&path, &mut ks).unwrap();

        // Splice in a second, already-expired entry by hand.
        let body = "*2\r\n*5\r\n$4\r\nkeep\r\n:1\r\n:1\r\n:0\r\n:0\r\n\
                    *5\r\n$4\r\ngone\r\n:1\r\n:2\r\n:1\r\n:1\r\n";
        let mut raw = b"MRDB\x01".to_vec();
        raw.extend_from_slice(body.as_bytes());
        fs::write(&path, raw).unwrap();

        let entries = load_from(&path).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].key, key("keep"));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_replaces_existing_file_and_clears_siblings() {
        let path = temp_path("replace");
        let mut ks = Keyspace::new();
        ks.insert(key("a"), Value::Integer(1));
        save_to(&path, &mut ks).unwrap();

        ks.insert(key("b"), Value::Integer(2));
        save_to(&path, &mut ks).unwrap();

        let entries = load_from(&path).unwrap();
        assert_eq!(entries.len(), 2);
        assert!(!sibling(&path, ".tmp").exists());
        assert!(!sibling(&path, ".bak").exists());

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn save_into_missing_directory_fails() {
        let mut ks = Keyspace::new();
        let err = save_to(Path::new("/nonexistent/dir/x.mrdb"), &mut ks).unwrap_err();
        assert!(err
            .to_string()
            .starts_with("save failed: cannot open temporary file"));
    }
}
