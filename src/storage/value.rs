//! Stored value type.

use bytes::Bytes;
use std::collections::{HashMap, HashSet, VecDeque};

/// A value held in the keyspace.
///
/// A closed sum over the five storage types. `String` and `Integer` are
/// semantically convertible: arithmetic commands parse a `String` as an
/// integer and, on success, rewrite the slot as `Integer` in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Opaque byte string.
    String(Bytes),

    /// Native 64-bit signed integer.
    Integer(i64),

    /// Double-ended sequence; element order is user-visible.
    List(VecDeque<Bytes>),

    /// Unordered, de-duplicated byte strings.
    Set(HashSet<Bytes>),

    /// Unordered field-to-value mapping.
    Hash(HashMap<Bytes, Bytes>),
}

/// The tag of a stored value.
///
/// The numeric form is stable across versions: it is what the snapshot
/// format embeds as each entry's type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i64)]
pub enum ValueType {
    String = 0,
    Integer = 1,
    List = 2,
    Set = 3,
    Hash = 4,
}

impl ValueType {
    /// Decode a snapshot type tag.
    pub fn from_tag(tag: i64) -> Option<Self> {
        match tag {
            0 => Some(Self::String),
            1 => Some(Self::Integer),
            2 => Some(Self::List),
            3 => Some(Self::Set),
            4 => Some(Self::Hash),
            _ => None,
        }
    }
}

impl Value {
    /// Create a string value.
    #[inline]
    pub fn string(data: impl Into<Bytes>) -> Self {
        Self::String(data.into())
    }

    /// Returns the type of this value.
    #[inline]
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::String(_) => ValueType::String,
            Self::Integer(_) => ValueType::Integer,
            Self::List(_) => ValueType::List,
            Self::Set(_) => ValueType::Set,
            Self::Hash(_) => ValueType::Hash,
        }
    }

    /// The snapshot type tag for this value.
    #[inline]
    pub fn type_tag(&self) -> i64 {
        self.value_type() as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_are_stable() {
        assert_eq!(Value::string("x").type_tag(), 0);
        assert_eq!(Value::Integer(1).type_tag(), 1);
        assert_eq!(Value::List(VecDeque::new()).type_tag(), 2);
        assert_eq!(Value::Set(HashSet::new()).type_tag(), 3);
        assert_eq!(Value::Hash(HashMap::new()).type_tag(), 4);
    }

    #[test]
    fn tag_roundtrip() {
        for tag in 0..5 {
            assert_eq!(ValueType::from_tag(tag).unwrap() as i64, tag);
        }
        assert!(ValueType::from_tag(5).is_none());
        assert!(ValueType::from_tag(-1).is_none());
    }
}
