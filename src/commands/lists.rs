//! List commands.
//!
//! Every command here replies WRONGTYPE when the key holds a non-list
//! value. An empty list never stays in the store: the command that drains
//! the last element also deletes the key.

use super::{Command, Processor};
use crate::error::CommandError;
use crate::protocol::Frame;
use crate::storage::Value;
use bytes::Bytes;
use std::collections::VecDeque;

fn as_list(value: &mut Value) -> Result<&mut VecDeque<Bytes>, CommandError> {
    match value {
        Value::List(list) => Ok(list),
        _ => Err(CommandError::WrongType),
    }
}

/// Resolve a possibly-negative index against a list of `len` elements.
fn resolve_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let absolute = if index < 0 { index + len } else { index };
    (0..len).contains(&absolute).then_some(absolute as usize)
}

impl Processor {
    /// `LLEN key`
    pub(super) fn llen(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let [key] = cmd.args() else {
            return Err(cmd.wrong_arity());
        };
        match self.keyspace.find(key) {
            None => Ok(Frame::Integer(0)),
            Some(value) => Ok(Frame::Integer(as_list(value)?.len() as i64)),
        }
    }

    /// `LINDEX key index`
    pub(super) fn lindex(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let [key, _] = cmd.args() else {
            return Err(cmd.wrong_arity());
        };
        let index = cmd.int_arg(1)?;
        let Some(value) = self.keyspace.find(key) else {
            return Ok(Frame::Null);
        };
        let list = as_list(value)?;
        match resolve_index(index, list.len()) {
            Some(at) => Ok(Frame::Bulk(list[at].clone())),
            None => Ok(Frame::Null),
        }
    }

    /// `LRANGE key start stop`
    ///
    /// Inclusive range with negative indices counted from the tail; the
    /// bounds are clamped, so an inverted or out-of-window range is just
    /// the empty array.
    pub(super) fn lrange(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let [key, _, _] = cmd.args() else {
            return Err(cmd.wrong_arity());
        };
        let start = cmd.int_arg(1)?;
        let stop = cmd.int_arg(2)?;
        let Some(value) = self.keyspace.find(key) else {
            return Ok(Frame::Array(Vec::new()));
        };
        let list = as_list(value)?;
        let len = list.len() as i64;

        let mut start = if start < 0 { start + len } else { start };
        let mut stop = if stop < 0 { stop + len } else { stop };
        if start < 0 {
            start = 0;
        }
        if stop >= len {
            stop = len - 1;
        }
        if start > stop || len == 0 {
            return Ok(Frame::Array(Vec::new()));
        }

        let items = list
            .iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .map(|elt| Frame::Bulk(elt.clone()))
            .collect();
        Ok(Frame::Array(items))
    }

    /// `LSET key index element`
    pub(super) fn lset(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let [key, _, element] = cmd.args() else {
            return Err(cmd.wrong_arity());
        };
        let element = element.clone();
        let index = cmd.int_arg(1)?;
        let Some(value) = self.keyspace.find(key) else {
            return Err(CommandError::NoSuchKey);
        };
        let list = as_list(value)?;
        match resolve_index(index, list.len()) {
            Some(at) => {
                list[at] = element;
                Ok(Frame::ok())
            }
            None => Err(CommandError::IndexOutOfRange),
        }
    }

    /// `LREM key count element`
    ///
    /// A positive count scans head to tail, negative tail to head, zero
    /// removes every match.
    pub(super) fn lrem(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let [key, _, element] = cmd.args() else {
            return Err(cmd.wrong_arity());
        };
        let element = element.clone();
        let count = cmd.int_arg(1)?;

        let mut removed: i64 = 0;
        let mut emptied = false;
        if let Some(value) = self.keyspace.find(key) {
            let list = as_list(value)?;
            let limit = if count == 0 {
                usize::MAX
            } else {
                usize::try_from(count.unsigned_abs()).unwrap_or(usize::MAX)
            };

            let mut kept = VecDeque::with_capacity(list.len());
            if count >= 0 {
                for item in list.drain(..) {
                    if (removed as usize) < limit && item == element {
                        removed += 1;
                    } else {
                        kept.push_back(item);
                    }
                }
            } else {
                for item in list.drain(..).rev() {
                    if (removed as usize) < limit && item == element {
                        removed += 1;
                    } else {
                        kept.push_front(item);
                    }
                }
            }
            *list = kept;
            emptied = list.is_empty();
        }
        if emptied {
            self.keyspace.erase(key);
        }
        Ok(Frame::Integer(removed))
    }

    /// `LINSERT key BEFORE|AFTER pivot element`
    pub(super) fn linsert(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let [key, place, pivot, element] = cmd.args() else {
            return Err(cmd.wrong_arity());
        };
        let before = if place.eq_ignore_ascii_case(b"BEFORE") {
            true
        } else if place.eq_ignore_ascii_case(b"AFTER") {
            false
        } else {
            return Err(CommandError::Syntax);
        };
        let element = element.clone();

        let Some(value) = self.keyspace.find(key) else {
            return Ok(Frame::Integer(0));
        };
        let list = as_list(value)?;
        let Some(at) = list.iter().position(|item| item == pivot) else {
            return Ok(Frame::Integer(-1));
        };
        list.insert(if before { at } else { at + 1 }, element);
        Ok(Frame::Integer(list.len() as i64))
    }

    /// `LPUSH key element [element ...]`
    pub(super) fn lpush(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.push_impl(cmd, true)
    }

    /// `RPUSH key element [element ...]`
    pub(super) fn rpush(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.push_impl(cmd, false)
    }

    fn push_impl(&mut self, cmd: &Command, front: bool) -> Result<Frame, CommandError> {
        let args = cmd.args();
        if args.len() < 2 {
            return Err(cmd.wrong_arity());
        }
        let key = &args[0];
        let elements = &args[1..];

        if let Some(value) = self.keyspace.find(key) {
            let list = as_list(value)?;
            for elt in elements {
                if front {
                    list.push_front(elt.clone());
                } else {
                    list.push_back(elt.clone());
                }
            }
            return Ok(Frame::Integer(list.len() as i64));
        }

        let mut list = VecDeque::with_capacity(elements.len());
        for elt in elements {
            if front {
                list.push_front(elt.clone());
            } else {
                list.push_back(elt.clone());
            }
        }
        let len = list.len() as i64;
        self.keyspace.insert(key.clone(), Value::List(list));
        Ok(Frame::Integer(len))
    }

    /// `LPOP key [count]`
    pub(super) fn lpop(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.pop_impl(cmd, true)
    }

    /// `RPOP key [count]`
    pub(super) fn rpop(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.pop_impl(cmd, false)
    }

    fn pop_impl(&mut self, cmd: &Command, front: bool) -> Result<Frame, CommandError> {
        let args = cmd.args();
        let count = match args.len() {
            1 => None,
            2 => {
                let n = cmd.int_arg(1)?;
                if n <= 0 {
                    return Err(CommandError::NotPositive);
                }
                Some(usize::try_from(n).unwrap_or(usize::MAX))
            }
            _ => return Err(cmd.wrong_arity()),
        };
        let key = &args[0];

        let reply;
        let emptied;
        if let Some(value) = self.keyspace.find(key) {
            let list = as_list(value)?;
            reply = match count {
                None => {
                    let elt = if front {
                        list.pop_front()
                    } else {
                        list.pop_back()
                    };
                    match elt {
                        Some(elt) => Frame::Bulk(elt),
                        None => Frame::Null,
                    }
                }
                Some(count) => {
                    let take = count.min(list.len());
                    let mut popped = Vec::with_capacity(take);
                    for _ in 0..take {
                        let elt = if front {
                            list.pop_front()
                        } else {
                            list.pop_back()
                        };
                        match elt {
                            Some(elt) => popped.push(Frame::Bulk(elt)),
                            None => break,
                        }
                    }
                    Frame::Array(popped)
                }
            };
            emptied = list.is_empty();
        } else {
            return Ok(match count {
                None => Frame::Null,
                Some(_) => Frame::NullArray,
            });
        }

        if emptied {
            self.keyspace.erase(key);
        }
        Ok(reply)
    }
}
