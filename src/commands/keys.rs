//! Generic key commands: DEL, the EXPIRE family, TTL/PTTL.

use super::{Command, Processor};
use crate::error::CommandError;
use crate::protocol::Frame;
use crate::storage::now_ms;

/// Condition modifier for the EXPIRE family.
#[derive(Clone, Copy)]
enum ExpireCond {
    Always,
    /// Only when the key has no TTL.
    Nx,
    /// Only when the key has a TTL.
    Xx,
    /// Only when the new deadline is later than the current one.
    /// A key without a TTL counts as never expiring, so this rejects.
    Gt,
    /// Only when the new deadline is earlier than the current one,
    /// or there is none.
    Lt,
}

impl Processor {
    /// `DEL key [key ...]`
    ///
    /// Replies with the number of keys actually removed.
    pub(super) fn del(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        if cmd.args().is_empty() {
            return Err(cmd.wrong_arity());
        }
        let mut removed = 0;
        for key in cmd.args() {
            if self.keyspace.find(key).is_some() {
                self.keyspace.erase(key);
                removed += 1;
            }
        }
        Ok(Frame::Integer(removed))
    }

    /// `EXPIRE key seconds [NX|XX|GT|LT]`
    pub(super) fn expire(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.expire_impl(cmd, 1000, false)
    }

    /// `PEXPIRE key milliseconds [NX|XX|GT|LT]`
    pub(super) fn pexpire(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.expire_impl(cmd, 1, false)
    }

    /// `EXPIREAT key unix-time-seconds [NX|XX|GT|LT]`
    pub(super) fn expireat(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.expire_impl(cmd, 1000, true)
    }

    /// `PEXPIREAT key unix-time-milliseconds [NX|XX|GT|LT]`
    pub(super) fn pexpireat(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.expire_impl(cmd, 1, true)
    }

    fn expire_impl(
        &mut self,
        cmd: &Command,
        unit_ms: i64,
        absolute: bool,
    ) -> Result<Frame, CommandError> {
        let args = cmd.args();
        if args.len() != 2 && args.len() != 3 {
            return Err(cmd.wrong_arity());
        }
        let n = cmd.int_arg(1)?;
        let cond = match args.get(2) {
            None => ExpireCond::Always,
            Some(flag) if flag.eq_ignore_ascii_case(b"NX") => ExpireCond::Nx,
            Some(flag) if flag.eq_ignore_ascii_case(b"XX") => ExpireCond::Xx,
            Some(flag) if flag.eq_ignore_ascii_case(b"GT") => ExpireCond::Gt,
            Some(flag) if flag.eq_ignore_ascii_case(b"LT") => ExpireCond::Lt,
            Some(_) => return Err(CommandError::Syntax),
        };

        let key = args[0].clone();
        if self.keyspace.find(&key).is_none() {
            return Ok(Frame::Integer(0));
        }

        let now = now_ms();
        let deadline = if absolute {
            n.saturating_mul(unit_ms)
        } else {
            now.saturating_add(n.saturating_mul(unit_ms))
        };

        let current = self.keyspace.expires_at(&key);
        let allowed = match cond {
            ExpireCond::Always => true,
            ExpireCond::Nx => current.is_none(),
            ExpireCond::Xx => current.is_some(),
            ExpireCond::Gt => matches!(current, Some(at) if deadline > at),
            ExpireCond::Lt => current.map_or(true, |at| deadline < at),
        };
        if !allowed {
            return Ok(Frame::Integer(0));
        }

        if deadline <= now {
            self.keyspace.erase(&key);
            return Ok(Frame::Integer(1));
        }
        self.keyspace.expire_at(&key, deadline);
        Ok(Frame::Integer(1))
    }

    /// `TTL key`: remaining time in seconds.
    pub(super) fn ttl(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.ttl_impl(cmd, 1000)
    }

    /// `PTTL key`: remaining time in milliseconds.
    pub(super) fn pttl(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.ttl_impl(cmd, 1)
    }

    fn ttl_impl(&mut self, cmd: &Command, unit_ms: i64) -> Result<Frame, CommandError> {
        let [key] = cmd.args() else {
            return Err(cmd.wrong_arity());
        };
        if self.keyspace.find(key).is_none() {
            return Ok(Frame::Integer(-2));
        }
        let Some(remaining_ms) = self.keyspace.ttl(key) else {
            return Ok(Frame::Integer(-1));
        };
        let remaining = remaining_ms / unit_ms;
        if remaining <= 0 {
            self.keyspace.erase(key);
            return Ok(Frame::Integer(-2));
        }
        Ok(Frame::Integer(remaining))
    }
}
