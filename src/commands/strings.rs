//! String commands: SET, GET, and the counter family.

use super::{Command, Processor};
use crate::error::CommandError;
use crate::protocol::Frame;
use crate::storage::Value;

/// How a SET request wants the key's expiration handled.
enum SetExpiry {
    /// No time option: clear any TTL unless KEEPTTL was given.
    Untouched,
    /// Relative, milliseconds.
    After(i64),
    /// Absolute, epoch milliseconds.
    At(i64),
}

impl Processor {
    /// `SET key value [NX|XX] [GET] [EX s|PX ms|EXAT s|PXAT ms|KEEPTTL]`
    pub(super) fn set(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let args = cmd.args();
        if args.len() < 2 {
            return Err(cmd.wrong_arity());
        }
        let key = args[0].clone();
        let value = args[1].clone();

        let mut nx = false;
        let mut xx = false;
        let mut get = false;
        let mut keepttl = false;
        let mut expiry = SetExpiry::Untouched;

        let mut i = 2;
        while i < args.len() {
            let opt = &args[i];
            if opt.eq_ignore_ascii_case(b"NX") {
                if nx || xx {
                    return Err(CommandError::Syntax);
                }
                nx = true;
            } else if opt.eq_ignore_ascii_case(b"XX") {
                if nx || xx {
                    return Err(CommandError::Syntax);
                }
                xx = true;
            } else if opt.eq_ignore_ascii_case(b"GET") {
                if get {
                    return Err(CommandError::Syntax);
                }
                get = true;
            } else if opt.eq_ignore_ascii_case(b"KEEPTTL") {
                if keepttl || !matches!(expiry, SetExpiry::Untouched) {
                    return Err(CommandError::Syntax);
                }
                keepttl = true;
            } else if opt.eq_ignore_ascii_case(b"EX")
                || opt.eq_ignore_ascii_case(b"PX")
                || opt.eq_ignore_ascii_case(b"EXAT")
                || opt.eq_ignore_ascii_case(b"PXAT")
            {
                if keepttl || !matches!(expiry, SetExpiry::Untouched) {
                    return Err(CommandError::Syntax);
                }
                i += 1;
                if i >= args.len() {
                    return Err(CommandError::Syntax);
                }
                let n = cmd.int_arg(i)?;
                if n <= 0 {
                    return Err(CommandError::NotPositive);
                }
                expiry = if opt.eq_ignore_ascii_case(b"EX") {
                    SetExpiry::After(n.saturating_mul(1000))
                } else if opt.eq_ignore_ascii_case(b"PX") {
                    SetExpiry::After(n)
                } else if opt.eq_ignore_ascii_case(b"EXAT") {
                    SetExpiry::At(n.saturating_mul(1000))
                } else {
                    SetExpiry::At(n)
                };
            } else {
                return Err(CommandError::Syntax);
            }
            i += 1;
        }

        let mut exists = false;
        let mut old = Frame::Null;
        if let Some(prior) = self.keyspace.find(&key) {
            exists = true;
            if get {
                old = match prior {
                    Value::String(s) => Frame::Bulk(s.clone()),
                    Value::Integer(n) => Frame::bulk_from_int(*n),
                    _ => return Err(CommandError::WrongType),
                };
            }
        }

        if (nx && exists) || (xx && !exists) {
            return Ok(if get { old } else { Frame::Null });
        }

        self.keyspace.insert(key.clone(), Value::String(value));
        match expiry {
            SetExpiry::After(ms) => self.keyspace.expire_after(&key, ms),
            SetExpiry::At(at) => self.keyspace.expire_at(&key, at),
            SetExpiry::Untouched => {
                if !keepttl {
                    self.keyspace.clear_expires(&key);
                }
            }
        }

        Ok(if get { old } else { Frame::ok() })
    }

    /// `GET key`
    pub(super) fn get(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let [key] = cmd.args() else {
            return Err(cmd.wrong_arity());
        };
        match self.keyspace.find(key) {
            None => Ok(Frame::Null),
            Some(Value::String(s)) => Ok(Frame::Bulk(s.clone())),
            Some(Value::Integer(n)) => Ok(Frame::bulk_from_int(*n)),
            Some(_) => Err(CommandError::WrongType),
        }
    }

    /// `INCR key`
    pub(super) fn incr(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.calc(cmd, false, i64::checked_add)
    }

    /// `INCRBY key increment`
    pub(super) fn incrby(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.calc(cmd, true, i64::checked_add)
    }

    /// `DECR key`
    pub(super) fn decr(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.calc(cmd, false, i64::checked_sub)
    }

    /// `DECRBY key decrement`
    pub(super) fn decrby(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        self.calc(cmd, true, i64::checked_sub)
    }

    /// Shared counter arithmetic.
    ///
    /// A missing key counts as zero. A `String` value must parse as a
    /// 64-bit integer and is rewritten as `Integer` in place. Overflow
    /// leaves the stored value unchanged.
    fn calc(
        &mut self,
        cmd: &Command,
        with_operand: bool,
        op: fn(i64, i64) -> Option<i64>,
    ) -> Result<Frame, CommandError> {
        let args = cmd.args();
        let expected = if with_operand { 2 } else { 1 };
        if args.len() != expected {
            return Err(cmd.wrong_arity());
        }
        let rhs = if with_operand { cmd.int_arg(1)? } else { 1 };
        let key = &args[0];

        if let Some(value) = self.keyspace.find(key) {
            let current = match value {
                Value::Integer(n) => *n,
                Value::String(s) => std::str::from_utf8(s)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or(CommandError::NotInteger)?,
                _ => return Err(CommandError::WrongType),
            };
            let next = op(current, rhs).ok_or(CommandError::Overflow)?;
            *value = Value::Integer(next);
            return Ok(Frame::Integer(next));
        }

        let next = op(0, rhs).ok_or(CommandError::Overflow)?;
        self.keyspace.insert(key.clone(), Value::Integer(next));
        Ok(Frame::Integer(next))
    }
}

#[cfg(test)]
mod tests {
    use crate::commands::testing::*;
    use crate::protocol::Frame;
    use crate::storage::Value;

    #[test]
    fn set_then_get() {
        let mut p = processor();
        assert_eq!(run(&mut p, &["SET", "foo", "bar"]), Frame::ok());
        assert_eq!(run(&mut p, &["GET", "foo"]), Frame::bulk("bar"));
    }

    #[test]
    fn get_missing_is_null() {
        let mut p = processor();
        assert_eq!(run(&mut p, &["GET", "nope"]), Frame::Null);
    }

    #[test]
    fn get_integer_formats_decimal() {
        let mut p = processor();
        run(&mut p, &["SET", "n", "41"]);
        run(&mut p, &["INCR", "n"]);
        assert_eq!(run(&mut p, &["GET", "n"]), Frame::bulk("42"));
    }

    #[test]
    fn get_on_list_is_wrongtype() {
        let mut p = processor();
        run(&mut p, &["RPUSH", "l", "a"]);
        assert_eq!(
            run(&mut p, &["GET", "l"]),
            Frame::error("WRONGTYPE Operation against a key holding the wrong kind of value")
        );
    }

    #[test]
    fn set_nx_aborts_on_existing_key() {
        let mut p = processor();
        run(&mut p, &["SET", "k", "old"]);
        assert_eq!(run(&mut p, &["SET", "k", "new", "NX"]), Frame::Null);
        assert_eq!(run(&mut p, &["GET", "k"]), Frame::bulk("old"));
    }

    #[test]
    fn set_nx_writes_missing_key() {
        let mut p = processor();
        assert_eq!(run(&mut p, &["SET", "k", "v", "NX"]), Frame::ok());
        assert_eq!(run(&mut p, &["GET", "k"]), Frame::bulk("v"));
    }

    #[test]
    fn set_xx_aborts_on_missing_key() {
        let mut p = processor();
        assert_eq!(run(&mut p, &["SET", "k", "v", "XX"]), Frame::Null);
        assert_eq!(run(&mut p, &["GET", "k"]), Frame::Null);
    }

    #[test]
    fn set_nx_xx_together_is_syntax_error() {
        let mut p = processor();
        assert_eq!(
            run(&mut p, &["SET", "k", "v", "NX", "XX"]),
            Frame::error("ERR syntax error")
        );
    }

    #[test]
    fn set_get_returns_prior_value() {
        let mut p = processor();
        run(&mut p, &["SET", "k", "old"]);
        assert_eq!(run(&mut p, &["SET", "k", "new", "GET"]), Frame::bulk("old"));
        assert_eq!(run(&mut p, &["GET", "k"]), Frame::bulk("new"));
    }

    #[test]
    fn set_get_on_missing_returns_null_and_writes() {
        let mut p = processor();
        assert_eq!(run(&mut p, &["SET", "k", "v", "GET"]), Frame::Null);
        assert_eq!(run(&mut p, &["GET", "k"]), Frame::bulk("v"));
    }

    #[test]
    fn set_get_converts_integer_prior() {
        let mut p = processor();
        run(&mut p, &["SET", "k", "42"]);
        run(&mut p, &["INCR", "k"]);
        assert_eq!(
            run(&mut p, &["SET", "k", "v", "EX", "10", "GET"]),
            Frame::bulk("43")
        );
        let ttl = p.keyspace_mut().ttl(b"k").unwrap();
        assert!(ttl > 9_000 && ttl <= 10_000);
    }

    #[test]
    fn set_get_on_list_prior_is_wrongtype_and_no_write() {
        let mut p = processor();
        run(&mut p, &["RPUSH", "l", "a"]);
        assert_eq!(
            run(&mut p, &["SET", "l", "v", "GET"]),
            Frame::error("WRONGTYPE Operation against a key holding the wrong kind of value")
        );
        assert!(matches!(
            p.keyspace_mut().find(b"l"),
            Some(Value::List(_))
        ));
    }

    #[test]
    fn set_nx_get_on_existing_returns_prior_without_write() {
        let mut p = processor();
        run(&mut p, &["SET", "k", "old"]);
        assert_eq!(
            run(&mut p, &["SET", "k", "new", "NX", "GET"]),
            Frame::bulk("old")
        );
        assert_eq!(run(&mut p, &["GET", "k"]), Frame::bulk("old"));
    }

    #[test]
    fn set_duplicate_get_is_syntax_error() {
        let mut p = processor();
        assert_eq!(
            run(&mut p, &["SET", "k", "v", "GET", "GET"]),
            Frame::error("ERR syntax error")
        );
    }

    #[test]
    fn set_keepttl_conflicts_with_time_options() {
        let mut p = processor();
        assert_eq!(
            run(&mut p, &["SET", "k", "v", "EX", "10", "KEEPTTL"]),
            Frame::error("ERR syntax error")
        );
        assert_eq!(
            run(&mut p, &["SET", "k", "v", "KEEPTTL", "PX", "10"]),
            Frame::error("ERR syntax error")
        );
    }

    #[test]
    fn set_time_option_requires_positive_integer() {
        let mut p = processor();
        assert_eq!(
            run(&mut p, &["SET", "k", "v", "EX", "abc"]),
            Frame::error("ERR value is not an integer or out of range")
        );
        assert_eq!(
            run(&mut p, &["SET", "k", "v", "EX", "0"]),
            Frame::error("ERR value is out of range, must be positive")
        );
        assert_eq!(
            run(&mut p, &["SET", "k", "v", "PX"]),
            Frame::error("ERR syntax error")
        );
    }

    #[test]
    fn set_unknown_option_is_syntax_error() {
        let mut p = processor();
        assert_eq!(
            run(&mut p, &["SET", "k", "v", "BOGUS"]),
            Frame::error("ERR syntax error")
        );
    }

    #[test]
    fn plain_set_clears_existing_ttl() {
        let mut p = processor();
        run(&mut p, &["SET", "k", "v", "EX", "100"]);
        assert!(p.keyspace_mut().ttl(b"k").is_some());
        run(&mut p, &["SET", "k", "w"]);
        assert_eq!(p.keyspace_mut().ttl(b"k"), None);
    }

    #[test]
    fn set_keepttl_preserves_existing_ttl() {
        let mut p = processor();
        run(&mut p, &["SET", "k", "v", "EX", "100"]);
        run(&mut p, &["SET", "k", "w", "KEEPTTL"]);
        assert!(p.keyspace_mut().ttl(b"k").is_some());
        assert_eq!(run(&mut p, &["GET", "k"]), Frame::bulk("w"));
    }

    #[test]
    fn set_ex_sets_ttl_case_insensitively() {
        let mut p = processor();
        assert_eq!(run(&mut p, &["SET", "k", "v", "ex", "10"]), Frame::ok());
        let ttl = p.keyspace_mut().ttl(b"k").unwrap();
        assert!(ttl > 9_000 && ttl <= 10_000);
    }

    #[test]
    fn incr_initialises_missing_key() {
        let mut p = processor();
        assert_eq!(run(&mut p, &["INCR", "n"]), Frame::Integer(1));
        assert_eq!(run(&mut p, &["INCR", "n"]), Frame::Integer(2));
    }

    #[test]
    fn decr_and_decrby() {
        let mut p = processor();
        assert_eq!(run(&mut p, &["DECR", "n"]), Frame::Integer(-1));
        assert_eq!(run(&mut p, &["DECRBY", "n", "9"]), Frame::Integer(-10));
    }

    #[test]
    fn incrby_parses_stored_string() {
        let mut p = processor();
        run(&mut p, &["SET", "n", "40"]);
        assert_eq!(run(&mut p, &["INCRBY", "n", "2"]), Frame::Integer(42));
        // The slot is now a native integer.
        assert_eq!(p.keyspace_mut().find(b"n"), Some(&mut Value::Integer(42)));
    }

    #[test]
    fn incr_non_numeric_string_is_not_integer_error() {
        let mut p = processor();
        run(&mut p, &["SET", "k", "abc"]);
        assert_eq!(
            run(&mut p, &["INCR", "k"]),
            Frame::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn incr_on_list_is_wrongtype() {
        let mut p = processor();
        run(&mut p, &["RPUSH", "l", "a"]);
        assert_eq!(
            run(&mut p, &["INCR", "l"]),
            Frame::error("WRONGTYPE Operation against a key holding the wrong kind of value")
        );
    }

    #[test]
    fn incr_overflow_leaves_value_unchanged() {
        let mut p = processor();
        run(&mut p, &["SET", "n", "9223372036854775807"]);
        assert_eq!(
            run(&mut p, &["INCR", "n"]),
            Frame::error("ERR increment or decrement would overflow")
        );
        assert_eq!(
            run(&mut p, &["GET", "n"]),
            Frame::bulk("9223372036854775807")
        );
    }

    #[test]
    fn decr_underflow_is_overflow_error() {
        let mut p = processor();
        run(&mut p, &["SET", "n", "-9223372036854775808"]);
        assert_eq!(
            run(&mut p, &["DECR", "n"]),
            Frame::error("ERR increment or decrement would overflow")
        );
    }

    #[test]
    fn decrby_min_on_missing_key_overflows() {
        let mut p = processor();
        assert_eq!(
            run(&mut p, &["DECRBY", "n", "-9223372036854775808"]),
            Frame::error("ERR increment or decrement would overflow")
        );
        // Nothing was created.
        assert_eq!(run(&mut p, &["GET", "n"]), Frame::Null);
    }

    #[test]
    fn incrby_non_integer_operand() {
        let mut p = processor();
        assert_eq!(
            run(&mut p, &["INCRBY", "n", "two"]),
            Frame::error("ERR value is not an integer or out of range")
        );
    }

    #[test]
    fn counter_arity_errors() {
        let mut p = processor();
        assert_eq!(
            run(&mut p, &["INCR", "a", "b"]),
            Frame::error("ERR wrong number of arguments for 'INCR' command")
        );
        assert_eq!(
            run(&mut p, &["INCRBY", "a"]),
            Frame::error("ERR wrong number of arguments for 'INCRBY' command")
        );
    }
}
