//! Command validation and execution.
//!
//! The [`Processor`] owns the keyspace and executes one command at a time.
//! It runs on the server's single-writer execution context, so handlers are
//! plain synchronous methods: nothing suspends between a command starting
//! and its reply being produced.
//!
//! Handlers live in one file per command family: connection (PING),
//! strings, generic key commands, lists, and the server-level SAVE/LOAD
//! pair.

mod connection;
mod keys;
mod lists;
mod server_cmds;
mod strings;

use crate::error::CommandError;
use crate::protocol::Frame;
use crate::server::Config;
use crate::storage::Keyspace;
use bytes::Bytes;
use std::path::PathBuf;

/// A validated request: the command name plus its arguments.
///
/// Every element of the request array must be a non-null bulk string; the
/// first one is the name, kept exactly as received. Dispatch compares it
/// case-insensitively.
pub struct Command {
    name: String,
    args: Vec<Bytes>,
}

impl Command {
    /// Validate a request frame into a command.
    pub fn from_frame(frame: Frame) -> Result<Self, CommandError> {
        let items = match frame {
            Frame::Array(items) if !items.is_empty() => items,
            _ => return Err(CommandError::InvalidRequest),
        };

        let mut args = Vec::with_capacity(items.len());
        for item in items {
            match item {
                Frame::Bulk(bytes) => args.push(bytes),
                _ => return Err(CommandError::InvalidRequest),
            }
        }

        let name = String::from_utf8_lossy(&args.remove(0)).into_owned();
        Ok(Self { name, args })
    }

    /// The command name exactly as the client sent it.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command's arguments (name excluded).
    pub fn args(&self) -> &[Bytes] {
        &self.args
    }

    /// Argument `i` parsed as a signed 64-bit decimal.
    fn int_arg(&self, i: usize) -> Result<i64, CommandError> {
        std::str::from_utf8(&self.args[i])
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or(CommandError::NotInteger)
    }

    /// The arity error for this command, echoing the name as received.
    fn wrong_arity(&self) -> CommandError {
        CommandError::WrongArity(self.name.clone())
    }
}

/// The command processor.
///
/// Stateless across commands except through the keyspace it owns.
pub struct Processor {
    keyspace: Keyspace,
    dump_path: PathBuf,
}

impl Processor {
    /// Create a processor with an empty keyspace.
    pub fn new(config: &Config) -> Self {
        Self {
            keyspace: Keyspace::new(),
            dump_path: config.dump_path.clone(),
        }
    }

    /// Execute one request against the keyspace, producing its reply.
    ///
    /// Semantic failures come back as RESP error frames; this never fails
    /// outright.
    pub fn execute(&mut self, request: Frame) -> Frame {
        let command = match Command::from_frame(request) {
            Ok(command) => command,
            Err(e) => return Frame::Error(e.to_string()),
        };

        match self.dispatch(&command) {
            Ok(reply) => reply,
            Err(e) => Frame::Error(e.to_string()),
        }
    }

    fn dispatch(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        match cmd.name.to_ascii_uppercase().as_str() {
            // Connection
            "PING" => self.ping(cmd),

            // Server
            "SAVE" => self.save(cmd),
            "LOAD" => self.load(cmd),

            // Strings
            "SET" => self.set(cmd),
            "GET" => self.get(cmd),
            "INCR" => self.incr(cmd),
            "INCRBY" => self.incrby(cmd),
            "DECR" => self.decr(cmd),
            "DECRBY" => self.decrby(cmd),

            // Generic
            "DEL" => self.del(cmd),
            "EXPIRE" => self.expire(cmd),
            "PEXPIRE" => self.pexpire(cmd),
            "EXPIREAT" => self.expireat(cmd),
            "PEXPIREAT" => self.pexpireat(cmd),
            "TTL" => self.ttl(cmd),
            "PTTL" => self.pttl(cmd),

            // Lists
            "LLEN" => self.llen(cmd),
            "LINDEX" => self.lindex(cmd),
            "LRANGE" => self.lrange(cmd),
            "LSET" => self.lset(cmd),
            "LREM" => self.lrem(cmd),
            "LINSERT" => self.linsert(cmd),
            "LPUSH" => self.lpush(cmd),
            "RPUSH" => self.rpush(cmd),
            "LPOP" => self.lpop(cmd),
            "RPOP" => self.rpop(cmd),

            _ => Err(CommandError::UnknownCommand(cmd.name.clone())),
        }
    }

    /// The keyspace, for tests and snapshot plumbing.
    pub fn keyspace_mut(&mut self) -> &mut Keyspace {
        &mut self.keyspace
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[test]
    fn rejects_non_array_requests() {
        let mut p = processor();
        let reply = p.execute(Frame::simple("PING"));
        assert_eq!(
            reply,
            Frame::error("ERR Protocol error: expected array of bulk strings")
        );
        assert_eq!(
            p.execute(Frame::NullArray),
            Frame::error("ERR Protocol error: expected array of bulk strings")
        );
        assert_eq!(
            p.execute(Frame::Array(Vec::new())),
            Frame::error("ERR Protocol error: expected array of bulk strings")
        );
    }

    #[test]
    fn rejects_non_bulk_elements() {
        let mut p = processor();
        let reply = p.execute(Frame::Array(vec![Frame::bulk("GET"), Frame::Integer(1)]));
        assert_eq!(
            reply,
            Frame::error("ERR Protocol error: expected array of bulk strings")
        );
        let reply = p.execute(Frame::Array(vec![Frame::bulk("GET"), Frame::Null]));
        assert_eq!(
            reply,
            Frame::error("ERR Protocol error: expected array of bulk strings")
        );
    }

    #[test]
    fn unknown_command_preserves_case() {
        let mut p = processor();
        assert_eq!(
            run(&mut p, &["FooBar"]),
            Frame::error("ERR unknown command 'FooBar'")
        );
    }

    #[test]
    fn dispatch_is_case_insensitive() {
        let mut p = processor();
        assert_eq!(run(&mut p, &["ping"]), Frame::simple("PONG"));
        assert_eq!(run(&mut p, &["PiNg"]), Frame::simple("PONG"));
    }
}
