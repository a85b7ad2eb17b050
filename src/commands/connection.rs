//! Connection commands.

use super::{Command, Processor};
use crate::error::CommandError;
use crate::protocol::Frame;

impl Processor {
    /// `PING [message]`
    ///
    /// Replies `+PONG` without an argument, or echoes the argument as a
    /// bulk string.
    pub(super) fn ping(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        match cmd.args() {
            [] => Ok(Frame::simple("PONG")),
            [msg] => Ok(Frame::Bulk(msg.clone())),
            _ => Err(cmd.wrong_arity()),
        }
    }
}
