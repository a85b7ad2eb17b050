//! Server commands: snapshot save and load.

use super::{Command, Processor};
use crate::error::CommandError;
use crate::persistence;
use crate::protocol::Frame;
use bytes::Bytes;
use std::path::PathBuf;
use tracing::info;

fn path_arg(arg: &Bytes) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(arg).into_owned())
}

impl Processor {
    /// `SAVE [TO path]`
    ///
    /// Writes the current snapshot, defaulting to the configured dump path.
    pub(super) fn save(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let path = match cmd.args() {
            [] => self.dump_path.clone(),
            [keyword, path] if keyword.eq_ignore_ascii_case(b"TO") => path_arg(path),
            [_, _] => return Err(CommandError::Syntax),
            _ => return Err(cmd.wrong_arity()),
        };

        persistence::save_to(&path, &mut self.keyspace)
            .map_err(|e| CommandError::Persistence(e.to_string()))?;
        info!("saved snapshot to {}", path.display());
        Ok(Frame::ok())
    }

    /// `LOAD [FROM path]`
    ///
    /// Replaces the keyspace with the snapshot's contents. On any failure
    /// the keyspace is left untouched.
    pub(super) fn load(&mut self, cmd: &Command) -> Result<Frame, CommandError> {
        let path = match cmd.args() {
            [] => self.dump_path.clone(),
            [keyword, path] if keyword.eq_ignore_ascii_case(b"FROM") => path_arg(path),
            [_, _] => return Err(CommandError::Syntax),
            _ => return Err(cmd.wrong_arity()),
        };

        let entries = persistence::load_from(&path)
            .map_err(|e| CommandError::Persistence(e.to_string()))?;
        let count = entries.len();
        self.keyspace.replace_with_snapshot(entries);
        info!("loaded {} keys from {}", count, path.display());
        Ok(Frame::ok())
    }
}
