//! WAL record definitions
//!
//! Defines the mutating operations that are logged.

use crate::error::{CacheError, Result};
use crate::protocol::{parse_command, Command, CommandType};

/// A single logged mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalRecord {
    /// Replace a key with one value
    Set { key: String, value: String },

    /// Replace a key with a flat value list
    HMSet { key: String, values: Vec<String> },

    /// Remove a key
    Del { key: String },
}

impl WalRecord {
    /// Build the record for a command, `None` if it does not mutate
    pub fn from_command(command: &Command) -> Option<Self> {
        match command {
            Command::Set { key, value } => Some(WalRecord::Set {
                key: key.clone(),
                value: value.clone(),
            }),
            Command::HMSet { key, values } => Some(WalRecord::HMSet {
                key: key.clone(),
                values: values.clone(),
            }),
            Command::Del { key } => Some(WalRecord::Del { key: key.clone() }),
            Command::Ping
            | Command::Get { .. }
            | Command::Subscribe { .. }
            | Command::Publish { .. } => None,
        }
    }

    /// The command this record replays as
    pub fn into_command(self) -> Command {
        match self {
            WalRecord::Set { key, value } => Command::Set { key, value },
            WalRecord::HMSet { key, values } => Command::HMSet { key, values },
            WalRecord::Del { key } => Command::Del { key },
        }
    }

    pub fn command_type(&self) -> CommandType {
        match self {
            WalRecord::Set { .. } => CommandType::Set,
            WalRecord::HMSet { .. } => CommandType::HMSet,
            WalRecord::Del { .. } => CommandType::Del,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            WalRecord::Set { key, .. } | WalRecord::HMSet { key, .. } | WalRecord::Del { key } => {
                key
            }
        }
    }

    /// Serialize as one newline-terminated line
    pub fn to_line(&self) -> String {
        let mut line = format!("{} {}", self.command_type(), self.key());
        let values = match self {
            WalRecord::Set { value, .. } => std::slice::from_ref(value),
            WalRecord::HMSet { values, .. } => values.as_slice(),
            WalRecord::Del { .. } => &[],
        };
        for value in values {
            line.push(' ');
            line.push_str(value);
        }
        line.push('\n');
        line
    }

    /// Parse one WAL line
    ///
    /// Lines that parse as a command but do not mutate (e.g. `PING`) are
    /// rejected: they never belong in the log.
    pub fn parse_line(line: &str) -> Result<Self> {
        let command = parse_command(line)?;
        let command_type = command.command_type();
        WalRecord::from_command(&command).ok_or_else(|| {
            CacheError::parse(format!("{} is not a logged command", command_type))
        })
    }
}
