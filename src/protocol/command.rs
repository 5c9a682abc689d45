//! Command definitions
//!
//! Represents commands from clients (and replayed WAL lines).

use crate::error::{CacheError, Result};

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Ping,
    Get,
    Set,
    HMSet,
    Del,
    Subscribe,
    Publish,
}

impl CommandType {
    /// Every command type, in wire-table order
    pub const ALL: [CommandType; 7] = [
        CommandType::Ping,
        CommandType::Get,
        CommandType::Set,
        CommandType::HMSet,
        CommandType::Del,
        CommandType::Subscribe,
        CommandType::Publish,
    ];

    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandType::Ping => "PING",
            CommandType::Get => "GET",
            CommandType::Set => "SET",
            CommandType::HMSet => "HMSET",
            CommandType::Del => "DEL",
            CommandType::Subscribe => "SUBSCRIBE",
            CommandType::Publish => "PUBLISH",
        }
    }

    /// Look up a command by name, ignoring case
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|ty| ty.as_str().eq_ignore_ascii_case(name))
    }

    /// Minimum number of tokens (including the command name)
    pub fn min_tokens(&self) -> usize {
        match self {
            CommandType::Ping => 1,
            CommandType::Get | CommandType::Del | CommandType::Subscribe => 2,
            CommandType::Set | CommandType::HMSet | CommandType::Publish => 3,
        }
    }

    /// Whether the command changes the Store (and is therefore logged)
    pub fn is_mutating(&self) -> bool {
        matches!(self, CommandType::Set | CommandType::HMSet | CommandType::Del)
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Health check
    Ping,

    /// Read the values of a key
    Get { key: String },

    /// Replace a key with a single value
    Set { key: String, value: String },

    /// Replace a key with a flat field/value list (pairing is not checked)
    HMSet { key: String, values: Vec<String> },

    /// Remove a key
    Del { key: String },

    /// Register the issuing connection for a topic
    Subscribe { topic: String },

    /// Fan a message out to a topic's subscribers
    Publish { topic: String, message: Vec<String> },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Ping => CommandType::Ping,
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::HMSet { .. } => CommandType::HMSet,
            Command::Del { .. } => CommandType::Del,
            Command::Subscribe { .. } => CommandType::Subscribe,
            Command::Publish { .. } => CommandType::Publish,
        }
    }

    pub fn is_mutating(&self) -> bool {
        self.command_type().is_mutating()
    }

    /// The key (or topic) token, if the command has one
    pub fn key(&self) -> Option<&str> {
        match self {
            Command::Ping => None,
            Command::Get { key }
            | Command::Set { key, .. }
            | Command::HMSet { key, .. }
            | Command::Del { key } => Some(key),
            Command::Subscribe { topic } | Command::Publish { topic, .. } => Some(topic),
        }
    }

    /// The value tokens following the key
    pub fn values(&self) -> &[String] {
        match self {
            Command::Set { value, .. } => std::slice::from_ref(value),
            Command::HMSet { values, .. } => values,
            Command::Publish { message, .. } => message,
            Command::Ping | Command::Get { .. } | Command::Del { .. } | Command::Subscribe { .. } => &[],
        }
    }

    /// Check that the command survives a round trip through the line format.
    ///
    /// Commands produced by `parse_command` always pass. A command built in
    /// code with an empty token, or a token containing whitespace, would be
    /// split differently when its WAL line is replayed.
    pub fn validate(&self) -> Result<()> {
        if let Some(key) = self.key() {
            check_token(key)?;
        }

        let values = self.values();
        let required = self.command_type().min_tokens().saturating_sub(2);
        if values.len() < required {
            return Err(CacheError::parse(format!(
                "{}: missing values",
                self.command_type()
            )));
        }

        values.iter().try_for_each(|v| check_token(v))
    }
}

fn check_token(token: &str) -> Result<()> {
    if token.is_empty() {
        return Err(CacheError::parse("empty token"));
    }
    if token.chars().any(char::is_whitespace) {
        return Err(CacheError::parse(format!(
            "token contains whitespace: {:?}",
            token
        )));
    }
    Ok(())
}
