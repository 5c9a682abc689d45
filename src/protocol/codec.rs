//! Protocol codec
//!
//! Parsing and rendering of request lines, plus stream helpers shared by
//! the server connection and the client.

use std::io::{BufRead, Read, Write};

use crate::error::{CacheError, Result};
use super::{Command, CommandType};

/// Maximum accepted line length (1 MB)
pub const MAX_LINE_SIZE: usize = 1024 * 1024;

// =============================================================================
// Command Parsing/Rendering
// =============================================================================

/// Parse a request (or WAL) line into a command
///
/// CR and LF are treated as whitespace. Tokens past the arity of
/// PING/GET/SET/DEL/SUBSCRIBE are ignored.
pub fn parse_command(line: &str) -> Result<Command> {
    let args: Vec<&str> = line.split_whitespace().collect();

    let name = match args.first() {
        Some(name) => *name,
        None => return Err(CacheError::parse("empty command")),
    };

    let command_type = CommandType::from_name(name)
        .ok_or_else(|| CacheError::parse(format!("unknown command: {}", name)))?;

    if args.len() < command_type.min_tokens() {
        let missing = if args.len() >= 2 { "value" } else { "key" };
        return Err(CacheError::parse(format!(
            "{}: missing {}",
            command_type, missing
        )));
    }

    let key = || args[1].to_string();
    let rest = || args[2..].iter().map(|s| s.to_string()).collect::<Vec<_>>();

    let command = match command_type {
        CommandType::Ping => Command::Ping,
        CommandType::Get => Command::Get { key: key() },
        CommandType::Set => Command::Set {
            key: key(),
            value: args[2].to_string(),
        },
        CommandType::HMSet => Command::HMSet {
            key: key(),
            values: rest(),
        },
        CommandType::Del => Command::Del { key: key() },
        CommandType::Subscribe => Command::Subscribe { topic: key() },
        CommandType::Publish => Command::Publish {
            topic: key(),
            message: rest(),
        },
    };

    Ok(command)
}

/// Render a command as a single line (no trailing newline)
///
/// `parse_command(&encode_command(cmd)) == cmd` for every valid command.
pub fn encode_command(command: &Command) -> String {
    let mut line = String::from(command.command_type().as_str());
    if let Some(key) = command.key() {
        line.push(' ');
        line.push_str(key);
    }
    for value in command.values() {
        line.push(' ');
        line.push_str(value);
    }
    line
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one `\n`-terminated line, without the line terminator
///
/// Returns `Ok(None)` at end of stream. A line longer than
/// `MAX_LINE_SIZE` is a connection error: the rest of the stream can no
/// longer be framed.
pub fn read_line<R: BufRead>(reader: &mut R) -> Result<Option<String>> {
    let mut buf = Vec::new();
    let read = reader
        .by_ref()
        .take(MAX_LINE_SIZE as u64 + 1)
        .read_until(b'\n', &mut buf)?;

    if read == 0 {
        return Ok(None);
    }
    if buf.len() > MAX_LINE_SIZE {
        return Err(CacheError::Connection(format!(
            "line exceeds {} bytes",
            MAX_LINE_SIZE
        )));
    }

    while matches!(buf.last(), Some(b'\n') | Some(b'\r')) {
        buf.pop();
    }

    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| CacheError::parse("request is not valid UTF-8"))
}

/// Write `line` followed by a newline and flush
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> Result<()> {
    writer.write_all(line.as_bytes())?;
    if !line.ends_with('\n') {
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}
