//! Protocol Module
//!
//! Defines the line-oriented text protocol between clients and the server.
//!
//! ## Request Format
//! ```text
//! COMMAND [KEY] [VALUE ...]\n
//! ```
//! Tokens are whitespace separated, the command name is case-insensitive,
//! and CR/LF inside a request count as whitespace.
//!
//! ### Commands
//! | Command                 | Min tokens |
//! |-------------------------|------------|
//! | `PING`                  | 1          |
//! | `GET key`               | 2          |
//! | `SET key value`         | 3          |
//! | `HMSET key v1 v2 ...`   | 3          |
//! | `DEL key`               | 2          |
//! | `SUBSCRIBE topic`       | 2          |
//! | `PUBLISH topic msg ...` | 3          |
//!
//! ## Response Format
//! One text line per request: `PONG`, `OK`, the space-joined values of a
//! key (empty line if absent), `Subscribed to <topic>`,
//! `Message published to <topic>` or `Invalid command`.
//!
//! The WAL stores mutating commands in exactly the request format, so the
//! same parser is used for live traffic and for replay.

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::Response;
pub use codec::{encode_command, parse_command, read_line, write_line, MAX_LINE_SIZE};
