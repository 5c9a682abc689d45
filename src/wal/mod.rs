//! Write-Ahead Log (WAL) Module
//!
//! Durable, ordered record of accepted mutating commands since the last
//! snapshot.
//!
//! ## Responsibilities
//! - Append a record before the mutation it describes is applied
//! - Truncate to empty once a snapshot has committed
//! - Scan records back for replay on startup
//!
//! ## File Format
//! ```text
//! SET NAME GOCACHED\n
//! HMSET PERSON NAME RAJ SURNAME PATEL\n
//! DEL NAME\n
//! ```
//! One command per line in the request syntax. A final line without its
//! `\n` is a torn write and is cut off when the writer opens the file.

mod record;
mod writer;
mod reader;

pub use record::WalRecord;
pub use writer::WalWriter;
pub use reader::{WalLine, WalReader};
