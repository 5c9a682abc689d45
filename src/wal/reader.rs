//! WAL Reader
//!
//! Scans WAL lines back for replay.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Take};
use std::path::Path;

use crate::error::{CacheError, Result};
use super::WalRecord;

/// One scanned WAL line
#[derive(Debug)]
pub struct WalLine {
    /// 1-based line number in the file
    pub line_no: usize,

    /// The line text (lossy if it was not UTF-8)
    pub raw: String,

    /// The parsed record, or why the line was rejected
    pub record: Result<WalRecord>,
}

/// Reads lines from the WAL file
///
/// Yields `Err` only for I/O failures; malformed lines come back as a
/// `WalLine` whose `record` is an error. Blank lines are skipped.
pub struct WalReader {
    reader: Option<BufReader<Take<File>>>,
    line_no: usize,
}

impl WalReader {
    /// Open a WAL file for reading; a missing file reads as empty
    pub fn open(path: &Path) -> Result<Self> {
        let reader = match File::open(path) {
            Ok(file) => {
                let size = file.metadata()?.len();
                Some(BufReader::new(file.take(size)))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Self { reader, line_no: 0 })
    }

    /// Read the next non-blank line
    pub fn next_line(&mut self) -> Result<Option<WalLine>> {
        let Some(reader) = self.reader.as_mut() else {
            return Ok(None);
        };

        let mut buf = Vec::new();
        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf)? == 0 {
                return Ok(None);
            }
            self.line_no += 1;

            let terminated = buf.last() == Some(&b'\n');
            let raw = String::from_utf8_lossy(&buf).trim_end().to_string();
            if raw.trim().is_empty() {
                continue;
            }

            let record = if !terminated {
                Err(CacheError::parse("incomplete trailing record"))
            } else if std::str::from_utf8(&buf).is_err() {
                Err(CacheError::parse("record is not valid UTF-8"))
            } else {
                WalRecord::parse_line(&raw)
            };

            return Ok(Some(WalLine {
                line_no: self.line_no,
                raw,
                record,
            }));
        }
    }
}

impl Iterator for WalReader {
    type Item = Result<WalLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_line().transpose()
    }
}
