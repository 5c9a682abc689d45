//! WAL Writer
//!
//! Handles appending records to the WAL file.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::config::WalSyncStrategy;
use crate::error::Result;
use super::WalRecord;

/// Writes records to the WAL file
///
/// Not internally synchronized: the engine keeps it behind a mutex that is
/// shared by `append` and `truncate_and_reset`.
pub struct WalWriter {
    /// Append-mode file handle
    file: File,

    /// Location of the log
    path: PathBuf,

    /// When to fsync
    sync_strategy: WalSyncStrategy,

    /// Records in the file since open or the last truncation
    records: u64,

    /// Records appended since the last fsync
    uncommitted: usize,

    /// Current file length in bytes
    len: u64,

    /// Bytes of torn tail cut off at open
    torn_bytes_removed: u64,

    /// A failed write left bytes past `len` that could not be cut off yet
    needs_repair: bool,
}

impl WalWriter {
    /// Open or create a WAL file
    ///
    /// A trailing partial line (a write torn by a crash) is truncated so
    /// that the next append starts on a fresh line.
    pub fn open(path: &Path, sync_strategy: WalSyncStrategy) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .read(true)
            .open(path)?;

        // Only the bytes present now; a device file would read forever
        let size = file.metadata()?.len();
        let mut contents = Vec::new();
        (&file).take(size).read_to_end(&mut contents)?;
        let complete_len = match contents.iter().rposition(|&b| b == b'\n') {
            Some(pos) => pos + 1,
            None => 0,
        };
        let torn_bytes_removed = (contents.len() - complete_len) as u64;

        if torn_bytes_removed > 0 {
            tracing::warn!(
                "WAL {} ends with a partial record, truncating {} bytes",
                path.display(),
                torn_bytes_removed
            );
            file.set_len(complete_len as u64)?;
            file.sync_all()?;
        }

        let records = contents[..complete_len]
            .split(|&b| b == b'\n')
            .filter(|line| !line.iter().all(u8::is_ascii_whitespace))
            .count() as u64;

        Ok(Self {
            file,
            path: path.to_path_buf(),
            sync_strategy,
            records,
            uncommitted: 0,
            len: complete_len as u64,
            torn_bytes_removed,
            needs_repair: false,
        })
    }

    /// Append a record to the WAL
    ///
    /// Returns the record's 1-based position since the last truncation.
    /// A write that fails partway is cut back off the file, so the next
    /// record still starts on its own line.
    pub fn append(&mut self, record: &WalRecord) -> Result<u64> {
        if self.needs_repair {
            self.file.set_len(self.len)?;
            self.needs_repair = false;
        }

        let line = record.to_line();
        if let Err(e) = self.file.write_all(line.as_bytes()) {
            self.discard_partial_write();
            return Err(e.into());
        }

        self.len += line.len() as u64;
        self.records += 1;
        self.uncommitted += 1;

        let should_sync = match self.sync_strategy {
            WalSyncStrategy::EveryWrite => true,
            WalSyncStrategy::EveryNEntries { count } => self.uncommitted >= count,
            WalSyncStrategy::OnSnapshot => false,
        };
        if should_sync {
            self.sync()?;
        }

        Ok(self.records)
    }

    /// Cut the file back to the end of the last complete record
    fn discard_partial_write(&mut self) {
        if let Err(e) = self.file.set_len(self.len) {
            tracing::error!(
                "Could not remove partial record from WAL {}: {}",
                self.path.display(),
                e
            );
            self.needs_repair = true;
        }
    }

    /// Force sync to disk
    pub fn sync(&mut self) -> Result<()> {
        self.file.sync_data()?;
        self.uncommitted = 0;
        Ok(())
    }

    /// Empty the log after a committed snapshot
    ///
    /// Returns how many records were dropped.
    pub fn truncate_and_reset(&mut self) -> Result<u64> {
        self.file.set_len(0)?;
        self.file.seek(SeekFrom::Start(0))?;
        self.file.sync_all()?;

        let dropped = self.records;
        self.needs_repair = false;
        self.records = 0;
        self.uncommitted = 0;
        self.len = 0;
        Ok(dropped)
    }

    /// Records written since open or the last truncation
    pub fn records_since_reset(&self) -> u64 {
        self.records
    }

    /// Records not yet fsynced
    pub fn uncommitted_count(&self) -> usize {
        self.uncommitted
    }

    /// Current size of the log in bytes
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Bytes of torn tail removed when the log was opened
    pub fn torn_bytes_removed(&self) -> u64 {
        self.torn_bytes_removed
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
