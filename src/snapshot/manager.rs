//! Snapshot Manager
//!
//! Writes, commits and loads snapshots, and retires the WAL.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::{Config, SnapshotLockMode};
use crate::error::Result;
use crate::store::{Store, StoreMap};
use crate::wal::WalWriter;

use super::{decode_snapshot, encode_snapshot};

/// Outcome of a committed snapshot
#[derive(Debug, Clone)]
pub struct SnapshotStats {
    /// Keys captured
    pub entries: usize,

    /// Size of the snapshot file
    pub bytes: u64,

    /// WAL records folded into this snapshot and truncated away
    pub wal_records_dropped: u64,

    /// Wall time with the Store lock held
    pub duration: Duration,
}

/// Produces and loads snapshots
///
/// ## Lock discipline
/// The Store lock is taken first and held through serialize, rename and
/// WAL truncation; the WAL mutex is taken inside it. Writers take the same
/// two locks in the same nesting, so no write can be appended to the WAL
/// and truncated away without being in the committed snapshot.
///
/// Snapshots run one at a time: `save_lock` is taken before the Store
/// lock, since two Shared-mode saves could otherwise both hold the read
/// lock and write the same temp file.
pub struct SnapshotManager {
    /// Canonical snapshot path (`data.dat`)
    path: PathBuf,

    /// Where the next snapshot is written before the rename
    tmp_path: PathBuf,

    /// Lock taken by `save`
    lock_mode: SnapshotLockMode,

    /// Held for a whole save
    save_lock: Mutex<()>,
}

impl SnapshotManager {
    pub fn new(path: impl Into<PathBuf>, tmp_path: impl Into<PathBuf>, lock_mode: SnapshotLockMode) -> Self {
        Self {
            path: path.into(),
            tmp_path: tmp_path.into(),
            lock_mode,
            save_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.snapshot_path(),
            config.snapshot_tmp_path(),
            config.snapshot_lock_mode,
        )
    }

    /// Snapshot the store with the configured lock mode, then empty the WAL
    pub fn save(&self, store: &Store, wal: &Mutex<WalWriter>) -> Result<SnapshotStats> {
        self.save_with(self.lock_mode, store, wal)
    }

    /// Snapshot holding the Store write lock (used at shutdown)
    pub fn save_exclusive(&self, store: &Store, wal: &Mutex<WalWriter>) -> Result<SnapshotStats> {
        self.save_with(SnapshotLockMode::Exclusive, store, wal)
    }

    fn save_with(
        &self,
        mode: SnapshotLockMode,
        store: &Store,
        wal: &Mutex<WalWriter>,
    ) -> Result<SnapshotStats> {
        let _saving = self.save_lock.lock();

        match mode {
            SnapshotLockMode::Exclusive => {
                let guard = store.write();
                self.commit(guard.map(), wal, Instant::now())
            }
            SnapshotLockMode::Shared => {
                let guard = store.read();
                self.commit(guard.map(), wal, Instant::now())
            }
        }
    }

    /// Called with the Store lock held
    fn commit(&self, map: &StoreMap, wal: &Mutex<WalWriter>, started: Instant) -> Result<SnapshotStats> {
        let bytes = self.write_committed(map)?;

        let wal_records_dropped = {
            let mut wal = wal.lock();
            wal.truncate_and_reset().map_err(|e| {
                tracing::error!(
                    "Snapshot committed but WAL truncation failed: {} (stale records will replay on restart)",
                    e
                );
                e
            })?
        };

        let stats = SnapshotStats {
            entries: map.len(),
            bytes,
            wal_records_dropped,
            duration: started.elapsed(),
        };

        tracing::info!(
            "Snapshot saved and WAL cleared: {} keys, {} bytes, {} WAL records dropped",
            stats.entries,
            stats.bytes,
            stats.wal_records_dropped
        );

        Ok(stats)
    }

    /// Write the temp file, fsync it and rename it over the snapshot path
    ///
    /// On failure the previous snapshot is untouched and the temp file is
    /// removed.
    fn write_committed(&self, map: &StoreMap) -> Result<u64> {
        let bytes = encode_snapshot(map)?;

        if let Err(e) = write_synced(&self.tmp_path, &bytes) {
            tracing::error!("Snapshot creation error: {}", e);
            let _ = fs::remove_file(&self.tmp_path);
            return Err(e.into());
        }

        if let Err(e) = fs::rename(&self.tmp_path, &self.path) {
            tracing::error!("Snapshot replace error: {}", e);
            let _ = fs::remove_file(&self.tmp_path);
            return Err(e.into());
        }

        if let Err(e) = sync_parent_dir(&self.path) {
            tracing::warn!("Could not fsync snapshot directory: {}", e);
        }

        Ok(bytes.len() as u64)
    }

    /// Load the committed snapshot
    ///
    /// Returns `Ok(None)` when no snapshot exists yet.
    pub fn load(&self) -> Result<Option<StoreMap>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        decode_snapshot(&bytes).map(Some)
    }

    /// Remove a temp file left by a crash before the rename
    ///
    /// Returns whether a file was removed.
    pub fn remove_stale_tmp(&self) -> Result<bool> {
        match fs::remove_file(&self.tmp_path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Move an unreadable snapshot aside as `<snapshot>.corrupt`
    ///
    /// Keeps it from being overwritten by the next snapshot.
    pub fn quarantine(&self) -> Result<PathBuf> {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".corrupt");
        let target = PathBuf::from(name);
        fs::rename(&self.path, &target)?;
        Ok(target)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn tmp_path(&self) -> &Path {
        &self.tmp_path
    }

    pub fn lock_mode(&self) -> SnapshotLockMode {
        self.lock_mode
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// fsync the directory holding `path` so the rename itself is durable
#[cfg(unix)]
fn sync_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => File::open(dir)?.sync_all(),
        _ => File::open(".")?.sync_all(),
    }
}

#[cfg(not(unix))]
fn sync_parent_dir(_path: &Path) -> io::Result<()> {
    Ok(())
}
