//! Recovery Module
//!
//! Rebuilds the Store on startup from the last snapshot plus the WAL.
//!
//! ## Steps
//! 1. Remove a temp snapshot left by a crash before its rename
//! 2. Load `data.dat` into the Store under the write lock (absent or
//!    corrupt snapshot → empty Store)
//! 3. Replay every well-formed `data.wal` line through
//!    `Engine::execute(.., WalMode::Disabled)`; malformed lines are skipped
//!
//! The WAL is left as is; only the next snapshot truncates it.

use std::path::PathBuf;

use crate::config::Config;
use crate::engine::{Engine, WalMode};
use crate::snapshot::SnapshotManager;
use crate::wal::WalReader;

/// Result of a recovery run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecoveryReport {
    /// A snapshot was found and decoded
    pub snapshot_loaded: bool,

    /// A snapshot was found but could not be read or decoded
    pub snapshot_corrupt: bool,

    /// Where an unreadable snapshot was moved to
    pub snapshot_quarantined: Option<PathBuf>,

    /// Keys restored from the snapshot
    pub snapshot_entries: usize,

    /// WAL records applied
    pub records_replayed: u64,

    /// WAL lines skipped as malformed
    pub lines_skipped: u64,

    /// A leftover temp snapshot was deleted
    pub stale_tmp_removed: bool,

    /// Reading the WAL failed partway; later records were not replayed
    pub scan_aborted: bool,
}

/// Coordinates snapshot load and WAL replay
pub struct RecoveryCoordinator {
    wal_path: PathBuf,
    snapshots: SnapshotManager,
}

impl RecoveryCoordinator {
    pub fn new(config: &Config) -> Self {
        Self {
            wal_path: config.wal_path(),
            snapshots: SnapshotManager::from_config(config),
        }
    }

    /// Restore `engine`'s store
    ///
    /// Never fails: every problem short of a missing WAL handle (checked
    /// by `Engine::open`) is logged and recovery carries on.
    pub fn recover(&self, engine: &Engine) -> RecoveryReport {
        let mut report = RecoveryReport::default();

        match self.snapshots.remove_stale_tmp() {
            Ok(true) => {
                tracing::warn!(
                    "Removed incomplete snapshot {}",
                    self.snapshots.tmp_path().display()
                );
                report.stale_tmp_removed = true;
            }
            Ok(false) => {}
            Err(e) => tracing::warn!("Could not remove incomplete snapshot: {}", e),
        }

        self.load_snapshot(engine, &mut report);
        self.replay_wal(engine, &mut report);

        tracing::info!(
            "Recovery complete: {} keys from snapshot, {} WAL records replayed, {} lines skipped",
            report.snapshot_entries,
            report.records_replayed,
            report.lines_skipped
        );

        report
    }

    fn load_snapshot(&self, engine: &Engine, report: &mut RecoveryReport) {
        match self.snapshots.load() {
            Ok(Some(map)) => {
                report.snapshot_loaded = true;
                report.snapshot_entries = map.len();
                engine.store().write().replace_all(map);
                tracing::info!("Snapshot loaded successfully.");
            }
            Ok(None) => {
                tracing::info!("No snapshot found, starting with an empty store");
            }
            Err(e) => {
                report.snapshot_corrupt = true;
                engine.store().write().clear();
                tracing::warn!(
                    "Snapshot {} unreadable, starting with an empty store: {}",
                    self.snapshots.path().display(),
                    e
                );
                match self.snapshots.quarantine() {
                    Ok(target) => {
                        tracing::warn!("Moved unreadable snapshot to {}", target.display());
                        report.snapshot_quarantined = Some(target);
                    }
                    Err(e) => tracing::warn!("Could not move unreadable snapshot aside: {}", e),
                }
            }
        }
    }

    fn replay_wal(&self, engine: &Engine, report: &mut RecoveryReport) {
        let reader = match WalReader::open(&self.wal_path) {
            Ok(reader) => reader,
            Err(e) => {
                tracing::error!("Error reading WAL: {}", e);
                report.scan_aborted = true;
                return;
            }
        };

        for line in reader {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    tracing::error!("Error reading WAL: {}", e);
                    report.scan_aborted = true;
                    break;
                }
            };

            let record = match line.record {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(
                        "Skipping malformed WAL line {} {:?}: {}",
                        line.line_no,
                        line.raw,
                        e
                    );
                    report.lines_skipped += 1;
                    continue;
                }
            };

            tracing::trace!("Restored command: {}", line.raw);

            match engine.execute(record.into_command(), WalMode::Disabled) {
                Ok(_) => report.records_replayed += 1,
                Err(e) => {
                    tracing::warn!("Error restoring WAL line {}: {}", line.line_no, e);
                    report.lines_skipped += 1;
                }
            }
        }
    }
}
