//! Configuration for CachedKV
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Main configuration for a CachedKV instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── data.wal         (write-ahead log, one command per line)
    ///     ├── data.dat         (latest committed snapshot)
    ///     └── data.dat.tmp     (snapshot being written, renamed on commit)
    pub data_dir: PathBuf,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // Snapshot Configuration
    // -------------------------------------------------------------------------
    /// Interval between background snapshots
    pub snapshot_interval: Duration,

    /// Which Store lock a periodic snapshot holds while it runs
    pub snapshot_lock_mode: SnapshotLockMode,

    // -------------------------------------------------------------------------
    // Pub/Sub Configuration
    // -------------------------------------------------------------------------
    /// Capacity of each subscriber's delivery queue
    pub topic_queue_capacity: usize,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N unsynced entries (balanced durability/performance)
    EveryNEntries { count: usize },

    /// fsync only when the WAL is truncated or closed
    OnSnapshot,
}

/// Store lock held by a snapshot for its whole serialize-rename-truncate run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotLockMode {
    /// Write lock: readers and writers wait
    #[default]
    Exclusive,

    /// Read lock: writers wait, readers proceed
    Shared,
}

impl Config {
    const WAL_FILENAME: &'static str = "data.wal";
    const SNAPSHOT_FILENAME: &'static str = "data.dat";
    const SNAPSHOT_TMP_FILENAME: &'static str = "data.dat.tmp";

    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Path of the write-ahead log
    pub fn wal_path(&self) -> PathBuf {
        self.data_dir.join(Self::WAL_FILENAME)
    }

    /// Path of the committed snapshot
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(Self::SNAPSHOT_FILENAME)
    }

    /// Path a snapshot is written to before it is renamed into place
    pub fn snapshot_tmp_path(&self) -> PathBuf {
        self.data_dir.join(Self::SNAPSHOT_TMP_FILENAME)
    }

    /// Reject settings the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.snapshot_interval.is_zero() {
            return Err(CacheError::Config(
                "snapshot interval must be greater than zero".to_string(),
            ));
        }
        if self.topic_queue_capacity == 0 {
            return Err(CacheError::Config(
                "topic queue capacity must be greater than zero".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(CacheError::Config(
                "max connections must be greater than zero".to_string(),
            ));
        }
        if let WalSyncStrategy::EveryNEntries { count: 0 } = self.wal_sync_strategy {
            return Err(CacheError::Config(
                "WAL sync entry count must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            snapshot_interval: Duration::from_secs(20),
            snapshot_lock_mode: SnapshotLockMode::Exclusive,
            topic_queue_capacity: 256,
            listen_addr: "0.0.0.0:6969".to_string(),
            max_connections: 1024,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
        }
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the background snapshot interval
    pub fn snapshot_interval(mut self, interval: Duration) -> Self {
        self.config.snapshot_interval = interval;
        self
    }

    /// Set the lock mode used by periodic snapshots
    pub fn snapshot_lock_mode(mut self, mode: SnapshotLockMode) -> Self {
        self.config.snapshot_lock_mode = mode;
        self
    }

    /// Set the per-subscriber queue capacity
    pub fn topic_queue_capacity(mut self, capacity: usize) -> Self {
        self.config.topic_queue_capacity = capacity;
        self
    }

    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
