//! Engine Module
//!
//! The core that coordinates the Store, WAL, snapshots and pub/sub.
//!
//! ## Responsibilities
//! - Dispatch every command through one exhaustive match
//! - Log mutations to the WAL before applying them (durable path)
//! - Apply replayed mutations without re-logging them
//! - Run snapshots and the final snapshot at close
//! - Run crash recovery on open

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::protocol::{Command, Response};
use crate::pubsub::{PubSub, Subscription};
use crate::recovery::{RecoveryCoordinator, RecoveryReport};
use crate::snapshot::{SnapshotManager, SnapshotStats};
use crate::store::{Store, StoreWriteGuard};
use crate::wal::{WalRecord, WalWriter};

/// Durability gate for a dispatched command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalMode {
    /// Live traffic: mutations are appended to the WAL first
    Enabled,

    /// Replay: mutations are already in the WAL and are only applied
    Disabled,
}

/// Result of executing a command
#[derive(Debug)]
pub enum Reply {
    Pong,
    Ok,
    Values(Vec<String>),
    Subscribed(Subscription),
    Published { topic: String, delivered: usize },
}

impl Reply {
    /// Wire response for this reply
    pub fn to_response(&self) -> Response {
        match self {
            Reply::Pong => Response::Pong,
            Reply::Ok => Response::Ok,
            Reply::Values(values) => Response::Values(values.clone()),
            Reply::Subscribed(subscription) => {
                Response::Subscribed(subscription.topic().to_string())
            }
            Reply::Published { topic, .. } => Response::Published(topic.clone()),
        }
    }
}

/// The main engine
///
/// ## Lock order
/// Exactly two locks guard durable state: the Store's RwLock and the WAL
/// mutex. Whenever both are held they are nested Store → WAL, both in
/// `apply_durably` and in the snapshot path, so they cannot deadlock. Only
/// the snapshot path also takes the snapshot manager's save lock, and it
/// takes it outermost.
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// In-memory key → values mapping (internal RwLock)
    store: Store,

    /// Write-ahead log (exclusive access needed)
    wal: Mutex<WalWriter>,

    /// Snapshot writer/loader
    snapshots: SnapshotManager,

    /// Topic broker
    pubsub: PubSub,

    /// WAL appends that failed (mutation was still applied)
    wal_failures: AtomicU64,

    /// What startup recovery found
    recovery: RecoveryReport,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Create the data directory
    /// 2. Open/create the WAL (the only fatal step)
    /// 3. Load the snapshot and replay the WAL
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;

        // Step 1: Create data directory if it doesn't exist
        fs::create_dir_all(&config.data_dir)?;

        // Step 2: Open the WAL; running without it is not durable
        let wal_path = config.wal_path();
        let wal = WalWriter::open(&wal_path, config.wal_sync_strategy).map_err(|e| match e {
            CacheError::Io(source) => CacheError::WalOpen {
                path: wal_path.clone(),
                source,
            },
            other => other,
        })?;

        let mut engine = Self {
            snapshots: SnapshotManager::from_config(&config),
            pubsub: PubSub::new(config.topic_queue_capacity),
            config,
            store: Store::new(),
            wal: Mutex::new(wal),
            wal_failures: AtomicU64::new(0),
            recovery: RecoveryReport::default(),
        };

        // Step 3: Rebuild the store from snapshot + WAL
        let report = RecoveryCoordinator::new(&engine.config).recover(&engine);
        engine.recovery = report;

        Ok(engine)
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        Self::open(Config::builder().data_dir(path).build())
    }

    /// Execute a command
    ///
    /// `mode` decides whether a mutation is logged before it is applied.
    pub fn execute(&self, command: Command, mode: WalMode) -> Result<Reply> {
        // Mutations are validated by `record_for`
        if !command.is_mutating() {
            command.validate()?;
        }

        match command {
            Command::Ping => Ok(Reply::Pong),
            Command::Get { key } => Ok(Reply::Values(self.store.get(&key))),
            Command::Set { .. } | Command::HMSet { .. } | Command::Del { .. } => {
                match mode {
                    WalMode::Enabled => self.apply_durably(&command)?,
                    WalMode::Disabled => self.apply_replayed(&command)?,
                }
                Ok(Reply::Ok)
            }
            Command::Subscribe { topic } => Ok(Reply::Subscribed(self.pubsub.subscribe(&topic))),
            Command::Publish { topic, message } => {
                let delivered = self.pubsub.publish(&topic, &message.join(" "));
                Ok(Reply::Published { topic, delivered })
            }
        }
    }

    /// Log a mutation to the WAL, then apply it to the Store
    ///
    /// The Store write lock is taken first and held across the append, so
    /// WAL order matches apply order and a concurrent snapshot cannot
    /// truncate a record whose mutation it did not capture. A failed
    /// append is logged and the mutation is applied anyway.
    pub fn apply_durably(&self, command: &Command) -> Result<()> {
        let record = Self::record_for(command)?;

        let mut store = self.store.write();

        let appended = self.wal.lock().append(&record);
        if let Err(e) = appended {
            self.wal_failures.fetch_add(1, Ordering::Relaxed);
            tracing::error!(
                "WAL append failed, applying {} {} without durability: {}",
                record.command_type(),
                record.key(),
                e
            );
        }

        apply_record(&mut store, record);
        Ok(())
    }

    /// Apply a mutation that is already durable (WAL replay)
    fn apply_replayed(&self, command: &Command) -> Result<()> {
        let record = Self::record_for(command)?;
        apply_record(&mut self.store.write(), record);
        Ok(())
    }

    fn record_for(command: &Command) -> Result<WalRecord> {
        command.validate()?;
        WalRecord::from_command(command).ok_or_else(|| {
            CacheError::Parse(format!("{} does not mutate the store", command.command_type()))
        })
    }

    /// Values of `key` (empty if absent)
    pub fn get(&self, key: &str) -> Vec<String> {
        self.store.get(key)
    }

    /// Snapshot with the configured lock mode and empty the WAL
    pub fn snapshot(&self) -> Result<SnapshotStats> {
        self.snapshots.save(&self.store, &self.wal)
    }

    /// Close the engine gracefully
    ///
    /// Takes a final exclusive snapshot (which empties the WAL) and syncs
    /// the WAL. Later writes are still accepted and logged.
    pub fn close(&self) -> Result<SnapshotStats> {
        let stats = self.snapshots.save_exclusive(&self.store, &self.wal)?;
        self.wal.lock().sync()?;
        Ok(stats)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn pubsub(&self) -> &PubSub {
        &self.pubsub
    }

    /// Current WAL size in bytes
    pub fn wal_len(&self) -> u64 {
        self.wal.lock().len()
    }

    /// Records in the WAL since the last snapshot
    pub fn wal_records(&self) -> u64 {
        self.wal.lock().records_since_reset()
    }

    /// Number of WAL appends that failed since open
    pub fn wal_failures(&self) -> u64 {
        self.wal_failures.load(Ordering::Relaxed)
    }

    /// What startup recovery found
    pub fn recovery_report(&self) -> &RecoveryReport {
        &self.recovery
    }
}

fn apply_record(store: &mut StoreWriteGuard<'_>, record: WalRecord) {
    match record {
        WalRecord::Set { key, value } => store.set(key, vec![value]),
        WalRecord::HMSet { key, values } => store.set(key, values),
        WalRecord::Del { key } => store.delete(&key),
    }
}
