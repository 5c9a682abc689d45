//! CachedKV Server Binary
//!
//! Recovers the store, then serves the line protocol until Ctrl+C.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use cachedkv::config::{SnapshotLockMode, WalSyncStrategy};
use cachedkv::network::Server;
use cachedkv::snapshot::SnapshotScheduler;
use cachedkv::{Config, Engine};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{fmt, EnvFilter};

/// CachedKV Server
#[derive(Parser, Debug)]
#[command(name = "cachedkv-server")]
#[command(about = "In-memory key-value store with WAL and snapshot durability")]
#[command(version)]
struct Args {
    /// Directory holding data.wal and data.dat
    #[arg(short, long, default_value = ".")]
    data_dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "0.0.0.0:6969")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Seconds between background snapshots
    #[arg(short = 'i', long, default_value = "20")]
    snapshot_interval: u64,

    /// Store lock held by periodic snapshots
    #[arg(long, value_enum, default_value = "exclusive")]
    snapshot_lock: LockArg,

    /// When the WAL is fsynced
    #[arg(long, value_enum, default_value = "every-n")]
    wal_sync: SyncArg,

    /// Records between fsyncs for --wal-sync every-n
    #[arg(long, default_value = "100")]
    wal_sync_count: usize,

    /// Per-subscriber message queue capacity
    #[arg(long, default_value = "256")]
    topic_queue: usize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LockArg {
    Exclusive,
    Shared,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SyncArg {
    EveryWrite,
    EveryN,
    OnSnapshot,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,cachedkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("CachedKV Server v{}", cachedkv::VERSION);
    tracing::info!("Data directory: {}", args.data_dir);
    tracing::info!("Listen address: {}", args.listen);

    let wal_sync_strategy = match args.wal_sync {
        SyncArg::EveryWrite => WalSyncStrategy::EveryWrite,
        SyncArg::EveryN => WalSyncStrategy::EveryNEntries {
            count: args.wal_sync_count,
        },
        SyncArg::OnSnapshot => WalSyncStrategy::OnSnapshot,
    };
    let snapshot_lock_mode = match args.snapshot_lock {
        LockArg::Exclusive => SnapshotLockMode::Exclusive,
        LockArg::Shared => SnapshotLockMode::Shared,
    };

    // Build config from args
    let config = Config::builder()
        .data_dir(&args.data_dir)
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .snapshot_interval(Duration::from_secs(args.snapshot_interval))
        .snapshot_lock_mode(snapshot_lock_mode)
        .wal_sync_strategy(wal_sync_strategy)
        .topic_queue_capacity(args.topic_queue)
        .build();

    // Open engine (recovers snapshot + WAL)
    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized with {} keys", engine.store().len());

    let scheduler = match SnapshotScheduler::start(Arc::clone(&engine), config.snapshot_interval) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Failed to start snapshot scheduler: {}", e);
            std::process::exit(1);
        }
    };

    let mut server = Server::new(config, Arc::clone(&engine));
    if let Err(e) = server.bind() {
        tracing::error!("Could not initialize the server: {}", e);
        std::process::exit(1);
    }

    // Set up Ctrl+C handler
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
    }

    // No more snapshots race the final one
    scheduler.stop();

    match engine.close() {
        Ok(stats) => tracing::info!("Final snapshot written ({} keys)", stats.entries),
        Err(e) => tracing::error!("Final snapshot failed: {}", e),
    }

    tracing::info!("Server stopped");
}
