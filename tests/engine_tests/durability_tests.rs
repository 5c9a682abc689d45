//! Tests for the durable write path
//!
//! These tests verify:
//! - Mutations are logged before they are visible
//! - Replay mode applies without logging
//! - Concurrent writers and snapshots never lose a write
//! - A failed WAL append is counted and the write still applies

use std::fs;
use std::sync::Arc;
use std::thread;

use cachedkv::config::{Config, SnapshotLockMode, WalSyncStrategy};
use cachedkv::engine::{Engine, WalMode};
use cachedkv::protocol::{Command, Response};
use tempfile::TempDir;

fn config_for(temp_dir: &TempDir, mode: SnapshotLockMode) -> Config {
    Config::builder()
        .data_dir(temp_dir.path())
        .wal_sync_strategy(WalSyncStrategy::EveryNEntries { count: 16 })
        .snapshot_lock_mode(mode)
        .build()
}

fn set(key: impl Into<String>, value: impl Into<String>) -> Command {
    Command::Set { key: key.into(), value: value.into() }
}

#[test]
fn test_enabled_mode_appends_to_wal() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_for(&temp_dir, SnapshotLockMode::Exclusive)).unwrap();

    engine.execute(set("NAME", "GOCACHED"), WalMode::Enabled).unwrap();
    engine
        .execute(
            Command::HMSet {
                key: "PERSON".to_string(),
                values: vec!["NAME".to_string(), "RAJ".to_string()],
            },
            WalMode::Enabled,
        )
        .unwrap();
    engine
        .execute(Command::Del { key: "NAME".to_string() }, WalMode::Enabled)
        .unwrap();

    assert_eq!(engine.wal_records(), 3);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("data.wal")).unwrap(),
        "SET NAME GOCACHED\nHMSET PERSON NAME RAJ\nDEL NAME\n"
    );
    assert_eq!(engine.wal_failures(), 0);
}

#[test]
fn test_disabled_mode_applies_without_logging() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_for(&temp_dir, SnapshotLockMode::Exclusive)).unwrap();

    engine.execute(set("a", "1"), WalMode::Disabled).unwrap();

    assert_eq!(engine.get("a"), vec!["1".to_string()]);
    assert_eq!(engine.wal_records(), 0);
    assert_eq!(engine.wal_len(), 0);
}

#[test]
fn test_apply_durably_rejects_reads() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_for(&temp_dir, SnapshotLockMode::Exclusive)).unwrap();

    assert!(engine.apply_durably(&Command::Ping).is_err());
    assert!(engine
        .apply_durably(&Command::Get { key: "a".to_string() })
        .is_err());
    assert_eq!(engine.wal_records(), 0);
}

#[test]
fn test_snapshot_empties_wal_and_keeps_state() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_for(&temp_dir, SnapshotLockMode::Exclusive)).unwrap();

    for i in 0..10 {
        engine.execute(set(format!("k{}", i), "v"), WalMode::Enabled).unwrap();
    }
    let stats = engine.snapshot().unwrap();

    assert_eq!(stats.entries, 10);
    assert_eq!(stats.wal_records_dropped, 10);
    assert_eq!(engine.wal_records(), 0);
    assert_eq!(engine.store().len(), 10);
}

fn concurrent_writes_survive(mode: SnapshotLockMode) {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(Engine::open(config_for(&temp_dir, mode)).unwrap());

    let writers: Vec<_> = (0..4)
        .map(|t| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for i in 0..200 {
                    engine
                        .execute(set(format!("t{}-k{}", t, i), format!("{}", i)), WalMode::Enabled)
                        .unwrap();
                }
            })
        })
        .collect();

    let snapshotter = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..20 {
                engine.snapshot().unwrap();
                thread::yield_now();
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    snapshotter.join().unwrap();

    let expected = engine.store().to_map();
    assert_eq!(expected.len(), 800);
    drop(engine);

    // Crash without a final snapshot: snapshot + WAL must cover every write
    let engine = Engine::open(config_for(&temp_dir, mode)).unwrap();
    assert_eq!(engine.store().to_map(), expected);
}

#[test]
fn test_concurrent_writes_with_exclusive_snapshots() {
    concurrent_writes_survive(SnapshotLockMode::Exclusive);
}

#[test]
fn test_concurrent_writes_with_shared_snapshots() {
    concurrent_writes_survive(SnapshotLockMode::Shared);
}

#[test]
fn test_concurrent_readers_see_whole_values() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(Engine::open(config_for(&temp_dir, SnapshotLockMode::Shared)).unwrap());
    engine
        .execute(
            Command::HMSet { key: "k".to_string(), values: vec!["a".to_string(), "a".to_string()] },
            WalMode::Enabled,
        )
        .unwrap();

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for i in 0..200 {
                let v = if i % 2 == 0 { "b" } else { "a" };
                engine
                    .execute(
                        Command::HMSet {
                            key: "k".to_string(),
                            values: vec![v.to_string(), v.to_string()],
                        },
                        WalMode::Enabled,
                    )
                    .unwrap();
            }
        })
    };

    for _ in 0..200 {
        let values = engine.get("k");
        assert_eq!(values.len(), 2);
        assert_eq!(values[0], values[1]);
    }

    writer.join().unwrap();
}

#[test]
fn test_apply_durably_validates_tokens() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_for(&temp_dir, SnapshotLockMode::Exclusive)).unwrap();

    assert!(engine.apply_durably(&set("two words", "v")).is_err());
    assert!(engine.apply_durably(&set("k", "")).is_err());
    assert!(engine
        .execute(Command::Get { key: "two words".to_string() }, WalMode::Enabled)
        .is_err());

    assert!(engine.store().is_empty());
    assert_eq!(engine.wal_records(), 0);
}

#[test]
fn test_concurrent_shared_snapshots() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Arc::new(Engine::open(config_for(&temp_dir, SnapshotLockMode::Shared)).unwrap());
    for i in 0..20_000 {
        let mode = if i % 200 == 0 { WalMode::Enabled } else { WalMode::Disabled };
        engine
            .execute(set(format!("key{}", i), format!("value{}", i)), mode)
            .unwrap();
    }
    assert_eq!(engine.wal_records(), 100);

    let snapshotters: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..20 {
                    engine.snapshot().unwrap();
                }
            })
        })
        .collect();
    for snapshotter in snapshotters {
        snapshotter.join().unwrap();
    }

    assert!(!temp_dir.path().join("data.dat.tmp").exists());
    assert_eq!(engine.wal_records(), 0);

    let expected = engine.store().to_map();
    drop(engine);

    let engine = Engine::open(config_for(&temp_dir, SnapshotLockMode::Shared)).unwrap();
    assert!(engine.recovery_report().snapshot_loaded);
    assert_eq!(engine.store().to_map(), expected);
}

/// Every write to `/dev/full` fails with ENOSPC
#[cfg(target_os = "linux")]
#[test]
fn test_failed_append_is_counted_and_still_applied() {
    let device = std::path::Path::new("/dev/full");
    if !device.exists() {
        return;
    }

    let temp_dir = TempDir::new().unwrap();
    std::os::unix::fs::symlink(device, temp_dir.path().join("data.wal")).unwrap();
    let engine = Engine::open(config_for(&temp_dir, SnapshotLockMode::Exclusive)).unwrap();

    let reply = engine.execute(set("NAME", "GOCACHED"), WalMode::Enabled).unwrap();
    assert_eq!(reply.to_response(), Response::Ok);
    assert_eq!(engine.get("NAME"), vec!["GOCACHED".to_string()]);
    assert_eq!(engine.wal_failures(), 1);

    engine
        .execute(Command::Del { key: "NAME".to_string() }, WalMode::Enabled)
        .unwrap();
    assert!(engine.get("NAME").is_empty());
    assert_eq!(engine.wal_failures(), 2);
    assert_eq!(engine.wal_records(), 0);
}
