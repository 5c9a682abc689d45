//! Tests for crash recovery
//!
//! These tests verify:
//! - State survives a crash with no snapshot (WAL only)
//! - State survives a crash after a snapshot (snapshot + WAL)
//! - Damaged files degrade recovery instead of failing it
//! - Recovery never rewrites the WAL

use std::fs;
use std::path::Path;

use cachedkv::config::{Config, WalSyncStrategy};
use cachedkv::engine::{Engine, WalMode};
use cachedkv::protocol::{parse_command, Command};
use cachedkv::recovery::RecoveryReport;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(dir: &Path) -> Config {
    Config::builder()
        .data_dir(dir)
        .wal_sync_strategy(WalSyncStrategy::EveryWrite)
        .build()
}

fn run(engine: &Engine, line: &str) {
    engine
        .execute(parse_command(line).unwrap(), WalMode::Enabled)
        .unwrap();
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

// =============================================================================
// Crash Simulation Tests
// =============================================================================

#[test]
fn test_recover_from_wal_only() {
    let temp_dir = TempDir::new().unwrap();

    let before = {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        for i in 0..100 {
            run(&engine, &format!("SET key{} value{}", i, i));
        }
        run(&engine, "HMSET PERSON NAME RAJ SURNAME PATEL");
        run(&engine, "DEL key7");
        engine.store().to_map()
        // Dropped without close: simulates a crash
    };

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();
    let report = engine.recovery_report();

    assert!(!report.snapshot_loaded);
    assert_eq!(report.records_replayed, 102);
    assert_eq!(engine.store().to_map(), before);
    assert!(engine.get("key7").is_empty());
}

#[test]
fn test_recover_from_snapshot_plus_wal() {
    let temp_dir = TempDir::new().unwrap();

    let before = {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        run(&engine, "SET NAME GOCACHED");
        run(&engine, "SET CITY PUNE");
        engine.snapshot().unwrap();

        run(&engine, "SET NAME REDIS");
        run(&engine, "DEL CITY");
        run(&engine, "HMSET LIST a b c");
        engine.store().to_map()
    };

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();
    let report = engine.recovery_report();

    assert!(report.snapshot_loaded);
    assert_eq!(report.snapshot_entries, 2);
    assert_eq!(report.records_replayed, 3);
    assert_eq!(engine.store().to_map(), before);
    assert_eq!(engine.get("NAME"), strings(&["REDIS"]));
    assert!(engine.get("CITY").is_empty());
}

#[test]
fn test_restart_after_clean_close() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        run(&engine, "HMSET PERSON NAME RAJ SURNAME PATEL");
        engine.close().unwrap();
    }

    assert_eq!(fs::metadata(temp_dir.path().join("data.wal")).unwrap().len(), 0);

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();

    assert!(engine.recovery_report().snapshot_loaded);
    assert_eq!(engine.recovery_report().records_replayed, 0);
    assert_eq!(
        engine.get("PERSON"),
        strings(&["NAME", "RAJ", "SURNAME", "PATEL"])
    );
}

#[test]
fn test_fresh_directory_recovers_empty() {
    let temp_dir = TempDir::new().unwrap();
    let engine = Engine::open(config_for(temp_dir.path())).unwrap();

    assert!(engine.store().is_empty());
    assert_eq!(engine.recovery_report(), &RecoveryReport::default());
}

#[test]
fn test_crash_between_rename_and_truncate_replays_harmlessly() {
    let temp_dir = TempDir::new().unwrap();

    let wal_copy = {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        run(&engine, "SET a 1");
        run(&engine, "HMSET b x y");
        run(&engine, "DEL a");
        let wal_copy = fs::read(temp_dir.path().join("data.wal")).unwrap();
        engine.snapshot().unwrap();
        wal_copy
    };

    // Put back the records the snapshot already folded in
    fs::write(temp_dir.path().join("data.wal"), wal_copy).unwrap();

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();

    assert!(engine.get("a").is_empty());
    assert_eq!(engine.get("b"), strings(&["x", "y"]));
    assert_eq!(engine.store().len(), 1);
}

// =============================================================================
// Damaged File Tests
// =============================================================================

#[test]
fn test_malformed_wal_lines_are_skipped() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(
        temp_dir.path().join("data.wal"),
        "SET a 1\nFOO bar\nSET b\n\nPING\nSET c 3\n",
    )
    .unwrap();

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();
    let report = engine.recovery_report();

    assert_eq!(report.records_replayed, 2);
    assert_eq!(report.lines_skipped, 3);
    assert_eq!(engine.get("a"), strings(&["1"]));
    assert_eq!(engine.get("c"), strings(&["3"]));
}

#[test]
fn test_torn_last_record_is_dropped() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("data.wal"), "SET a 1\nSET b 2\nSET c thr").unwrap();

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();

    assert_eq!(engine.recovery_report().records_replayed, 2);
    assert!(engine.get("c").is_empty());

    // The next append starts on its own line
    run(&engine, "SET d 4");
    drop(engine);

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();
    assert_eq!(engine.get("d"), strings(&["4"]));
    assert_eq!(engine.recovery_report().lines_skipped, 0);
}

#[test]
fn test_corrupt_snapshot_is_quarantined() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("data.dat"), b"garbage bytes").unwrap();
    fs::write(temp_dir.path().join("data.wal"), "SET a 1\n").unwrap();

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();
    let report = engine.recovery_report();

    assert!(report.snapshot_corrupt);
    assert!(!report.snapshot_loaded);
    assert_eq!(
        report.snapshot_quarantined.as_deref(),
        Some(temp_dir.path().join("data.dat.corrupt").as_path())
    );
    assert!(!temp_dir.path().join("data.dat").exists());
    // The WAL is still replayed on top of the empty store
    assert_eq!(engine.get("a"), strings(&["1"]));
}

#[test]
fn test_stale_tmp_snapshot_is_removed() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        run(&engine, "SET a 1");
        engine.snapshot().unwrap();
    }
    fs::write(temp_dir.path().join("data.dat.tmp"), b"interrupted").unwrap();

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();

    assert!(engine.recovery_report().stale_tmp_removed);
    assert!(engine.recovery_report().snapshot_loaded);
    assert!(!temp_dir.path().join("data.dat.tmp").exists());
    assert_eq!(engine.get("a"), strings(&["1"]));
}

#[test]
fn test_recovery_does_not_rewrite_wal() {
    let temp_dir = TempDir::new().unwrap();
    let contents = "SET a 1\nHMSET b x y z\nDEL a\n";
    fs::write(temp_dir.path().join("data.wal"), contents).unwrap();

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();

    assert_eq!(engine.wal_records(), 3);
    assert_eq!(
        fs::read_to_string(temp_dir.path().join("data.wal")).unwrap(),
        contents
    );
}

#[test]
fn test_replayed_commands_are_not_relogged() {
    let temp_dir = TempDir::new().unwrap();

    {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        run(&engine, "SET a 1");
        run(&engine, "SET b 2");
    }

    // Reopen twice; each replay must leave the log as it was
    for _ in 0..2 {
        let engine = Engine::open(config_for(temp_dir.path())).unwrap();
        assert_eq!(engine.wal_records(), 2);
    }

    let engine = Engine::open(config_for(temp_dir.path())).unwrap();
    engine
        .execute(Command::Del { key: "a".to_string() }, WalMode::Enabled)
        .unwrap();
    assert_eq!(engine.wal_records(), 3);
}
