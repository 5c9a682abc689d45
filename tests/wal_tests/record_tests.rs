//! Tests for WAL records

use cachedkv::protocol::Command;
use cachedkv::wal::WalRecord;
use cachedkv::CacheError;

#[test]
fn test_record_line_format() {
    let set = WalRecord::Set { key: "NAME".to_string(), value: "GOCACHED".to_string() };
    let hmset = WalRecord::HMSet {
        key: "PERSON".to_string(),
        values: vec!["NAME".to_string(), "RAJ".to_string()],
    };
    let del = WalRecord::Del { key: "NAME".to_string() };

    assert_eq!(set.to_line(), "SET NAME GOCACHED\n");
    assert_eq!(hmset.to_line(), "HMSET PERSON NAME RAJ\n");
    assert_eq!(del.to_line(), "DEL NAME\n");
}

#[test]
fn test_only_mutating_commands_have_records() {
    assert!(WalRecord::from_command(&Command::Ping).is_none());
    assert!(WalRecord::from_command(&Command::Get { key: "k".to_string() }).is_none());
    assert!(WalRecord::from_command(&Command::Subscribe { topic: "t".to_string() }).is_none());
    assert!(WalRecord::from_command(&Command::Publish {
        topic: "t".to_string(),
        message: vec!["m".to_string()],
    })
    .is_none());

    let del = Command::Del { key: "k".to_string() };
    assert_eq!(WalRecord::from_command(&del).unwrap().into_command(), del);
}

#[test]
fn test_parse_line_round_trips_record() {
    let record = WalRecord::HMSet {
        key: "k".to_string(),
        values: vec!["a".to_string(), "b".to_string(), "c".to_string()],
    };
    assert_eq!(WalRecord::parse_line(&record.to_line()).unwrap(), record);
}

#[test]
fn test_parse_line_rejects_non_mutating_and_garbage() {
    assert!(matches!(WalRecord::parse_line("PING"), Err(CacheError::Parse(_))));
    assert!(matches!(WalRecord::parse_line("GET k"), Err(CacheError::Parse(_))));
    assert!(matches!(WalRecord::parse_line("FOO k v"), Err(CacheError::Parse(_))));
    assert!(matches!(WalRecord::parse_line("SET k"), Err(CacheError::Parse(_))));
}

#[test]
fn test_parse_line_tolerates_trailing_space() {
    // Older logs wrote "DEL key " with a trailing separator
    assert_eq!(
        WalRecord::parse_line("DEL key \n").unwrap(),
        WalRecord::Del { key: "key".to_string() }
    );
}
