//! Facade Tests
//!
//! The broker-facing entry points: configuration file in, persistence
//! manager out, errors classified for the produce path.

use kapokmq::prelude::*;
use kapokmq::durability::WalReader;
use tempfile::TempDir;

#[test]
fn config_file_drives_durable_startup() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join(kapokmq::engine::CONFIG_FILE_NAME);
    let wal_path = dir.path().join("WAL.log");
    std::fs::write(
        &config_path,
        format!(
            "persistence_level = 2\nwal_path = {:?}\nsync = \"always\"\n",
            wal_path.display().to_string()
        ),
    )
    .unwrap();

    let config = PersistenceConfig::from_file(&config_path).unwrap();
    let persistence = kapokmq::open_persistence(&config).unwrap();
    assert!(persistence.is_durable());

    let msg = Message::new("m-1", "orders", "hello");
    kapokmq::append(&persistence, &msg).unwrap();
    persistence.shutdown().unwrap();

    let outcome = WalReader::open(&wal_path).read_all::<Message>().unwrap();
    assert_eq!(outcome.records, vec![msg]);
}

#[test]
fn default_config_file_disables_wal() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join(kapokmq::engine::CONFIG_FILE_NAME);
    PersistenceConfig::write_default_if_missing(&config_path).unwrap();

    let mut config = PersistenceConfig::from_file(&config_path).unwrap();
    config.wal_path = dir.path().join("WAL.log");
    let persistence = kapokmq::open_persistence(&config).unwrap();

    kapokmq::append(&persistence, &Message::new("m-1", "orders", "hello")).unwrap();
    assert!(!persistence.is_durable());
    assert!(!config.wal_path.exists());
}

#[test]
fn unopenable_wal_is_fatal_at_facade() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, b"").unwrap();

    let config = PersistenceConfig::durable(blocker.join("WAL.log"));
    let err = kapokmq::open_persistence(&config).unwrap_err();
    assert!(err.is_fatal());
    assert!(matches!(err, Error::DurabilityUnavailable(_)));
}

#[test]
fn bad_sync_policy_is_config_error() {
    let dir = TempDir::new().unwrap();
    let config = PersistenceConfig::durable(dir.path().join("WAL.log")).with_sync("sometimes");
    let err = kapokmq::open_persistence(&config).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
}
