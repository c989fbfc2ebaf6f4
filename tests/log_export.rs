#![allow(clippy::unwrap_used, clippy::expect_used)]

mod util;

use legacy_migration::migration::{MigrationLogEntry, MigrationLogPatch};
use legacy_migration::MigrationConfig;
use sha2::{Digest, Sha256};
use util::{harness, migration_address, FakeOracle};

#[tokio::test]
async fn export_writes_named_file_with_matching_digest() {
    let h = harness(MigrationConfig::production(), FakeOracle::default());
    h.orchestrator.store().set_migration_address(migration_address());

    let first = h
        .orchestrator
        .prepare_migration_log("HASHONE", vec!["AAA".into()], 1_500_000)
        .unwrap();
    let second = h
        .orchestrator
        .prepare_migration_log("HASHTWO", vec!["BBB".into()], 2_000_000)
        .unwrap();
    assert_eq!((first, second), (0, 1));
    assert!(h.orchestrator.update_migration_log(
        1,
        MigrationLogPatch {
            spent_addresses: Some(vec!["SPENT".into()]),
            mine: Some(true),
            crackability: Some(0.02),
            ..MigrationLogPatch::default()
        }
    ));
    assert!(!h
        .orchestrator
        .update_migration_log(7, MigrationLogPatch::default()));

    let dir = tempfile::tempdir().unwrap();
    let exported = h
        .orchestrator
        .export_migration_log(&dir.path().join("logs"), "profile-1")
        .await
        .unwrap();

    assert_eq!(
        exported.path.file_name().unwrap().to_str().unwrap(),
        "profile-1-migration.log"
    );
    let bytes = std::fs::read(&exported.path).unwrap();
    assert_eq!(exported.sha256, hex::encode(Sha256::digest(&bytes)));

    let entries: Vec<MigrationLogEntry> = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].bundle_hash, "HASHONE");
    assert_eq!(entries[0].mine, None);
    assert!(entries[0].deposit_address.contains(&migration_address().bech32));
    assert_eq!(entries[1].mine, Some(true));
    assert_eq!(entries[1].spent_addresses.as_deref(), Some(&["SPENT".to_string()][..]));

    let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("logs"))
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers.len(), 1);
}

#[tokio::test]
async fn export_overwrites_previous_file() {
    let h = harness(MigrationConfig::production(), FakeOracle::default());
    let dir = tempfile::tempdir().unwrap();

    let empty = h
        .orchestrator
        .export_migration_log(dir.path(), "p")
        .await
        .unwrap();
    h.orchestrator
        .prepare_migration_log("HASH", Vec::new(), 1)
        .unwrap();
    let filled = h
        .orchestrator
        .export_migration_log(dir.path(), "p")
        .await
        .unwrap();

    assert_eq!(empty.path, filled.path);
    assert_ne!(empty.sha256, filled.sha256);
    let entries: Vec<MigrationLogEntry> =
        serde_json::from_slice(&std::fs::read(&filled.path).unwrap()).unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].deposit_address.is_empty());
}
