//! Restore Tests
//!
//! Tests for replacing the live store from a bundle, including the safety
//! backup and reversion path.

use crate::*;
use vitanet::{paths, BundleError, Phase, RestoreSource};

// =============================================================================
// ROUND TRIP
// =============================================================================

#[test]
fn test_round_trip_restores_identical_rows() {
    let fx = fixture();
    seed_foods(fx.store(), 6);
    let original = dump_foods(fx.store());
    let created = fx.manager.create(fx.path("rt"), CustomMetadata::new()).unwrap();

    // Diverge, then restore
    Connection::open(fx.store())
        .unwrap()
        .execute_batch("DELETE FROM foods WHERE id > 2; UPDATE foods SET note = NULL;")
        .unwrap();
    assert_ne!(dump_foods(fx.store()), original);

    let summary = fx.manager.restore(&created.path, true).unwrap();

    assert_eq!(summary.restored_from, RestoreSource::Snapshot);
    assert_eq!(summary.descriptor, created.descriptor);
    assert_eq!(dump_foods(fx.store()), original);
}

#[test]
fn test_nightly_backup_scenario() {
    let fx = fixture();
    seed_foods(fx.store(), 10);
    let created = fx
        .manager
        .create(fx.path("nightly"), described("nightly backup"))
        .unwrap();

    Connection::open(fx.store())
        .unwrap()
        .execute_batch("DELETE FROM foods")
        .unwrap();

    let summary = fx.manager.restore(&created.path, true).unwrap();

    assert_eq!(dump_foods(fx.store()).len(), 10);
    assert_eq!(
        summary.descriptor.custom_metadata["description"],
        serde_json::json!("nightly backup")
    );

    // The backup holds the emptied store
    let backup = summary.safety_backup.expect("store existed");
    assert!(backup.starts_with(fx.backup_dir()));
    assert!(dump_foods(&backup).is_empty());
}

#[test]
fn test_restore_into_missing_store() {
    let fx = fixture();
    seed_foods(fx.store(), 3);
    let original = dump_foods(fx.store());
    let created = fx.manager.create(fx.path("fresh"), CustomMetadata::new()).unwrap();
    std::fs::remove_file(fx.store()).unwrap();

    // No store, so no confirmation and no backup
    let summary = fx.manager.restore(&created.path, false).unwrap();

    assert!(summary.safety_backup.is_none());
    assert!(list_dir(&fx.backup_dir()).is_empty());
    assert_eq!(dump_foods(fx.store()), original);
}

#[test]
fn test_restore_from_wal_mode_store() {
    let fx = fixture();
    seed_foods(fx.store(), 4);
    let created = fx.manager.create(fx.path("wal"), CustomMetadata::new()).unwrap();

    let conn = Connection::open(fx.store()).unwrap();
    conn.query_row("PRAGMA journal_mode = WAL", [], |r| r.get::<_, String>(0))
        .unwrap();
    conn.execute_batch("DELETE FROM foods WHERE id = 1").unwrap();
    drop(conn);

    let summary = fx.manager.restore(&created.path, true).unwrap();

    assert_eq!(dump_foods(fx.store()).len(), 4);
    let backup = summary.safety_backup.unwrap();
    assert_eq!(dump_foods(&backup).len(), 3);
}

// =============================================================================
// CONFIRMATION
// =============================================================================

#[test]
fn test_existing_store_requires_force() {
    let fx = fixture();
    seed_foods(fx.store(), 2);
    let created = fx.manager.create(fx.path("guard"), CustomMetadata::new()).unwrap();
    seed_foods(fx.store(), 1);
    let before = std::fs::read(fx.store()).unwrap();

    let err = fx.manager.restore(&created.path, false).unwrap_err();

    assert!(matches!(err, BundleError::ConfirmationRequired { .. }));
    assert!(err.is_validation());
    assert_eq!(std::fs::read(fx.store()).unwrap(), before);
    assert!(list_dir(&fx.backup_dir()).is_empty());
}

// =============================================================================
// EMPTY BUNDLES
// =============================================================================

#[test]
fn test_empty_bundle_leaves_store_unchanged() {
    let fx = fixture();
    let created = fx.manager.create(fx.path("empty"), CustomMetadata::new()).unwrap();
    seed_foods(fx.store(), 3);
    let before = std::fs::read(fx.store()).unwrap();

    let summary = fx.manager.restore(&created.path, true).unwrap();

    assert_eq!(summary.restored_from, RestoreSource::Nothing);
    assert_eq!(std::fs::read(fx.store()).unwrap(), before);
    let backup = summary.safety_backup.expect("backup taken");
    assert_eq!(std::fs::read(backup).unwrap(), before);
}

#[test]
fn test_empty_bundle_without_store() {
    let fx = fixture();
    let created = fx.manager.create(fx.path("empty"), CustomMetadata::new()).unwrap();

    let summary = fx.manager.restore(&created.path, false).unwrap();

    assert_eq!(summary.restored_from, RestoreSource::Nothing);
    assert!(summary.safety_backup.is_none());
    assert!(!fx.store().exists());
}

// =============================================================================
// SCRIPT FALLBACK AND REVERSION
// =============================================================================

#[test]
fn test_unusable_snapshot_falls_back_to_scripts() {
    let fx = fixture();
    seed_foods(fx.store(), 0);
    Connection::open(fx.store())
        .unwrap()
        .execute_batch(
            "CREATE TABLE food_log (id INTEGER PRIMARY KEY, food_id INTEGER NOT NULL);
             CREATE TRIGGER foods_logged AFTER INSERT ON foods
                 BEGIN INSERT INTO food_log (food_id) VALUES (new.id); END;",
        )
        .unwrap();
    seed_foods(fx.store(), 5);
    let original = dump_foods(fx.store());
    let created = fx.manager.create(fx.path("fallback"), CustomMetadata::new()).unwrap();
    rewrite_bundle(&created.path, |entries| {
        entries.insert(paths::SNAPSHOT, b"written by a very different engine".to_vec());
    });
    Connection::open(fx.store())
        .unwrap()
        .execute_batch("DELETE FROM foods; DELETE FROM food_log;")
        .unwrap();

    let summary = fx.manager.restore(&created.path, true).unwrap();

    assert_eq!(summary.restored_from, RestoreSource::Scripts);
    assert_eq!(dump_foods(fx.store()), original);
    let conn = Connection::open(fx.store()).unwrap();
    let logged: i64 = conn
        .query_row("SELECT COUNT(*) FROM food_log", [], |r| r.get(0))
        .unwrap();
    assert_eq!(logged, 5, "replaying rows must not fire the trigger again");
    let triggers: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger' AND name = 'foods_logged'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(triggers, 1);
}

#[test]
fn test_failed_replacement_reverts_store() {
    let fx = fixture();
    seed_foods(fx.store(), 3);
    let created = fx.manager.create(fx.path("bad"), CustomMetadata::new()).unwrap();
    rewrite_bundle(&created.path, |entries| {
        entries.insert(paths::SNAPSHOT, vec![0u8; 512]);
        entries.insert(
            paths::DATA,
            b"INSERT INTO \"foods\"(\"id\",\"name\") VALUES(1,'ok');\nINSERT INTO \"nowhere\" VALUES(2);\n"
                .to_vec(),
        );
    });
    seed_foods(fx.store(), 2);
    let before = std::fs::read(fx.store()).unwrap();

    let err = fx.manager.restore(&created.path, true).unwrap_err();

    match &err {
        BundleError::ImportFailed { script, ordinal, .. } => {
            assert_eq!(script, "data.sql");
            assert_eq!(*ordinal, 2);
        }
        other => panic!("expected ImportFailed, got {:?}", other),
    }
    assert_eq!(err.phase(), Phase::Replacement);
    assert_eq!(std::fs::read(fx.store()).unwrap(), before);

    let staged: Vec<_> = list_dir(fx.dir.path())
        .into_iter()
        .filter(|n| n.starts_with(".vitanet-"))
        .collect();
    assert!(staged.is_empty(), "{:?}", staged);
    assert_eq!(list_dir(&fx.backup_dir()).len(), 1);
}

// =============================================================================
// VALIDATION
// =============================================================================

#[test]
fn test_unknown_version_rejected_before_anything_else() {
    let fx = fixture();
    seed_foods(fx.store(), 2);
    let created = fx.manager.create(fx.path("future"), CustomMetadata::new()).unwrap();
    rewrite_bundle(&created.path, |entries| {
        entries.insert(
            paths::DESCRIPTOR,
            br#"{"format_version": "9.9", "shiny_new_field": true}"#.to_vec(),
        );
    });
    let before = std::fs::read(fx.store()).unwrap();

    let err = fx.manager.restore(&created.path, true).unwrap_err();

    assert!(matches!(err, BundleError::VersionMismatch { .. }), "{:?}", err);
    assert_eq!(std::fs::read(fx.store()).unwrap(), before);
    assert!(list_dir(&fx.backup_dir()).is_empty());
}

#[test]
fn test_malformed_descriptor_rejected() {
    let fx = fixture();
    let created = fx.manager.create(fx.path("odd"), CustomMetadata::new()).unwrap();
    rewrite_bundle(&created.path, |entries| {
        entries.insert(paths::DESCRIPTOR, br#"{"format_version": "1.0"}"#.to_vec());
    });

    let err = fx.manager.restore(&created.path, true).unwrap_err();

    assert!(matches!(err, BundleError::MalformedDescriptor { .. }), "{:?}", err);
    assert!(!fx.store().exists());
}

#[test]
fn test_missing_database_entry_rejected() {
    let fx = fixture();
    seed_foods(fx.store(), 2);
    let created = fx.manager.create(fx.path("partial"), CustomMetadata::new()).unwrap();
    rewrite_bundle(&created.path, |entries| {
        entries.remove(paths::DATA);
    });
    let before = std::fs::read(fx.store()).unwrap();

    match fx.manager.restore(&created.path, true) {
        Err(BundleError::MissingEntry { entry }) => assert_eq!(entry, paths::DATA),
        other => panic!("expected MissingEntry, got {:?}", other),
    }
    assert_eq!(std::fs::read(fx.store()).unwrap(), before);
}

#[test]
fn test_missing_and_corrupt_sources() {
    let fx = fixture();

    let err = fx.manager.restore(fx.path("nope.bundle"), true).unwrap_err();
    assert!(matches!(err, BundleError::NotFound { .. }));

    std::fs::write(fx.path("junk.bundle"), vec![7u8; 64]).unwrap();
    let err = fx.manager.restore(fx.path("junk.bundle"), true).unwrap_err();
    assert!(matches!(err, BundleError::CorruptArchive { .. }), "{:?}", err);
    assert!(!fx.store().exists());
}
