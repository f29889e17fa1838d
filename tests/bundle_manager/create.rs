//! Create Tests
//!
//! Tests for writing bundles from the live store.

use crate::*;
use vitanet::{paths, BundleError, FormatVersion, Phase};

#[test]
fn test_create_appends_extension() {
    let fx = fixture();
    seed_foods(fx.store(), 3);

    let summary = fx.manager.create(fx.path("nightly"), CustomMetadata::new()).unwrap();

    assert_eq!(summary.path, fx.path("nightly.bundle"));
    assert!(summary.path.is_file());
    assert_eq!(summary.size, std::fs::metadata(&summary.path).unwrap().len());
}

#[test]
fn test_create_reports_every_entry() {
    let fx = fixture();
    seed_foods(fx.store(), 3);

    let summary = fx.manager.create(fx.path("full.bundle"), CustomMetadata::new()).unwrap();

    let names: Vec<&str> = summary.entry_sizes.keys().map(String::as_str).collect();
    assert_eq!(
        names,
        vec![paths::DATA, paths::DESCRIPTOR, paths::SCHEMA, paths::SNAPSHOT]
    );
    assert!(summary.entry_sizes[paths::SNAPSHOT] > 0);
    assert!(summary.descriptor.database_included);
    assert_eq!(summary.descriptor.format_version, FormatVersion::CURRENT);
    assert_eq!(summary.descriptor.application_version, "1.0");
}

#[test]
fn test_create_reports_entry_checksums() {
    let fx = fixture();
    seed_foods(fx.store(), 3);

    let summary = fx.manager.create(fx.path("sums"), CustomMetadata::new()).unwrap();

    let entries = BundleReader::read(&summary.path).unwrap();
    assert_eq!(summary.checksums.len(), entries.len());
    for name in entries.names() {
        let data = entries.get(name).unwrap();
        assert_eq!(summary.checksums[name], xxh3_hex(data), "{}", name);
    }
    assert!(summary.checksums.keys().eq(summary.entry_sizes.keys()));
}

#[test]
fn test_create_keeps_custom_metadata_verbatim() {
    let fx = fixture();
    seed_foods(fx.store(), 1);
    let mut meta = described("nightly backup");
    meta.insert(
        "tags".to_string(),
        serde_json::json!(["daily", {"nested": [1, 2.5, null]}]),
    );

    let summary = fx.manager.create(fx.path("meta"), meta.clone()).unwrap();
    let info = fx.manager.info(&summary.path).unwrap();

    assert_eq!(info.descriptor.custom_metadata, meta);
}

#[test]
fn test_create_without_store_is_descriptor_only() {
    let fx = fixture();

    let summary = fx.manager.create(fx.path("empty"), CustomMetadata::new()).unwrap();

    assert!(!summary.descriptor.database_included);
    assert_eq!(summary.entry_sizes.len(), 1);
    assert!(summary.entry_sizes.contains_key(paths::DESCRIPTOR));
    assert!(!fx.store().exists(), "create must not conjure a store");
}

#[test]
fn test_scripts_match_snapshot() {
    let fx = fixture();
    seed_foods(fx.store(), 4);

    let summary = fx.manager.create(fx.path("same"), CustomMetadata::new()).unwrap();
    let entries = BundleReader::read(&summary.path).unwrap();
    let data = std::str::from_utf8(entries.get(paths::DATA).unwrap()).unwrap();
    let schema = std::str::from_utf8(entries.get(paths::SCHEMA).unwrap()).unwrap();

    assert_eq!(data.lines().count(), 4);
    assert!(data.starts_with("INSERT INTO \"foods\"(\"id\",\"name\",\"kcal\",\"photo\",\"note\") VALUES(1,'food 1',10.5,NULL,'note ''1''');"));
    assert!(schema.contains("CREATE TABLE foods"));
    assert!(schema.contains("CREATE INDEX foods_by_name"));
}

#[test]
fn test_failed_create_leaves_no_destination() {
    let fx = fixture();
    std::fs::write(fx.store(), vec![0x5Au8; 8192]).unwrap();
    let destination = fx.path("broken.bundle");

    let err = fx.manager.create(&destination, CustomMetadata::new()).unwrap_err();

    assert_eq!(err.phase(), Phase::SnapshotWrite);
    assert!(!destination.exists());
    let partials: Vec<_> = list_dir(fx.dir.path())
        .into_iter()
        .filter(|n| n.ends_with(".partial"))
        .collect();
    assert!(partials.is_empty(), "{:?}", partials);
}

#[test]
fn test_create_into_missing_directory() {
    let fx = fixture();
    seed_foods(fx.store(), 1);

    let err = fx
        .manager
        .create(fx.path("no/such/dir/out"), CustomMetadata::new())
        .unwrap_err();

    assert!(matches!(
        err,
        BundleError::Io {
            phase: Phase::ArchiveWrite,
            ..
        }
    ));
}

#[test]
fn test_create_does_not_modify_store() {
    let fx = fixture();
    seed_foods(fx.store(), 5);
    let before = std::fs::read(fx.store()).unwrap();

    fx.manager.create(fx.path("ro"), CustomMetadata::new()).unwrap();

    assert_eq!(std::fs::read(fx.store()).unwrap(), before);
}
