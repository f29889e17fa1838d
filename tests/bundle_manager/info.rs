//! Info Tests
//!
//! Tests for inspecting bundles without touching the live store.

use crate::*;
use vitanet::{paths, BundleError};

#[test]
fn test_info_describes_bundle() {
    let fx = fixture();
    seed_foods(fx.store(), 2);
    let created = fx.manager.create(fx.path("a"), described("weekly")).unwrap();

    let info = fx.manager.info(&created.path).unwrap();

    assert_eq!(info.path, created.path);
    assert_eq!(info.size, created.size);
    assert_eq!(info.descriptor, created.descriptor);
    assert!(info.has_snapshot && info.has_schema && info.has_data);
    assert_eq!(info.entries.len(), 4);
    assert!(!info.entries.iter().any(|e| e == "checksums.json"));
}

#[test]
fn test_info_is_idempotent() {
    let fx = fixture();
    seed_foods(fx.store(), 2);
    let created = fx.manager.create(fx.path("idem"), CustomMetadata::new()).unwrap();
    let bytes = std::fs::read(&created.path).unwrap();

    let first = fx.manager.info(&created.path).unwrap();
    let second = fx.manager.info(&created.path).unwrap();

    assert_eq!(first, second);
    assert_eq!(std::fs::read(&created.path).unwrap(), bytes);
}

#[test]
fn test_info_never_opens_store() {
    let fx = fixture();
    seed_foods(fx.store(), 1);
    let created = fx.manager.create(fx.path("x"), CustomMetadata::new()).unwrap();
    std::fs::remove_file(fx.store()).unwrap();

    fx.manager.info(&created.path).unwrap();

    assert!(!fx.store().exists());
}

#[test]
fn test_info_on_empty_bundle() {
    let fx = fixture();
    let created = fx.manager.create(fx.path("empty"), CustomMetadata::new()).unwrap();

    let info = fx.manager.info(&created.path).unwrap();

    assert!(!info.descriptor.database_included);
    assert!(!info.has_snapshot && !info.has_schema && !info.has_data);
    assert_eq!(info.entries, vec![paths::DESCRIPTOR.to_string()]);
}

#[test]
fn test_info_rejects_unknown_version() {
    let fx = fixture();
    let created = fx.manager.create(fx.path("future"), CustomMetadata::new()).unwrap();
    rewrite_bundle(&created.path, |entries| {
        entries.insert(
            paths::DESCRIPTOR,
            serde_json::json!({
                "format_version": "9.9",
                "created_at": "2030-01-01T00:00:00+00:00",
                "application_version": "9.9",
                "database_included": false,
                "custom_metadata": {}
            })
            .to_string()
            .into_bytes(),
        );
    });

    match fx.manager.info(&created.path) {
        Err(BundleError::VersionMismatch { found, supported }) => {
            assert_eq!(found, "9.9");
            assert_eq!(supported, vec!["1.0".to_string()]);
        }
        other => panic!("expected VersionMismatch, got {:?}", other),
    }
}

#[test]
fn test_info_missing_and_corrupt_files() {
    let fx = fixture();

    let err = fx.manager.info(fx.path("absent.bundle")).unwrap_err();
    assert!(matches!(err, BundleError::NotFound { .. }));

    std::fs::write(fx.path("junk.bundle"), b"not an archive").unwrap();
    let err = fx.manager.info(fx.path("junk.bundle")).unwrap_err();
    assert!(matches!(err, BundleError::CorruptArchive { .. }), "{:?}", err);
}
