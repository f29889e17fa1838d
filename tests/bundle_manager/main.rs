//! Bundle Manager Test Suite
//!
//! End-to-end tests for create, restore and info against real SQLite stores
//! in temporary directories.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test --test bundle_manager
//!
//! # Restore tests only
//! cargo test --test bundle_manager restore::
//! ```

use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use vitanet::{BundleManager, CustomMetadata};
use vitanet_archive::{xxh3_hex, BundleEntries, BundleReader, BundleWriter};

// Test modules
pub mod create;
pub mod info;
pub mod restore;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// One row of the `foods` table
pub type FoodRow = (i64, String, Option<f64>, Option<Vec<u8>>, Option<String>);

/// A manager whose store, bundles and backups all live in one temp dir
pub struct Fixture {
    pub dir: TempDir,
    pub manager: BundleManager,
}

impl Fixture {
    pub fn store(&self) -> &Path {
        self.manager.store_path()
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.path("backups")
    }
}

/// Fresh fixture with no store on disk
pub fn fixture() -> Fixture {
    let dir = tempfile::tempdir().expect("temp dir");
    let manager = BundleManager::builder()
        .store_path(dir.path().join("vitanet.db"))
        .backup_dir(dir.path().join("backups"))
        .application_version("1.0")
        .build()
        .expect("valid config");
    Fixture { dir, manager }
}

/// Create the `foods` table at `path` and insert `count` rows.
///
/// Every third row has a NULL note and every other row carries a photo blob.
pub fn seed_foods(path: &Path, count: i64) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS foods (
             id INTEGER PRIMARY KEY,
             name TEXT NOT NULL,
             kcal REAL,
             photo BLOB,
             note TEXT
         );
         CREATE INDEX IF NOT EXISTS foods_by_name ON foods(name);",
    )
    .unwrap();
    for i in 1..=count {
        let photo: Option<Vec<u8>> = (i % 2 == 0).then(|| vec![0u8, 0xFF, i as u8]);
        let note: Option<String> = (i % 3 != 0).then(|| format!("note '{}'", i));
        conn.execute(
            "INSERT INTO foods (name, kcal, photo, note) VALUES (?1, ?2, ?3, ?4)",
            params![format!("food {}", i), i as f64 * 10.5, photo, note],
        )
        .unwrap();
    }
}

/// All `foods` rows ordered by id
pub fn dump_foods(path: &Path) -> Vec<FoodRow> {
    let conn = Connection::open(path).unwrap();
    let mut stmt = conn
        .prepare("SELECT id, name, kcal, photo, note FROM foods ORDER BY id")
        .unwrap();
    let rows = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)))
        .unwrap()
        .collect::<rusqlite::Result<Vec<FoodRow>>>()
        .unwrap();
    rows
}

/// Metadata with a single `description` key
pub fn described(text: &str) -> CustomMetadata {
    let mut meta = CustomMetadata::new();
    meta.insert("description".to_string(), serde_json::json!(text));
    meta
}

/// Rewrite the bundle at `path` after editing its entries
pub fn rewrite_bundle(path: &Path, edit: impl FnOnce(&mut BundleEntries)) {
    let mut entries = BundleReader::read(path).unwrap();
    edit(&mut entries);
    BundleWriter::new(3).write(&entries, path).unwrap();
}

/// Names of files in `dir`, or empty if it does not exist
pub fn list_dir(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(read) => read
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}
