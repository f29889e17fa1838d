//! Consistent capture of a live store
//!
//! The store is copied page by page through SQLite's online backup API into
//! a scratch directory, so concurrent writers never produce a torn snapshot.
//! Schema and data scripts are then exported from that copy rather than from
//! the live store, which keeps all three artifacts describing the same state.

use crate::export::{export_data, export_schema};
use rusqlite::{Connection, DatabaseName, OpenFlags};
use std::path::Path;
use tracing::debug;
use vitanet_core::{BundleError, Phase, Result};

/// First 16 bytes of every SQLite database file
pub const SQLITE_HEADER_MAGIC: &[u8; 16] = b"SQLite format 3\0";

const HEADER_LEN: usize = 100;

/// Everything a bundle carries about one store
#[derive(Debug, Clone)]
pub struct CapturedStore {
    /// Raw database image
    pub snapshot: Vec<u8>,
    /// Schema statements, without terminators
    pub schema: Vec<String>,
    /// Data statements, without terminators
    pub data: Vec<String>,
}

/// Capture `store` as a snapshot image plus schema and data statements.
///
/// The store must already exist; a file that is not a SQLite database fails
/// with `ExportFailed` in the snapshot phase. The store is opened read-only
/// and never written.
pub fn capture_store(store: &Path) -> Result<CapturedStore> {
    let scratch = tempfile::Builder::new()
        .prefix(".vitanet-snapshot-")
        .tempdir()
        .map_err(|e| BundleError::io(Phase::SnapshotWrite, store, e))?;
    let copy_path = scratch.path().join("snapshot.db");

    {
        let source = Connection::open_with_flags(
            store,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| snapshot_error("open store", e))?;
        source
            .backup(DatabaseName::Main, &copy_path, None)
            .map_err(|e| snapshot_error("online backup", e))?;
    }

    let snapshot =
        std::fs::read(&copy_path).map_err(|e| BundleError::io(Phase::SnapshotWrite, &copy_path, e))?;

    let copy = Connection::open(&copy_path).map_err(|e| BundleError::ExportFailed {
        phase: Phase::SchemaExport,
        statement: String::new(),
        message: e.to_string(),
    })?;
    let schema = export_schema(&copy)?;
    let data = export_data(&copy)?;

    debug!(
        store = %store.display(),
        snapshot_bytes = snapshot.len(),
        schema_statements = schema.len(),
        data_statements = data.len(),
        "store captured"
    );

    Ok(CapturedStore {
        snapshot,
        schema,
        data,
    })
}

/// Check that `bytes` look like a database image this build can open.
///
/// Returns the reason when they do not. Passing this check does not mean the
/// image is intact; callers still run an integrity check after staging it.
pub fn check_snapshot_header(bytes: &[u8]) -> std::result::Result<(), String> {
    if bytes.len() < HEADER_LEN {
        return Err(format!("image too short ({} bytes)", bytes.len()));
    }
    if &bytes[..16] != SQLITE_HEADER_MAGIC {
        return Err("missing SQLite header".to_string());
    }

    let (write_version, read_version) = (bytes[18], bytes[19]);
    if !matches!(write_version, 1 | 2) || !matches!(read_version, 1 | 2) {
        return Err(format!(
            "unsupported file format versions (write {}, read {})",
            write_version, read_version
        ));
    }

    let raw_page_size = u16::from_be_bytes([bytes[16], bytes[17]]);
    let page_size: usize = if raw_page_size == 1 {
        65536
    } else {
        raw_page_size as usize
    };
    if !page_size.is_power_of_two() || !(512..=65536).contains(&page_size) {
        return Err(format!("invalid page size {}", page_size));
    }
    if bytes.len() % page_size != 0 {
        return Err(format!(
            "image length {} is not a multiple of page size {}",
            bytes.len(),
            page_size
        ));
    }

    Ok(())
}

fn snapshot_error(step: &str, e: rusqlite::Error) -> BundleError {
    BundleError::ExportFailed {
        phase: Phase::SnapshotWrite,
        statement: step.to_string(),
        message: e.to_string(),
    }
}
