//! Staging and installing a replacement store
//!
//! A replacement is always built in a temporary file beside the live store
//! and moved into place with a single rename, so the store path only ever
//! holds the old database or the complete new one.

use crate::import::{import_data, import_schema, SCHEMA_SCRIPT};
use crate::snapshot::check_snapshot_header;
use rusqlite::Connection;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use vitanet_core::{BundleError, Phase, Result};

/// Suffixes of the files SQLite keeps next to a database
pub const SIDECAR_SUFFIXES: [&str; 3] = ["-wal", "-shm", "-journal"];

/// A fully built database waiting to be installed
#[derive(Debug)]
pub struct StagedStore {
    file: NamedTempFile,
}

impl StagedStore {
    fn new_in(dir: &Path) -> Result<Self> {
        let file = tempfile::Builder::new()
            .prefix(".vitanet-restore-")
            .suffix(".db")
            .tempfile_in(dir)
            .map_err(|e| BundleError::io(Phase::Replacement, dir, e))?;
        Ok(StagedStore { file })
    }

    /// Location of the staged file
    pub fn path(&self) -> &Path {
        self.file.path()
    }
}

/// Outcome of staging a snapshot image
#[derive(Debug)]
pub enum SnapshotStage {
    /// The image opened cleanly and passed an integrity check
    Ready(StagedStore),
    /// The image cannot be used here; scripts must be replayed instead
    Incompatible(String),
}

/// Stage a snapshot image in `dir`.
///
/// An image that fails the header check or `PRAGMA quick_check` yields
/// `Incompatible` rather than an error. Only I/O failures are errors.
pub fn stage_snapshot(dir: &Path, snapshot: &[u8]) -> Result<SnapshotStage> {
    if let Err(reason) = check_snapshot_header(snapshot) {
        return Ok(SnapshotStage::Incompatible(reason));
    }

    let mut staged = StagedStore::new_in(dir)?;
    {
        let file = staged.file.as_file_mut();
        file.write_all(snapshot)
            .map_err(|e| BundleError::io(Phase::Replacement, dir, e))?;
        file.sync_all()
            .map_err(|e| BundleError::io(Phase::Replacement, dir, e))?;
    }

    match integrity_check(staged.path()) {
        Ok(()) => {
            debug!(bytes = snapshot.len(), "snapshot staged");
            Ok(SnapshotStage::Ready(staged))
        }
        Err(reason) => {
            remove_sidecars(staged.path());
            Ok(SnapshotStage::Incompatible(reason))
        }
    }
}

/// Build a fresh database in `dir` from schema and data scripts
pub fn stage_from_scripts(dir: &Path, schema: &str, data: &str) -> Result<StagedStore> {
    let staged = StagedStore::new_in(dir)?;
    let result = (|| -> Result<()> {
        let mut conn = Connection::open(staged.path()).map_err(|e| BundleError::ImportFailed {
            script: SCHEMA_SCRIPT.to_string(),
            ordinal: 0,
            statement: String::new(),
            message: e.to_string(),
        })?;
        let tables = import_schema(&mut conn, schema)?;
        let rows = import_data(&mut conn, data)?;
        debug!(schema_statements = tables, data_statements = rows, "scripts replayed");
        Ok(())
    })();
    // Connection is closed by now; clean up anything it left behind
    remove_sidecars(staged.path());
    result.map(|()| staged)
}

/// Move `staged` over `store`.
///
/// The old store's permissions carry over and its sidecar files are removed
/// so SQLite does not replay a stale journal against the new file.
pub fn install(staged: StagedStore, store: &Path) -> Result<()> {
    if let Ok(meta) = std::fs::metadata(store) {
        if let Err(e) = std::fs::set_permissions(staged.path(), meta.permissions()) {
            warn!(error = %e, "could not copy store permissions");
        }
    }
    remove_sidecars(store);
    staged
        .file
        .persist(store)
        .map_err(|e| BundleError::io(Phase::Replacement, store, e.error))?;
    debug!(store = %store.display(), "replacement installed");
    Ok(())
}

/// Remove `-wal`, `-shm` and `-journal` files next to `store`, if any
pub fn remove_sidecars(store: &Path) {
    for path in sidecar_paths(store) {
        match std::fs::remove_file(&path) {
            Ok(()) => debug!(path = %path.display(), "removed sidecar"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), error = %e, "could not remove sidecar"),
        }
    }
}

/// Paths of the sidecar files SQLite may keep for `store`
pub fn sidecar_paths(store: &Path) -> Vec<PathBuf> {
    SIDECAR_SUFFIXES
        .iter()
        .map(|suffix| {
            let mut name = store.as_os_str().to_owned();
            name.push(suffix);
            PathBuf::from(name)
        })
        .collect()
}

fn integrity_check(path: &Path) -> std::result::Result<(), String> {
    let conn = Connection::open(path).map_err(|e| e.to_string())?;
    let verdict: String = conn
        .query_row("PRAGMA quick_check", [], |row| row.get(0))
        .map_err(|e| e.to_string())?;
    if verdict == "ok" {
        Ok(())
    } else {
        Err(format!("quick_check: {}", verdict))
    }
}
