//! Safety backups
//!
//! Before a restore touches the live store, a byte-for-byte copy is written
//! to the backup directory as `<store file>.backup.<YYYYmmdd_HHMMSS>`. If the
//! restore fails, that copy is moved back into place.

use crate::replace::remove_sidecars;
use chrono::Utc;
use rusqlite::Connection;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use vitanet_core::config::parent_dir;
use vitanet_core::{BundleError, Phase, Result};

/// Timestamp layout used in backup file names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Fold any write-ahead log into the main database file.
///
/// Without this a plain file copy of the store can miss committed
/// transactions that still live only in `-wal`.
pub fn checkpoint_wal(store: &Path) -> Result<()> {
    let mut wal = store.as_os_str().to_owned();
    wal.push("-wal");
    if !Path::new(&wal).exists() {
        return Ok(());
    }

    let conn = Connection::open(store).map_err(|e| backup_error(store, e))?;
    let (busy, _, _): (i64, i64, i64) = conn
        .query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })
        .map_err(|e| backup_error(store, e))?;
    if busy != 0 {
        return Err(BundleError::io(
            Phase::SafetyBackup,
            store,
            std::io::Error::new(
                std::io::ErrorKind::WouldBlock,
                "store is busy; WAL checkpoint could not complete",
            ),
        ));
    }
    debug!(store = %store.display(), "WAL checkpointed");
    Ok(())
}

/// Copy `store` into `backup_dir` and return the copy's path.
///
/// The directory is created if missing. A name collision within the same
/// second gets a numeric suffix rather than overwriting an earlier backup.
pub fn take_safety_backup(store: &Path, backup_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(backup_dir).map_err(|e| BundleError::io(Phase::SafetyBackup, backup_dir, e))?;

    let file_name = store
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store".to_string());
    let stamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT);
    let base = format!("{}.backup.{}", file_name, stamp);

    let mut target = backup_dir.join(&base);
    let mut n = 1u32;
    while target.exists() {
        target = backup_dir.join(format!("{}.{}", base, n));
        n += 1;
    }

    fs::copy(store, &target).map_err(|e| BundleError::io(Phase::SafetyBackup, store, e))?;
    File::open(&target)
        .and_then(|f| f.sync_all())
        .map_err(|e| BundleError::io(Phase::SafetyBackup, &target, e))?;

    info!(store = %store.display(), backup = %target.display(), "safety backup taken");
    Ok(target)
}

/// Put `backup` back at `store`, leaving `backup` in place.
///
/// The copy is staged beside the store and renamed over it, so a failure
/// here never leaves a half-written store.
pub fn revert_from_backup(backup: &Path, store: &Path) -> Result<()> {
    if !backup.is_file() {
        return Err(BundleError::io(
            Phase::Reversion,
            backup,
            std::io::Error::new(std::io::ErrorKind::NotFound, "safety backup is missing"),
        ));
    }

    let dir = parent_dir(store);
    let tmp = tempfile::Builder::new()
        .prefix(".vitanet-revert-")
        .suffix(".db")
        .tempfile_in(&dir)
        .map_err(|e| BundleError::io(Phase::Reversion, &dir, e))?;
    fs::copy(backup, tmp.path()).map_err(|e| BundleError::io(Phase::Reversion, backup, e))?;
    tmp.as_file()
        .sync_all()
        .map_err(|e| BundleError::io(Phase::Reversion, tmp.path(), e))?;

    remove_sidecars(store);
    tmp.persist(store)
        .map_err(|e| BundleError::io(Phase::Reversion, store, e.error))?;

    info!(store = %store.display(), backup = %backup.display(), "store reverted from safety backup");
    Ok(())
}

fn backup_error(store: &Path, e: rusqlite::Error) -> BundleError {
    BundleError::io(
        Phase::SafetyBackup,
        store,
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
    )
}
