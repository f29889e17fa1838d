//! The bundle manager.
//!
//! [`BundleManager`] ties the layers together: it captures the live store,
//! builds the descriptor, hands entries to the archive codec, and on restore
//! runs the validate, back up, replace, revert sequence.

use crate::types::{BundleInfo, CreateSummary, RestoreSource, RestoreSummary, StoreStatus};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use vitanet_archive::{paths, BundleEntries, BundleReader, BundleWriter, BUNDLE_EXTENSION};
use vitanet_core::config::parent_dir;
use vitanet_core::{
    BundleConfig, BundleDescriptor, BundleError, CustomMetadata, FormatVersion, Phase, Result,
};
use vitanet_storage::{
    capture_store, checkpoint_wal, install, revert_from_backup, stage_from_scripts, stage_snapshot,
    take_safety_backup, to_script, SnapshotStage,
};

/// Creates, restores and inspects bundles for one store.
///
/// Create one with [`BundleManager::new`] or [`BundleManager::builder`].
///
/// # Example
///
/// ```ignore
/// use vitanet::prelude::*;
///
/// let manager = BundleManager::builder()
///     .store_path("./vitanet.db")
///     .application_version("1.4.0")
///     .build()?;
///
/// let mut meta = CustomMetadata::new();
/// meta.insert("description".into(), json!("nightly backup"));
/// let created = manager.create("./nightly", meta)?;
///
/// let restored = manager.restore(&created.path, true)?;
/// println!("restored from {}", restored.restored_from);
/// ```
///
/// Operations are synchronous and hold no connection between calls. Running
/// two operations against the same store at once is the caller's problem.
#[derive(Debug, Clone)]
pub struct BundleManager {
    config: BundleConfig,
}

impl BundleManager {
    /// Create a manager from a validated configuration.
    pub fn new(config: BundleConfig) -> Result<Self> {
        config.validate()?;
        Ok(BundleManager { config })
    }

    /// Manager for `store_path` with every other setting at its default.
    pub fn open(store_path: impl Into<PathBuf>) -> Result<Self> {
        Self::builder().store_path(store_path).build()
    }

    /// Create a builder for manager configuration.
    pub fn builder() -> BundleManagerBuilder {
        BundleManagerBuilder::new()
    }

    /// Configuration in use
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Live store path
    pub fn store_path(&self) -> &Path {
        &self.config.store_path
    }

    /// Write a bundle of the live store to `destination`.
    ///
    /// `.bundle` is appended when `destination` lacks it. When no store
    /// exists the bundle carries only a descriptor with
    /// `database_included = false`.
    ///
    /// The snapshot is taken with SQLite's online backup API and both scripts
    /// are exported from that snapshot, so all three entries describe the
    /// same instant. Nothing is left at the destination if any step fails.
    pub fn create(
        &self,
        destination: impl AsRef<Path>,
        custom_metadata: CustomMetadata,
    ) -> Result<CreateSummary> {
        let destination = with_bundle_extension(destination.as_ref());
        let store = self.store_path();
        let database_included = store.is_file();

        let mut entries = BundleEntries::new();
        if database_included {
            let captured = capture_store(store)?;
            entries.insert(paths::SNAPSHOT, captured.snapshot);
            entries.insert(paths::SCHEMA, to_script(&captured.schema).into_bytes());
            entries.insert(paths::DATA, to_script(&captured.data).into_bytes());
        } else {
            warn!(
                store = %store.display(),
                "no store found, bundle will carry metadata only"
            );
        }

        let descriptor = BundleDescriptor::build(
            self.config.application_version.clone(),
            database_included,
            custom_metadata,
        );
        entries.insert(paths::DESCRIPTOR, descriptor.to_json_bytes()?);

        let written =
            BundleWriter::new(self.config.compression_level).write(&entries, &destination)?;

        info!(
            bundle = %written.path.display(),
            size = written.size,
            database_included,
            "bundle created"
        );

        Ok(CreateSummary {
            path: written.path,
            size: written.size,
            descriptor,
            entry_sizes: entries.sizes(),
            checksums: written.checksums,
        })
    }

    /// Replace the live store with the contents of `source`.
    ///
    /// The descriptor is read and validated before anything else; an
    /// unsupported or malformed bundle is rejected without touching the
    /// store. An existing store is only replaced when `force` is set, and is
    /// first copied to a safety backup. If replacement fails the store is
    /// reverted from that backup and the original error returned.
    ///
    /// A bundle without a database leaves the store as it is.
    pub fn restore(&self, source: impl AsRef<Path>, force: bool) -> Result<RestoreSummary> {
        let source = source.as_ref();
        let store = self.store_path();

        let descriptor =
            BundleDescriptor::parse(&BundleReader::read_entry(source, paths::DESCRIPTOR)?)?;

        let store_exists = store.exists();
        if store_exists && !force {
            return Err(BundleError::ConfirmationRequired {
                store: store.to_path_buf(),
            });
        }

        let entries = BundleReader::read(source)?;
        if descriptor.database_included {
            for name in [paths::SNAPSHOT, paths::SCHEMA, paths::DATA] {
                entries.require(name)?;
            }
        }

        let safety_backup = if store_exists {
            checkpoint_wal(store)?;
            Some(take_safety_backup(store, &self.config.backup_dir())?)
        } else {
            None
        };

        if !descriptor.database_included {
            info!(
                bundle = %source.display(),
                "bundle carries no database, store left unchanged"
            );
            return Ok(RestoreSummary {
                source: source.to_path_buf(),
                restored_from: RestoreSource::Nothing,
                descriptor,
                safety_backup,
            });
        }

        let restored_from = match self.replace_store(&entries) {
            Ok(restored_from) => restored_from,
            Err(cause) => return Err(self.revert(cause, safety_backup.as_deref())),
        };

        info!(
            bundle = %source.display(),
            store = %store.display(),
            restored_from = restored_from.as_str(),
            "bundle restored"
        );

        Ok(RestoreSummary {
            source: source.to_path_buf(),
            restored_from,
            descriptor,
            safety_backup,
        })
    }

    /// Describe `source` without touching the live store.
    pub fn info(&self, source: impl AsRef<Path>) -> Result<BundleInfo> {
        let source = source.as_ref();
        let descriptor =
            BundleDescriptor::parse(&BundleReader::read_entry(source, paths::DESCRIPTOR)?)?;
        let entries = BundleReader::entry_names(source)?;
        let size = fs::metadata(source)
            .map_err(|e| BundleError::io(Phase::ArchiveRead, source, e))?
            .len();

        let has = |name: &str| entries.iter().any(|e| e == name);
        Ok(BundleInfo {
            path: source.to_path_buf(),
            size,
            has_snapshot: has(paths::SNAPSHOT),
            has_schema: has(paths::SCHEMA),
            has_data: has(paths::DATA),
            descriptor,
            entries,
        })
    }

    /// Report on the live store
    pub fn status(&self) -> StoreStatus {
        let store = self.store_path();
        let (exists, size) = match fs::metadata(store) {
            Ok(meta) if meta.is_file() => (true, meta.len()),
            _ => (false, 0),
        };
        StoreStatus {
            store_path: store.to_path_buf(),
            exists,
            size,
            format_version: FormatVersion::CURRENT.to_string(),
            extension: BUNDLE_EXTENSION.to_string(),
            application_version: self.config.application_version.clone(),
        }
    }

    fn replace_store(&self, entries: &BundleEntries) -> Result<RestoreSource> {
        let store = self.store_path();
        let dir = parent_dir(store);
        fs::create_dir_all(&dir).map_err(|e| BundleError::io(Phase::Replacement, &dir, e))?;

        match stage_snapshot(&dir, entries.require(paths::SNAPSHOT)?)? {
            SnapshotStage::Ready(staged) => {
                install(staged, store)?;
                Ok(RestoreSource::Snapshot)
            }
            SnapshotStage::Incompatible(reason) => {
                warn!(%reason, "snapshot unusable, replaying schema and data scripts");
                let schema = script_text(entries, paths::SCHEMA)?;
                let data = script_text(entries, paths::DATA)?;
                let staged = stage_from_scripts(&dir, schema, data)?;
                install(staged, store)?;
                Ok(RestoreSource::Scripts)
            }
        }
    }

    /// Put the safety backup back after a failed replacement
    fn revert(&self, cause: BundleError, backup: Option<&Path>) -> BundleError {
        let Some(backup) = backup else {
            warn!(error = %cause, "restore failed; there was no previous store to revert to");
            return cause;
        };

        match revert_from_backup(backup, self.store_path()) {
            Ok(()) => {
                warn!(error = %cause, backup = %backup.display(), "restore failed, store reverted");
                cause
            }
            Err(reversion) => {
                let fatal = BundleError::ReversionFailed {
                    backup: backup.to_path_buf(),
                    cause: Box::new(cause),
                    reversion: Box::new(reversion),
                };
                error!(error = %fatal, "store may be damaged");
                fatal
            }
        }
    }
}

/// Builder for [`BundleManager`].
///
/// # Example
///
/// ```ignore
/// let manager = BundleManager::builder()
///     .store_path("/var/lib/vitanet/vitanet.db")
///     .backup_dir("/var/lib/vitanet/backups")
///     .compression_level(9)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct BundleManagerBuilder {
    config: BundleConfig,
}

impl BundleManagerBuilder {
    /// Builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration
    pub fn config(mut self, config: BundleConfig) -> Self {
        self.config = config;
        self
    }

    /// Live store path
    pub fn store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_path = path.into();
        self
    }

    /// Version stamped into new descriptors
    pub fn application_version(mut self, version: impl Into<String>) -> Self {
        self.config.application_version = version.into();
        self
    }

    /// zstd level, 1..=22
    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.compression_level = level;
        self
    }

    /// Directory for safety backups
    pub fn backup_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.backup_dir = Some(dir.into());
        self
    }

    /// Validate the configuration and build the manager
    pub fn build(self) -> Result<BundleManager> {
        BundleManager::new(self.config)
    }
}

/// Append `.bundle` unless `path` already ends with it
fn with_bundle_extension(path: &Path) -> PathBuf {
    if path.extension().is_some_and(|ext| ext == BUNDLE_EXTENSION) {
        return path.to_path_buf();
    }
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(BUNDLE_EXTENSION);
    PathBuf::from(name)
}

fn script_text<'a>(entries: &'a BundleEntries, name: &str) -> Result<&'a str> {
    let bytes = entries.require(name)?;
    std::str::from_utf8(bytes).map_err(|e| BundleError::ImportFailed {
        script: name.to_string(),
        ordinal: 0,
        statement: String::new(),
        message: format!("script is not valid UTF-8: {}", e),
    })
}
