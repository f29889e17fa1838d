//! Result types returned by the bundle manager.
//!
//! All of them serialize to JSON so callers (and the command-line tool) can
//! hand them straight to other programs.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use vitanet_core::BundleDescriptor;

/// Outcome of [`BundleManager::create`](crate::BundleManager::create).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateSummary {
    /// Archive written, with the `.bundle` extension applied
    pub path: PathBuf,
    /// Compressed archive size in bytes
    pub size: u64,
    /// Descriptor stored in the archive
    pub descriptor: BundleDescriptor,
    /// Uncompressed size of each entry, keyed by entry name
    pub entry_sizes: BTreeMap<String, u64>,
    /// xxh3 digest of each entry as recorded in `checksums.json`
    pub checksums: BTreeMap<String, String>,
}

/// Which artifact a restore installed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RestoreSource {
    /// The raw snapshot image was installed directly
    Snapshot,
    /// The snapshot was unusable; schema and data scripts were replayed
    Scripts,
    /// The bundle carried no database; the store was left as it was
    Nothing,
}

impl RestoreSource {
    /// Lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            RestoreSource::Snapshot => "snapshot",
            RestoreSource::Scripts => "scripts",
            RestoreSource::Nothing => "nothing",
        }
    }
}

impl std::fmt::Display for RestoreSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`BundleManager::restore`](crate::BundleManager::restore).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RestoreSummary {
    /// Archive restored from
    pub source: PathBuf,
    /// What was installed
    pub restored_from: RestoreSource,
    /// Descriptor of the restored bundle
    pub descriptor: BundleDescriptor,
    /// Copy of the previous store, if there was one
    pub safety_backup: Option<PathBuf>,
}

/// Read-only view of a bundle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleInfo {
    /// Archive inspected
    pub path: PathBuf,
    /// Compressed archive size in bytes
    pub size: u64,
    /// Validated descriptor
    pub descriptor: BundleDescriptor,
    /// Entry names, excluding the checksum manifest
    pub entries: Vec<String>,
    /// `snapshot.db` present
    pub has_snapshot: bool,
    /// `schema.sql` present
    pub has_schema: bool,
    /// `data.sql` present
    pub has_data: bool,
}

/// State of the live store as the manager sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStatus {
    /// Configured store path
    pub store_path: PathBuf,
    /// Whether a store file exists there
    pub exists: bool,
    /// Store size in bytes, zero when absent
    pub size: u64,
    /// Bundle format version this build writes
    pub format_version: String,
    /// Extension applied to bundle files
    pub extension: String,
    /// Application version stamped into new bundles
    pub application_version: String,
}
