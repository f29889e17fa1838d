//! Error types for bundle operations
//!
//! Every bundle failure is a `BundleError`. Each variant records the phase in
//! which it occurred so callers never see a bare "operation failed".
//!
//! ## Error Codes
//!
//! | Code | Description |
//! |------|-------------|
//! | NotFound | Archive file does not exist |
//! | CorruptArchive | Container unreadable or entry checksum mismatch |
//! | MissingEntry | A structurally required entry is absent |
//! | VersionMismatch | Descriptor format version unknown to this build |
//! | MalformedDescriptor | Descriptor present but unparseable |
//! | ConfirmationRequired | Restore would overwrite a store without force |
//! | ExportFailed | A schema/data export query failed |
//! | ImportFailed | A schema/data replay statement failed |
//! | Io | Filesystem failure |
//! | InvalidConfig | Manager configuration rejected |
//! | ReversionFailed | Restoring the safety backup failed (data-loss risk) |

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Stage of a bundle operation, attached to every error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Reading and checking an inbound descriptor
    Validation,
    /// Copying the live store into the bundle
    SnapshotWrite,
    /// Emitting the schema script
    SchemaExport,
    /// Emitting the data script
    DataExport,
    /// Writing the archive container
    ArchiveWrite,
    /// Reading the archive container
    ArchiveRead,
    /// Copying the live store aside before a restore
    SafetyBackup,
    /// Replacing the live store with bundle contents
    Replacement,
    /// Putting the safety backup back after a failed replacement
    Reversion,
}

impl Phase {
    /// Stable lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Validation => "validation",
            Phase::SnapshotWrite => "snapshot write",
            Phase::SchemaExport => "schema export",
            Phase::DataExport => "data export",
            Phase::ArchiveWrite => "archive write",
            Phase::ArchiveRead => "archive read",
            Phase::SafetyBackup => "safety backup",
            Phase::Replacement => "replacement",
            Phase::Reversion => "reversion",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All bundle errors.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Archive file does not exist
    #[error("validation: bundle file not found: {}", .path.display())]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Container cannot be opened, unpacked, or fails its checksums
    #[error("{phase}: corrupt archive: {reason}")]
    CorruptArchive {
        /// Phase the corruption was detected in
        phase: Phase,
        /// What was wrong
        reason: String,
    },

    /// A required entry is absent
    #[error("validation: missing bundle entry: {entry}")]
    MissingEntry {
        /// Entry name
        entry: String,
    },

    /// Descriptor format version not in the allowlist
    #[error("validation: unsupported bundle format version {found:?} (supported: {})", .supported.join(", "))]
    VersionMismatch {
        /// Version string found in the descriptor
        found: String,
        /// Versions this build can restore
        supported: Vec<String>,
    },

    /// Descriptor present but unparseable
    #[error("validation: malformed descriptor: {reason}")]
    MalformedDescriptor {
        /// Parse failure detail
        reason: String,
    },

    /// Restore would overwrite an existing store without force
    #[error("validation: store {} already exists; restore requires force to overwrite", .store.display())]
    ConfirmationRequired {
        /// Existing store path
        store: PathBuf,
    },

    /// An export query failed
    #[error("{phase}: export failed at `{statement}`: {message}")]
    ExportFailed {
        /// SchemaExport or DataExport
        phase: Phase,
        /// Query or object being exported
        statement: String,
        /// Store engine message
        message: String,
    },

    /// A replay statement failed; the phase transaction was rolled back
    #[error("replacement: import of {script} failed at statement #{ordinal} `{statement}`: {message}")]
    ImportFailed {
        /// Script being replayed (`schema.sql` or `data.sql`)
        script: String,
        /// 1-based position of the statement in its script
        ordinal: usize,
        /// Statement text (empty if the statement could not be parsed)
        statement: String,
        /// Store engine message
        message: String,
    },

    /// Filesystem failure
    #[error("{phase}: I/O error on {}: {source}", .path.display())]
    Io {
        /// Phase the I/O happened in
        phase: Phase,
        /// File involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The safety backup could not be put back after a failed replacement.
    ///
    /// The live store may be damaged; the backup file is still on disk.
    #[error(
        "reversion: FATAL: restore failed ({cause}) and reverting from safety backup {} also failed ({reversion}); recover the store manually from that file",
        .backup.display()
    )]
    ReversionFailed {
        /// Safety backup that should be copied back by hand
        backup: PathBuf,
        /// Error that triggered the reversion
        cause: Box<BundleError>,
        /// Error raised while reverting
        reversion: Box<BundleError>,
    },
}

/// Result type for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;

impl BundleError {
    /// I/O failure on `path` during `phase`
    pub fn io(phase: Phase, path: impl AsRef<Path>, source: std::io::Error) -> Self {
        BundleError::Io {
            phase,
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Corrupt container detected while reading
    pub fn corrupt(reason: impl Into<String>) -> Self {
        BundleError::CorruptArchive {
            phase: Phase::ArchiveRead,
            reason: reason.into(),
        }
    }

    /// Required entry absent
    pub fn missing_entry(entry: impl Into<String>) -> Self {
        BundleError::MissingEntry {
            entry: entry.into(),
        }
    }

    /// Descriptor unparseable
    pub fn malformed(reason: impl Into<String>) -> Self {
        BundleError::MalformedDescriptor {
            reason: reason.into(),
        }
    }

    /// Phase this error occurred in
    pub fn phase(&self) -> Phase {
        match self {
            BundleError::NotFound { .. }
            | BundleError::MissingEntry { .. }
            | BundleError::VersionMismatch { .. }
            | BundleError::MalformedDescriptor { .. }
            | BundleError::ConfirmationRequired { .. }
            | BundleError::InvalidConfig(_) => Phase::Validation,
            BundleError::CorruptArchive { phase, .. }
            | BundleError::ExportFailed { phase, .. }
            | BundleError::Io { phase, .. } => *phase,
            BundleError::ImportFailed { .. } => Phase::Replacement,
            BundleError::ReversionFailed { .. } => Phase::Reversion,
        }
    }

    /// Canonical error code
    pub fn code(&self) -> &'static str {
        match self {
            BundleError::NotFound { .. } => "NotFound",
            BundleError::CorruptArchive { .. } => "CorruptArchive",
            BundleError::MissingEntry { .. } => "MissingEntry",
            BundleError::VersionMismatch { .. } => "VersionMismatch",
            BundleError::MalformedDescriptor { .. } => "MalformedDescriptor",
            BundleError::ConfirmationRequired { .. } => "ConfirmationRequired",
            BundleError::ExportFailed { .. } => "ExportFailed",
            BundleError::ImportFailed { .. } => "ImportFailed",
            BundleError::Io { .. } => "Io",
            BundleError::InvalidConfig(_) => "InvalidConfig",
            BundleError::ReversionFailed { .. } => "ReversionFailed",
        }
    }

    /// Check if this error was raised before any state could change.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            BundleError::NotFound { .. }
                | BundleError::CorruptArchive {
                    phase: Phase::ArchiveRead,
                    ..
                }
                | BundleError::MissingEntry { .. }
                | BundleError::VersionMismatch { .. }
                | BundleError::MalformedDescriptor { .. }
                | BundleError::ConfirmationRequired { .. }
        )
    }

    /// Check if this is the data-loss condition that needs operator attention.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BundleError::ReversionFailed { .. })
    }
}
