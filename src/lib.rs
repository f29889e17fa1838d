//! # VitaNet bundles
//!
//! Portable backup and restore for the VitaNet nutrition store.
//!
//! A bundle is a single `.bundle` file holding a descriptor, a raw snapshot
//! of the SQLite store, and schema and data scripts that can rebuild it when
//! the snapshot cannot be used.
//!
//! ## Quick Start
//!
//! ```ignore
//! use vitanet::prelude::*;
//!
//! let manager = BundleManager::open("./vitanet.db")?;
//!
//! // Back up
//! let created = manager.create("./nightly", CustomMetadata::new())?;
//!
//! // Inspect without touching the store
//! let info = manager.info(&created.path)?;
//! assert!(info.descriptor.database_included);
//!
//! // Restore; `force` acknowledges that the current store is replaced
//! let restored = manager.restore(&created.path, true)?;
//! ```
//!
//! ## Safety
//!
//! - Bundles with an unknown `format_version` are rejected before any
//!   other entry is read.
//! - An existing store is copied to a safety backup before it is replaced,
//!   and reverted from it if replacement fails.
//! - Archives are written to a temporary file and renamed into place.

#![warn(missing_docs)]

mod manager;
mod types;

pub mod prelude;

// Re-export main entry points
pub use manager::{BundleManager, BundleManagerBuilder};
pub use types::{BundleInfo, CreateSummary, RestoreSource, RestoreSummary, StoreStatus};

// Re-export core types
pub use vitanet_core::{
    BundleConfig, BundleDescriptor, BundleError, CustomMetadata, FormatVersion, Phase, Result,
};

/// Alias for [`BundleError`]
pub type Error = BundleError;

// Re-export archive constants
pub use vitanet_archive::{paths, BUNDLE_EXTENSION};
