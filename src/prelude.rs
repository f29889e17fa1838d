//! Convenient imports for VitaNet bundles.
//!
//! ```ignore
//! use vitanet::prelude::*;
//!
//! let manager = BundleManager::open("./vitanet.db")?;
//! let created = manager.create("./nightly", CustomMetadata::new())?;
//! ```

// Main entry point
pub use crate::manager::{BundleManager, BundleManagerBuilder};

// Error handling
pub use crate::{BundleError, Error, Phase, Result};

// Configuration and descriptor
pub use crate::{BundleConfig, BundleDescriptor, CustomMetadata, FormatVersion};

// Operation results
pub use crate::types::{BundleInfo, CreateSummary, RestoreSource, RestoreSummary, StoreStatus};

// Re-export serde_json for convenience
pub use serde_json::json;
