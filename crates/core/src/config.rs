//! Bundle manager configuration
//!
//! Loaded from TOML or built in code. The application version stamped into
//! descriptors comes from here and nowhere else.
//!
//! ```toml
//! store_path = "/var/lib/vitanet/vitanet.db"
//! application_version = "1.4.0"
//! compression_level = 3
//! backup_dir = "/var/lib/vitanet/backups"
//! ```

use crate::error::{BundleError, Phase, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default store file name
pub const DEFAULT_STORE_PATH: &str = "vitanet.db";

/// Default zstd compression level
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 3;

/// Configuration for a bundle manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Live store file
    pub store_path: PathBuf,
    /// Version recorded in every descriptor this manager builds
    pub application_version: String,
    /// zstd level (1..=22)
    pub compression_level: i32,
    /// Where safety backups go; beside the store when unset
    pub backup_dir: Option<PathBuf>,
}

impl Default for BundleConfig {
    fn default() -> Self {
        BundleConfig {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            application_version: env!("CARGO_PKG_VERSION").to_string(),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            backup_dir: None,
        }
    }
}

impl BundleConfig {
    /// Parse from a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: BundleConfig =
            toml::from_str(s).map_err(|e| BundleError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| BundleError::io(Phase::Validation, path, e))?;
        Self::from_toml_str(&text)
    }

    /// Reject values no manager can work with
    pub fn validate(&self) -> Result<()> {
        if self.application_version.trim().is_empty() {
            return Err(BundleError::InvalidConfig(
                "application_version must not be empty".to_string(),
            ));
        }
        if !(1..=22).contains(&self.compression_level) {
            return Err(BundleError::InvalidConfig(format!(
                "compression_level must be within 1..=22, got {}",
                self.compression_level
            )));
        }
        if self.store_path.as_os_str().is_empty() {
            return Err(BundleError::InvalidConfig(
                "store_path must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory safety backups are written to
    pub fn backup_dir(&self) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => dir.clone(),
            None => parent_dir(&self.store_path),
        }
    }
}

/// Parent directory of `path`, `.` for bare file names
pub fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
