//! Bundle descriptor - the metadata document embedded in every bundle
//!
//! ```json
//! {
//!   "format_version": "1.0",
//!   "created_at": "2025-01-24T10:00:00+00:00",
//!   "application_version": "1.0",
//!   "database_included": true,
//!   "custom_metadata": {"description": "nightly backup"}
//! }
//! ```
//!
//! ## Version Gating
//!
//! Accepted format versions are the variants of [`FormatVersion`]. Parsing an
//! inbound descriptor checks `format_version` against that allowlist before
//! anything else is deserialized, and unknown fields are rejected rather than
//! skipped. An older build reading a newer bundle fails closed.

use crate::error::{BundleError, Result};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Caller-supplied metadata, carried through untouched
pub type CustomMetadata = serde_json::Map<String, Value>;

/// Archive format versions this build can write and restore.
///
/// Supporting a new format is one variant here plus one entry in
/// [`FormatVersion::SUPPORTED`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatVersion {
    /// Initial format: descriptor, snapshot, schema and data scripts
    #[serde(rename = "1.0")]
    V1_0,
}

impl FormatVersion {
    /// Version stamped on newly created bundles
    pub const CURRENT: FormatVersion = FormatVersion::V1_0;

    /// Every version `parse` accepts
    pub const SUPPORTED: &'static [FormatVersion] = &[FormatVersion::V1_0];

    /// Wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatVersion::V1_0 => "1.0",
        }
    }

    /// Look up a wire string in the allowlist. Exact match only.
    pub fn parse(s: &str) -> Option<FormatVersion> {
        Self::SUPPORTED.iter().copied().find(|v| v.as_str() == s)
    }

    /// Wire strings of all supported versions
    pub fn supported_strings() -> Vec<String> {
        Self::SUPPORTED.iter().map(|v| v.as_str().to_string()).collect()
    }
}

impl std::fmt::Display for FormatVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metadata document describing a bundle.
///
/// Built fresh by every create; never modified once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BundleDescriptor {
    /// Archive format version
    pub format_version: FormatVersion,
    /// Creation instant
    pub created_at: DateTime<FixedOffset>,
    /// Version of the application that produced the bundle
    pub application_version: String,
    /// Whether snapshot, schema and data entries are present
    pub database_included: bool,
    /// Opaque caller metadata
    #[serde(default)]
    pub custom_metadata: CustomMetadata,
}

impl BundleDescriptor {
    /// Build a descriptor for a bundle being created now
    pub fn build(
        application_version: impl Into<String>,
        database_included: bool,
        custom_metadata: CustomMetadata,
    ) -> Self {
        BundleDescriptor {
            format_version: FormatVersion::CURRENT,
            created_at: Utc::now().into(),
            application_version: application_version.into(),
            database_included,
            custom_metadata,
        }
    }

    /// Serialize as pretty-printed JSON
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(self).map_err(|e| BundleError::malformed(e.to_string()))
    }

    /// Parse and validate an inbound descriptor.
    ///
    /// Fails with `VersionMismatch` if `format_version` is not in the
    /// allowlist and `MalformedDescriptor` for anything else that is wrong.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let raw: Value =
            serde_json::from_slice(data).map_err(|e| BundleError::malformed(e.to_string()))?;

        let object = raw
            .as_object()
            .ok_or_else(|| BundleError::malformed("descriptor is not a JSON object"))?;

        let version = match object.get("format_version") {
            Some(Value::String(s)) => s.as_str(),
            Some(other) => {
                return Err(BundleError::malformed(format!(
                    "format_version must be a string, got {}",
                    other
                )))
            }
            None => return Err(BundleError::malformed("format_version missing")),
        };
        Self::check_version(version)?;

        serde_json::from_value(raw).map_err(|e| BundleError::malformed(e.to_string()))
    }

    /// Check a wire version string against the allowlist
    pub fn check_version(version: &str) -> Result<FormatVersion> {
        FormatVersion::parse(version).ok_or_else(|| BundleError::VersionMismatch {
            found: version.to_string(),
            supported: FormatVersion::supported_strings(),
        })
    }
}
