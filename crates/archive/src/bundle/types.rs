//! Entry names and the in-memory entry map

use std::collections::BTreeMap;
use vitanet_core::{BundleError, Result};

/// File extension reserved for bundles
pub const BUNDLE_EXTENSION: &str = "bundle";

/// Entry names inside the archive
pub mod paths {
    /// Directory every entry lives under
    pub const ROOT: &str = "bundle";
    /// Descriptor document
    pub const DESCRIPTOR: &str = "descriptor.json";
    /// Raw store file
    pub const SNAPSHOT: &str = "snapshot.db";
    /// Schema script
    pub const SCHEMA: &str = "schema.sql";
    /// Data script
    pub const DATA: &str = "data.sql";
    /// Integrity digests, written by the codec itself
    pub const CHECKSUMS: &str = "checksums.json";

    /// Path of `name` inside the tar
    pub fn archive_path(name: &str) -> String {
        format!("{}/{}", ROOT, name)
    }
}

/// xxh3-64 digest as 16 lowercase hex characters
pub fn xxh3_hex(data: &[u8]) -> String {
    format!("{:016x}", xxhash_rust::xxh3::xxh3_64(data))
}

/// Named entries of a bundle, ordered by name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleEntries {
    entries: BTreeMap<String, Vec<u8>>,
}

impl BundleEntries {
    /// Empty entry set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace an entry
    pub fn insert(&mut self, name: impl Into<String>, data: Vec<u8>) {
        self.entries.insert(name.into(), data);
    }

    /// Entry bytes, if present
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries.get(name).map(Vec::as_slice)
    }

    /// Entry bytes, or `MissingEntry`
    pub fn require(&self, name: &str) -> Result<&[u8]> {
        self.get(name).ok_or_else(|| BundleError::missing_entry(name))
    }

    /// Take an entry out of the set
    pub fn remove(&mut self, name: &str) -> Option<Vec<u8>> {
        self.entries.remove(name)
    }

    /// Whether `name` is present
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Entry names in archive order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// `(name, bytes)` pairs in archive order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// Uncompressed size of each entry
    pub fn sizes(&self) -> BTreeMap<String, u64> {
        self.entries
            .iter()
            .map(|(k, v)| (k.clone(), v.len() as u64))
            .collect()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
