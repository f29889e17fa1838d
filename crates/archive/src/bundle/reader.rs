//! Bundle archive reader
//!
//! Reads .bundle archives and validates their contents.

use crate::bundle::types::{paths, xxh3_hex, BundleEntries};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tar::Archive;
use tracing::debug;
use vitanet_core::{BundleError, Phase, Result};

type Checksums = BTreeMap<String, String>;

/// Reader for bundle archives
pub struct BundleReader;

impl BundleReader {
    /// Read every entry, verifying checksums.
    ///
    /// Fails with `CorruptArchive` if the container cannot be unpacked or an
    /// entry does not match `checksums.json`, and with `MissingEntry` if the
    /// descriptor is absent. The returned set does not include
    /// `checksums.json`.
    pub fn read(path: &Path) -> Result<BundleEntries> {
        let entries = Self::read_from(open(path)?)?;
        debug!(path = %path.display(), entries = entries.len(), "bundle archive read");
        Ok(entries)
    }

    /// Read every entry from an in-memory archive
    pub fn read_from_slice(data: &[u8]) -> Result<BundleEntries> {
        Self::read_from(data)
    }

    /// Read a single entry without buffering the others
    pub fn read_entry(path: &Path, name: &str) -> Result<Vec<u8>> {
        Self::read_entry_from(open(path)?, name)
    }

    /// Read a single entry from an in-memory archive
    pub fn read_entry_from_slice(data: &[u8], name: &str) -> Result<Vec<u8>> {
        Self::read_entry_from(data, name)
    }

    /// Names of all entries, in archive order, excluding `checksums.json`
    pub fn entry_names(path: &Path) -> Result<Vec<String>> {
        let mut archive = Archive::new(decoder(open(path)?)?);
        let mut names = Vec::new();
        for entry in archive.entries().map_err(corrupt)? {
            let entry = entry.map_err(corrupt)?;
            if let Some(name) = entry_name(&entry)? {
                if name != paths::CHECKSUMS {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    fn read_from<R: Read>(reader: R) -> Result<BundleEntries> {
        let mut archive = Archive::new(decoder(reader)?);
        let mut entries = BundleEntries::new();
        let mut checksums: Option<Checksums> = None;

        for entry in archive.entries().map_err(corrupt)? {
            let mut entry = entry.map_err(corrupt)?;
            let Some(name) = entry_name(&entry)? else {
                continue;
            };
            let data = read_body(&mut entry, &name)?;
            if name == paths::CHECKSUMS {
                checksums = Some(parse_checksums(&data)?);
            } else {
                entries.insert(name, data);
            }
        }

        match &checksums {
            Some(expected) => verify_all(expected, &entries)?,
            None => debug!("bundle has no {}, skipping verification", paths::CHECKSUMS),
        }

        entries.require(paths::DESCRIPTOR)?;
        Ok(entries)
    }

    fn read_entry_from<R: Read>(reader: R, target: &str) -> Result<Vec<u8>> {
        let mut archive = Archive::new(decoder(reader)?);
        let mut checksums: Option<Checksums> = None;
        let mut found: Option<Vec<u8>> = None;

        for entry in archive.entries().map_err(corrupt)? {
            let mut entry = entry.map_err(corrupt)?;
            let Some(name) = entry_name(&entry)? else {
                continue;
            };
            if name == paths::CHECKSUMS {
                checksums = Some(parse_checksums(&read_body(&mut entry, &name)?)?);
            } else if name == target {
                found = Some(read_body(&mut entry, &name)?);
            }
            // The manifest is written first, so this normally stops at the target
            if checksums.is_some() && found.is_some() {
                break;
            }
        }

        let data = found.ok_or_else(|| BundleError::missing_entry(target))?;
        match checksums {
            Some(expected) => {
                let digest = expected.get(target).ok_or_else(|| {
                    BundleError::corrupt(format!("{} present but not listed in checksums", target))
                })?;
                verify_one(target, digest, &data)?;
            }
            None => debug!(entry = target, "bundle has no {}, entry unverified", paths::CHECKSUMS),
        }
        Ok(data)
    }
}

fn open(path: &Path) -> Result<File> {
    if !path.exists() {
        return Err(BundleError::NotFound {
            path: path.to_path_buf(),
        });
    }
    File::open(path).map_err(|e| BundleError::io(Phase::ArchiveRead, path, e))
}

fn decoder<R: Read>(reader: R) -> Result<zstd::Decoder<'static, BufReader<R>>> {
    zstd::Decoder::new(reader).map_err(|e| BundleError::corrupt(format!("zstd decode: {}", e)))
}

fn corrupt(e: std::io::Error) -> BundleError {
    BundleError::corrupt(e.to_string())
}

/// Entry name relative to the bundle root; `None` for anything outside it
fn entry_name<R: Read>(entry: &tar::Entry<'_, R>) -> Result<Option<String>> {
    let path = entry.path().map_err(corrupt)?;
    let path = path.to_string_lossy();
    let prefix = format!("{}/", paths::ROOT);
    Ok(path
        .strip_prefix(&prefix)
        .filter(|name| !name.is_empty() && !name.contains('/'))
        .map(str::to_string))
}

fn read_body<R: Read>(entry: &mut tar::Entry<'_, R>, name: &str) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    entry
        .read_to_end(&mut data)
        .map_err(|e| BundleError::corrupt(format!("read {}: {}", name, e)))?;
    Ok(data)
}

fn parse_checksums(data: &[u8]) -> Result<Checksums> {
    serde_json::from_slice(data)
        .map_err(|e| BundleError::corrupt(format!("{}: {}", paths::CHECKSUMS, e)))
}

fn verify_one(name: &str, expected: &str, data: &[u8]) -> Result<()> {
    let actual = xxh3_hex(data);
    if actual != expected {
        return Err(BundleError::corrupt(format!(
            "checksum mismatch for {}: expected {}, got {}",
            name, expected, actual
        )));
    }
    Ok(())
}

fn verify_all(expected: &Checksums, entries: &BundleEntries) -> Result<()> {
    for (name, digest) in expected {
        let data = entries
            .get(name)
            .ok_or_else(|| BundleError::corrupt(format!("{} listed in checksums but absent", name)))?;
        verify_one(name, digest, data)?;
    }
    if let Some(extra) = entries.names().find(|n| !expected.contains_key(*n)) {
        return Err(BundleError::corrupt(format!(
            "{} present but not listed in checksums",
            extra
        )));
    }
    Ok(())
}
