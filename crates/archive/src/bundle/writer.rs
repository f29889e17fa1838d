//! Bundle archive writer
//!
//! Writes entries into a `.bundle` file via temp file + rename.

use crate::bundle::types::{paths, xxh3_hex, BundleEntries};
use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tar::{Builder, EntryType, Header};
use tracing::debug;
use vitanet_core::config::parent_dir;
use vitanet_core::{BundleError, Phase, Result};

/// Result of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBundle {
    /// Final archive location
    pub path: PathBuf,
    /// Compressed archive size in bytes
    pub size: u64,
    /// xxh3 digest of every entry
    pub checksums: BTreeMap<String, String>,
}

/// Writer for bundle archives
pub struct BundleWriter {
    compression_level: i32,
}

impl BundleWriter {
    /// Writer using the given zstd level
    pub fn new(compression_level: i32) -> Self {
        BundleWriter { compression_level }
    }

    /// Write `entries` to `path`.
    ///
    /// The archive is assembled in a temporary file in the same directory and
    /// renamed over `path` once fully flushed. On error nothing is left at
    /// `path` and the temporary file is removed.
    pub fn write(&self, entries: &BundleEntries, path: &Path) -> Result<WrittenBundle> {
        let dir = parent_dir(path);
        let mut tmp = tempfile::Builder::new()
            .prefix(".bundle-")
            .suffix(".partial")
            .tempfile_in(&dir)
            .map_err(|e| BundleError::io(Phase::ArchiveWrite, &dir, e))?;

        let checksums = {
            let writer = BufWriter::new(tmp.as_file_mut());
            let (checksums, writer) = self.write_to(entries, writer)?;
            writer
                .into_inner()
                .map_err(|e| BundleError::io(Phase::ArchiveWrite, path, e.into_error()))?;
            checksums
        };
        tmp.as_file()
            .sync_all()
            .map_err(|e| BundleError::io(Phase::ArchiveWrite, tmp.path(), e))?;

        tmp.persist(path)
            .map_err(|e| BundleError::io(Phase::ArchiveWrite, path, e.error))?;

        let size = std::fs::metadata(path)
            .map_err(|e| BundleError::io(Phase::ArchiveWrite, path, e))?
            .len();
        debug!(path = %path.display(), size, entries = entries.len(), "bundle archive written");

        Ok(WrittenBundle {
            path: path.to_path_buf(),
            size,
            checksums,
        })
    }

    /// Write `entries` to an in-memory buffer
    pub fn write_to_vec(&self, entries: &BundleEntries) -> Result<Vec<u8>> {
        let (_, data) = self.write_to(entries, Vec::new())?;
        Ok(data)
    }

    fn write_to<W: Write>(
        &self,
        entries: &BundleEntries,
        writer: W,
    ) -> Result<(BTreeMap<String, String>, W)> {
        let checksums: BTreeMap<String, String> = entries
            .iter()
            .filter(|(name, _)| *name != paths::CHECKSUMS)
            .map(|(name, data)| (name.to_string(), xxh3_hex(data)))
            .collect();
        let checksum_doc = serde_json::to_vec_pretty(&checksums)
            .map_err(|e| archive_error(format!("encode {}: {}", paths::CHECKSUMS, e)))?;

        let encoder = zstd::Encoder::new(writer, self.compression_level)
            .map_err(|e| archive_error(format!("zstd encode: {}", e)))?;
        let mut builder = Builder::new(encoder);

        // Checksums go first so single-entry reads can verify as they stream
        append_entry(&mut builder, paths::CHECKSUMS, &checksum_doc)?;
        for (name, data) in entries.iter() {
            if name == paths::CHECKSUMS {
                continue;
            }
            append_entry(&mut builder, name, data)?;
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| archive_error(format!("finish tar: {}", e)))?;
        let writer = encoder
            .finish()
            .map_err(|e| archive_error(format!("finish zstd: {}", e)))?;

        Ok((checksums, writer))
    }
}

fn append_entry<W: Write>(builder: &mut Builder<W>, name: &str, data: &[u8]) -> Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(data.len() as u64);
    header.set_mode(0o644);
    header.set_mtime(0);
    builder
        .append_data(&mut header, paths::archive_path(name), data)
        .map_err(|e| archive_error(format!("append {}: {}", name, e)))
}

fn archive_error(reason: String) -> BundleError {
    BundleError::CorruptArchive {
        phase: Phase::ArchiveWrite,
        reason,
    }
}
