//! Bundle container format
//!
//! A bundle is a zstd-compressed tar archive with every entry under `bundle/`:
//!
//! ```text
//! nightly.bundle
//! └── bundle/
//!     ├── checksums.json   # xxh3 digest of every other entry
//!     ├── data.sql         # INSERT statements (if database_included)
//!     ├── descriptor.json  # format version, timestamps, custom metadata
//!     ├── schema.sql       # CREATE statements (if database_included)
//!     └── snapshot.db      # raw store file (if database_included)
//! ```
//!
//! ## Design Principles
//!
//! - **Atomic**: archives are written to a temporary file beside the
//!   destination and renamed into place only once complete
//! - **Inspectable**: `tar --zstd -xf` and `jq` can open any bundle
//! - **Deterministic**: the same entries always produce identical bytes
//! - **Verified**: every entry is checked against `checksums.json` on read

mod reader;
mod types;
mod writer;

pub use reader::BundleReader;
pub use types::{paths, xxh3_hex, BundleEntries, BUNDLE_EXTENSION};
pub use writer::{BundleWriter, WrittenBundle};
