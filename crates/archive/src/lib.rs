//! Archive codec for VitaNet bundles
//!
//! Reads and writes the `.bundle` container: a zstd-compressed tar archive of
//! named entries. The codec knows nothing about databases; it moves named
//! byte blobs in and out of a file, checks their integrity, and never leaves
//! a half-written archive behind.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bundle;

pub use bundle::{
    paths, xxh3_hex, BundleEntries, BundleReader, BundleWriter, WrittenBundle, BUNDLE_EXTENSION,
};
