//! Core types for VitaNet bundles
//!
//! This crate defines the pieces every other layer shares:
//! - `BundleError`: the single error type, tagged with the phase it occurred in
//! - `BundleDescriptor`: the metadata document embedded in every bundle
//! - `FormatVersion`: the allowlist of archive formats this build can restore
//! - `BundleConfig`: manager configuration (store path, application version)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod descriptor;
pub mod error;

pub use config::BundleConfig;
pub use descriptor::{BundleDescriptor, CustomMetadata, FormatVersion};
pub use error::{BundleError, Phase, Result};
