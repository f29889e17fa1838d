//! Live store access for VitaNet bundles
//!
//! This crate is the only place that talks to SQLite:
//! - export: schema and data scripts, deterministic and lossless
//! - import: transactional replay of those scripts
//! - snapshot: consistent capture of a live store and compatibility checks
//! - replace: staging a new store beside the live one and swapping it in
//! - backup: safety copies taken before a restore, and reverting to them
//!
//! Every function takes a path and closes its connection before returning;
//! no handle outlives a call.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backup;
pub mod export;
pub mod import;
pub mod replace;
pub mod snapshot;

pub use backup::{checkpoint_wal, revert_from_backup, take_safety_backup};
pub use export::{export_data, export_schema, quote_identifier, sql_literal, to_script};
pub use import::{import_data, import_schema};
pub use replace::{install, remove_sidecars, stage_from_scripts, stage_snapshot, SnapshotStage, StagedStore};
pub use snapshot::{capture_store, check_snapshot_header, CapturedStore, SQLITE_HEADER_MAGIC};
