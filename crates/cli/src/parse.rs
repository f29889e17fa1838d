//! ArgMatches → CliAction conversion.
//!
//! Translates clap's parsed arguments into the action to run and the
//! configuration to run it with. Nothing here touches the filesystem except
//! reading `--config`.

use clap::ArgMatches;
use serde_json::Value;
use std::path::{Path, PathBuf};
use vitanet::{BundleConfig, CustomMetadata};

/// The result of parsing the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum CliAction {
    /// Write a bundle of the live store.
    Create {
        bundle: PathBuf,
        metadata: CustomMetadata,
    },
    /// Replace the live store from a bundle.
    Restore { bundle: PathBuf, force: bool },
    /// Describe a bundle.
    Info { bundle: PathBuf },
    /// Describe the live store.
    Status,
}

/// Convert clap ArgMatches into a CliAction.
pub fn matches_to_action(matches: &ArgMatches) -> Result<CliAction, String> {
    let (sub_name, sub_matches) = matches
        .subcommand()
        .ok_or_else(|| "No command provided".to_string())?;

    match sub_name {
        "create" => parse_create(sub_matches),
        "restore" => Ok(CliAction::Restore {
            bundle: bundle_path(sub_matches)?,
            force: sub_matches.get_flag("force"),
        }),
        "info" => Ok(CliAction::Info {
            bundle: bundle_path(sub_matches)?,
        }),
        "status" => Ok(CliAction::Status),
        other => Err(format!("Unknown command: {}", other)),
    }
}

/// Configuration from `--config`, with `--db-path` applied on top.
pub fn load_config(matches: &ArgMatches) -> vitanet::Result<BundleConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => BundleConfig::from_file(Path::new(path))?,
        None => BundleConfig::default(),
    };
    if let Some(db_path) = matches.get_one::<String>("db-path") {
        config.store_path = PathBuf::from(db_path);
    }
    config.validate()?;
    Ok(config)
}

fn bundle_path(matches: &ArgMatches) -> Result<PathBuf, String> {
    matches
        .get_one::<String>("bundle")
        .map(PathBuf::from)
        .ok_or_else(|| "Missing BUNDLE argument".to_string())
}

// =========================================================================
// Create
// =========================================================================

fn parse_create(matches: &ArgMatches) -> Result<CliAction, String> {
    let bundle = bundle_path(matches)?;
    let mut metadata = CustomMetadata::new();

    if let Some(pairs) = matches.get_many::<String>("meta") {
        for raw in pairs {
            let (key, value) = parse_meta(raw)?;
            metadata.insert(key, value);
        }
    }
    // --description wins over --meta description=...
    if let Some(description) = matches.get_one::<String>("description") {
        metadata.insert("description".to_string(), Value::String(description.clone()));
    }

    Ok(CliAction::Create { bundle, metadata })
}

/// Parse `KEY=VALUE`. VALUE is taken as JSON when it parses, else as a string.
pub fn parse_meta(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("Expected KEY=VALUE, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("Empty metadata key in '{}'", raw));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
