//! vitanet-bundle: create, restore and inspect VitaNet bundles.
//!
//! ```text
//! vitanet-bundle [--db-path PATH] [--config FILE] [--json] [-v...] <COMMAND>
//!   create  <BUNDLE> [--description TEXT] [--meta KEY=VALUE]...
//!   restore <BUNDLE> [--force]
//!   info    <BUNDLE>
//!   status
//! ```
//!
//! Exit status is 0 on success, 2 when a restore needs `--force`, and 1 for
//! every other failure.

mod commands;
mod format;
mod parse;

use std::process;

use anyhow::Context;
use tracing::Level;
use vitanet::BundleManager;

use commands::build_cli;
use format::{
    exit_code, format_create, format_error, format_info, format_restore, format_status, OutputMode,
};
use parse::{load_config, matches_to_action, CliAction};

fn main() {
    let matches = build_cli().get_matches();

    let output_mode = if matches.get_flag("json") {
        OutputMode::Json
    } else {
        OutputMode::Human
    };
    init_logging(matches.get_count("verbose"));

    let code = match run(&matches, output_mode) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{}", output);
            }
            0
        }
        Err(e) => {
            eprintln!("{}", format_error(&e, output_mode));
            exit_code(&e)
        }
    };
    process::exit(code);
}

/// Logs go to stderr so `--json` output on stdout stays parseable.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .with_target(false)
        .init();
}

fn run(matches: &clap::ArgMatches, mode: OutputMode) -> anyhow::Result<String> {
    let action = matches_to_action(matches).map_err(anyhow::Error::msg)?;
    let config = load_config(matches).context("loading configuration")?;
    let manager = BundleManager::new(config)?;

    let output = match action {
        CliAction::Create { bundle, metadata } => {
            format_create(&manager.create(&bundle, metadata)?, mode)
        }
        CliAction::Restore { bundle, force } => {
            format_restore(&manager.restore(&bundle, force)?, mode)
        }
        CliAction::Info { bundle } => format_info(&manager.info(&bundle)?, mode),
        CliAction::Status => format_status(&manager.status(), mode),
    };
    Ok(output)
}
