//! Clap command tree for `vitanet-bundle`.

use clap::{Arg, ArgAction, Command};

/// Build the top-level CLI.
pub fn build_cli() -> Command {
    Command::new("vitanet-bundle")
        .about("Create, restore and inspect VitaNet bundles")
        .version(env!("CARGO_PKG_VERSION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("db-path")
                .long("db-path")
                .value_name("PATH")
                .global(true)
                .help("Live store file [default: vitanet.db]"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("TOML configuration file; flags override its values"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Print machine-readable JSON"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .global(true)
                .help("More logging on stderr (-v info, -vv debug, -vvv trace)"),
        )
        .subcommand(create_cmd())
        .subcommand(restore_cmd())
        .subcommand(info_cmd())
        .subcommand(Command::new("status").about("Show the live store and bundle format"))
}

fn bundle_arg() -> Arg {
    Arg::new("bundle")
        .required(true)
        .value_name("BUNDLE")
        .help("Bundle file")
}

fn create_cmd() -> Command {
    Command::new("create")
        .about("Write a bundle of the live store")
        .arg(bundle_arg().help("Destination; .bundle is appended if missing"))
        .arg(
            Arg::new("description")
                .long("description")
                .short('d')
                .value_name("TEXT")
                .help("Stored as custom_metadata.description"),
        )
        .arg(
            Arg::new("meta")
                .long("meta")
                .short('m')
                .value_name("KEY=VALUE")
                .action(ArgAction::Append)
                .help("Extra custom metadata; VALUE is parsed as JSON, else kept as a string"),
        )
}

fn restore_cmd() -> Command {
    Command::new("restore")
        .about("Replace the live store with a bundle's contents")
        .arg(bundle_arg())
        .arg(
            Arg::new("force")
                .long("force")
                .short('f')
                .action(ArgAction::SetTrue)
                .help("Replace an existing store (a safety backup is taken first)"),
        )
}

fn info_cmd() -> Command {
    Command::new("info")
        .about("Describe a bundle without touching the live store")
        .arg(bundle_arg())
}
