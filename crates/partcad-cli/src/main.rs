//! PartCAD CLI - package manager for CAD models
//!
//! Global flags are parsed here; everything after the first command name is
//! handed to the lazily loaded command tree.

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches};
use colored::Colorize;
use partcad_core::FormatRegistry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use partcad_cli::commands;
use partcad_cli::config::UserConfig;
use partcad_cli::context::CliContext;
use partcad_cli::loader::{clap_exit, group_command, run_matches, CommandLoader};
use partcad_cli::logging::{LogFormat, LogOptions, Verbosity};

const BIN_NAME: &str = "partcad";

fn global_args(cmd: clap::Command) -> clap::Command {
    cmd.version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Show debug output"),
        )
        .arg(
            Arg::new("quiet")
                .short('q')
                .long("quiet")
                .action(ArgAction::SetTrue)
                .help("Suppress log output"),
        )
        .arg(
            Arg::new("no-ansi")
                .long("no-ansi")
                .action(ArgAction::SetTrue)
                .help("Plain output without colors"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_parser(clap::value_parser!(LogFormat))
                .help("Log line prefix"),
        )
        .arg(
            Arg::new("package")
                .short('p')
                .long("package")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value(".")
                .help("Package directory or partcad.yaml file"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .value_parser(clap::value_parser!(PathBuf))
                .help("User config file (default: ~/.partcad/config.yaml)"),
        )
}

fn log_options(matches: &ArgMatches) -> LogOptions {
    LogOptions {
        verbosity: Verbosity::from_flags(matches.get_flag("quiet"), matches.get_flag("verbose")),
        no_ansi: matches.get_flag("no-ansi"),
        format: matches.get_one::<LogFormat>("format").copied(),
    }
}

fn run(root: &dyn CommandLoader, matches: &ArgMatches, config: UserConfig) -> Result<ExitCode> {
    let registry = Arc::new(FormatRegistry::builtin().context("invalid builtin format table")?);
    let package_path = matches
        .get_one::<PathBuf>("package")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."));
    let mut ctx = CliContext::new(registry, config, package_path);
    run_matches(root, BIN_NAME, matches, &mut ctx)
}

fn main() -> ExitCode {
    // Global flags decide how the user tree is found, so the config is read
    // from a first parse against the builtin tree only.
    let builtin = commands::builtin_tree();
    let early = global_args(group_command(builtin.as_ref(), BIN_NAME))
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true)
        .ignore_errors(true)
        .get_matches();
    let options = log_options(&early);
    if options.no_ansi {
        colored::control::set_override(false);
    }
    if let Err(e) = options.init() {
        eprintln!("{} {:#}", "warning:".yellow(), e);
    }

    let config_path = early.get_one::<PathBuf>("config").cloned();
    let config = match UserConfig::load_with_env(config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), anyhow::Error::new(e));
            return ExitCode::from(1);
        }
    };

    let root = commands::root_loader(&config);
    let matches = match global_args(group_command(root.as_ref(), BIN_NAME)).try_get_matches() {
        Ok(matches) => matches,
        Err(e) => return clap_exit(e),
    };

    match run(root.as_ref(), &matches, config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "error:".red().bold(), e);
            ExitCode::from(1)
        }
    }
}
