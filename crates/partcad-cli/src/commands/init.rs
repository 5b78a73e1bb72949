//! Init command implementation

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches};
use colored::Colorize;
use partcad_core::{Package, MANIFEST_FILE};
use std::process::ExitCode;

use crate::context::CliContext;
use crate::loader::CliCommand;

/// `partcad init [--private]`
#[derive(Debug, Default)]
pub struct Init;

impl CliCommand for Init {
    fn command(&self) -> clap::Command {
        clap::Command::new("init")
            .about("Create a new package")
            .arg(
                Arg::new("private")
                    .long("private")
                    .action(ArgAction::SetTrue)
                    .help("Mark the package as private"),
            )
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let private = matches.get_flag("private");
        let path = ctx.package_path();
        // A path that does not exist yet names a directory unless it looks
        // like a manifest file.
        let target = if !path.exists() && path.extension().is_none() {
            path.join(MANIFEST_FILE)
        } else {
            path.to_path_buf()
        };
        let package = Package::create(&target, private)
            .with_context(|| format!("failed to initialize a package at {}", path.display()))?;

        println!(
            "{} {}",
            "Created".green().bold(),
            package.manifest_path().display()
        );
        ctx.set_package(package);
        Ok(ExitCode::SUCCESS)
    }
}
