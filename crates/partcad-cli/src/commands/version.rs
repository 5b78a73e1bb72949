//! Version command implementation

use anyhow::Result;
use clap::ArgMatches;
use colored::Colorize;
use std::process::ExitCode;

use crate::context::CliContext;
use crate::loader::CliCommand;

/// `partcad version`
#[derive(Debug, Default)]
pub struct Version;

impl CliCommand for Version {
    fn command(&self) -> clap::Command {
        clap::Command::new("version").about("Print version information")
    }

    fn run(&self, _matches: &ArgMatches, _ctx: &mut CliContext) -> Result<ExitCode> {
        println!("{}", "Versions:".bold());
        println!("  {} partcad-cli v{}", "->".green(), env!("CARGO_PKG_VERSION"));
        println!("  {} partcad-core v{}", "->".green(), partcad_core::VERSION);
        println!(
            "  {} wrapper protocol v{}",
            "->".green(),
            partcad_core::PROTOCOL_VERSION
        );
        Ok(ExitCode::SUCCESS)
    }
}
