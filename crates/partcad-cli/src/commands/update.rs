//! Update command implementation

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches};
use std::process::ExitCode;

use super::install::{resolve_imports, Fetch};
use crate::context::CliContext;
use crate::loader::CliCommand;

/// `partcad update [--dry-run]`: like `install`, but fetches into existing
/// clones too.
#[derive(Debug, Default)]
pub struct Update;

impl CliCommand for Update {
    fn command(&self) -> clap::Command {
        clap::Command::new("update")
            .about("Fetch the latest revision of every imported package")
            .arg(
                Arg::new("dry-run")
                    .long("dry-run")
                    .action(ArgAction::SetTrue)
                    .help("Show what would be fetched"),
            )
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        resolve_imports(ctx, matches.get_flag("dry-run"), Fetch::Always)
    }
}
