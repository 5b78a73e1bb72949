//! Lazy command tree.
//!
//! The CLI is a tree of [`CommandLoader`]s. Each loader can enumerate the
//! names it serves without building anything and resolves exactly one name
//! per invocation into a [`CommandHandle`]: either a runnable leaf or a
//! nested loader for the next path segment. Only the path the user actually
//! typed is ever constructed, so start-up cost follows the depth of the
//! invoked command rather than the size of the tree.
//!
//! Three loaders exist:
//!
//! - [`StaticLoader`] serves the builtin commands from a compile-time table
//! - [`DirectoryLoader`] serves user commands from a directory of `.cmd`
//!   files and sub-folders
//! - [`CompositeLoader`] merges several loaders into one level

mod composite;
mod directory;
mod static_tree;

#[cfg(test)]
mod tests;

pub use composite::CompositeLoader;
pub use directory::{AliasCommand, AliasDefinition, DirectoryConfig, DirectoryLoader, RootFactory};
pub use static_tree::{Builder, StaticEntry, StaticLoader};

use std::ffi::OsString;
use std::process::ExitCode;

use clap::{Arg, ArgMatches};
use partcad_core::ErrorCode;
use thiserror::Error;

use crate::context::CliContext;

/// Name of the trailing argument that carries everything after a
/// subcommand name down to the next level.
const PASSTHROUGH_ARGS: &str = "args";

/// A runnable leaf command.
pub trait CliCommand {
    /// Returns the clap definition. The caller sets the command name.
    fn command(&self) -> clap::Command;

    /// Runs the command with its parsed arguments.
    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> anyhow::Result<ExitCode>;
}

/// The loaded form of one command name.
pub enum CommandHandle {
    /// A runnable command.
    Leaf(Box<dyn CliCommand>),
    /// A nested level of the tree.
    Group(Box<dyn CommandLoader>),
}

impl std::fmt::Debug for CommandHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CommandHandle::Leaf(_) => f.write_str("Leaf(..)"),
            CommandHandle::Group(_) => f.write_str("Group(..)"),
        }
    }
}

/// One level of the command tree.
pub trait CommandLoader {
    /// Help text for this level.
    fn about(&self) -> Option<String> {
        None
    }

    /// Names served at this level, sorted and free of duplicates.
    ///
    /// Enumeration never builds a command.
    fn list_commands(&self) -> Vec<String>;

    /// Returns true if `name` is served at this level.
    fn contains(&self, name: &str) -> bool {
        self.list_commands().iter().any(|n| n == name)
    }

    /// Short help for `name`, for listings.
    fn describe(&self, _name: &str) -> Option<String> {
        None
    }

    /// Resolves `name`. Fails for every name not in [`list_commands`].
    ///
    /// [`list_commands`]: CommandLoader::list_commands
    fn get_command(&self, name: &str) -> Result<CommandHandle, CommandLoadError>;
}

/// Why a command could not be loaded.
#[derive(Debug, Error)]
pub enum LoadErrorKind {
    /// No definition exists under this name.
    #[error("no such command")]
    NotFound,

    /// The definition is malformed.
    #[error("parse error: {0}")]
    Parse(String),

    /// The definition is well-formed but cannot be turned into a command.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// The definition lacks its entry point.
    #[error("missing entry point '{0}'")]
    MissingEntryPoint(&'static str),

    /// The definition could not be read.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// A failure to load one named command.
#[derive(Debug, Error)]
#[error("failed to load command '{name}': {kind}")]
pub struct CommandLoadError {
    /// The offending command.
    pub name: String,
    /// The underlying cause.
    #[source]
    pub kind: LoadErrorKind,
}

impl CommandLoadError {
    /// Creates an error for `name`.
    pub fn new(name: impl Into<String>, kind: LoadErrorKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Creates a not-found error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::new(name, LoadErrorKind::NotFound)
    }

    /// Returns true if the command simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self.kind, LoadErrorKind::NotFound)
    }
}

impl ErrorCode for CommandLoadError {
    fn code(&self) -> &'static str {
        match self.kind {
            LoadErrorKind::NotFound => "LOADER_001",
            LoadErrorKind::Parse(_) => "LOADER_002",
            LoadErrorKind::Evaluation(_) => "LOADER_003",
            LoadErrorKind::MissingEntryPoint(_) => "LOADER_004",
            LoadErrorKind::Io(_) => "LOADER_005",
        }
    }

    fn category(&self) -> &'static str {
        "loader"
    }
}

/// Builds the clap definition of one tree level.
///
/// Every name becomes a pass-through subcommand that swallows the rest of
/// the command line, so clap validates only the segment at this level.
/// Clap's own `help` subcommand is off: any name, `help` included, may come
/// from a user tree. `--help` still works.
pub fn group_command(loader: &dyn CommandLoader, bin_name: &str) -> clap::Command {
    let mut cmd = clap::Command::new(bin_name.to_string())
        .bin_name(bin_name.to_string())
        .disable_help_subcommand(true)
        .subcommand_required(true)
        .arg_required_else_help(true);
    if let Some(about) = loader.about() {
        cmd = cmd.about(about);
    }

    for name in loader.list_commands() {
        let mut sub = clap::Command::new(name.clone())
            .disable_help_flag(true)
            .arg(
                Arg::new(PASSTHROUGH_ARGS)
                    .num_args(0..)
                    .trailing_var_arg(true)
                    .allow_hyphen_values(true)
                    .value_parser(clap::value_parser!(OsString)),
            );
        if let Some(help) = loader.describe(&name) {
            sub = sub.about(help);
        }
        cmd = cmd.subcommand(sub);
    }
    cmd
}

/// Parses `args` against one tree level and runs the selected command.
pub fn run_tree(
    loader: &dyn CommandLoader,
    bin_name: &str,
    args: &[OsString],
    ctx: &mut CliContext,
) -> anyhow::Result<ExitCode> {
    let argv = std::iter::once(OsString::from(bin_name)).chain(args.iter().cloned());
    match group_command(loader, bin_name).try_get_matches_from(argv) {
        Ok(matches) => run_matches(loader, bin_name, &matches, ctx),
        Err(e) => Ok(clap_exit(e)),
    }
}

/// Runs the subcommand selected in already parsed `matches`.
///
/// Resolves one name through `loader`; a group recurses with the remaining
/// arguments, a leaf parses them with its own definition and runs.
pub fn run_matches(
    loader: &dyn CommandLoader,
    bin_name: &str,
    matches: &ArgMatches,
    ctx: &mut CliContext,
) -> anyhow::Result<ExitCode> {
    let Some((name, sub)) = matches.subcommand() else {
        return Ok(ExitCode::from(2));
    };
    let rest: Vec<OsString> = sub
        .get_many::<OsString>(PASSTHROUGH_ARGS)
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let path = format!("{} {}", bin_name, name);

    tracing::debug!("loading command '{}'", path);
    let handle = loader.get_command(name).map_err(|e| {
        tracing::error!("{}", e);
        e
    })?;

    match handle {
        CommandHandle::Group(child) => run_tree(child.as_ref(), &path, &rest, ctx),
        CommandHandle::Leaf(command) => {
            let argv = std::iter::once(OsString::from(&path)).chain(rest);
            let parsed = command
                .command()
                .name(name.to_string())
                .bin_name(path.clone())
                .try_get_matches_from(argv);
            match parsed {
                Ok(m) => command.run(&m, ctx),
                Err(e) => Ok(clap_exit(e)),
            }
        }
    }
}

/// Prints a clap error (or help/version output) and returns its exit code.
pub fn clap_exit(e: clap::Error) -> ExitCode {
    let _ = e.print();
    ExitCode::from(u8::try_from(e.exit_code()).unwrap_or(2))
}
