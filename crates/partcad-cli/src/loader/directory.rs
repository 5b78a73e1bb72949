//! User command trees on disk.
//!
//! A commands directory holds `<name>.cmd` files and sub-folders. A file is a
//! YAML alias onto the builtin tree:
//!
//! ```yaml
//! help: Convert every part of the package to STL
//! run: convert bracket -t stl -O out
//! ```
//!
//! `run` may also be a list of arguments when one of them contains spaces.
//! A folder is a nested group; its optional `index.cmd` carries the group
//! help and is never listed as a command. When a file and a folder share a
//! name the folder wins. Entries starting with `.` or `_` are ignored.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Arg, ArgMatches};
use serde::Deserialize;

use super::{
    run_tree, CliCommand, CommandHandle, CommandLoadError, CommandLoader, LoadErrorKind,
};
use crate::context::CliContext;

/// Constructs the tree that aliases resolve into.
pub type RootFactory = fn() -> Box<dyn CommandLoader>;

/// Settings for a [`DirectoryLoader`].
#[derive(Clone)]
pub struct DirectoryConfig {
    /// Directory served by the loader.
    pub root: PathBuf,
    /// Suffix of command files.
    pub suffix: &'static str,
    /// File holding the group help of a folder.
    pub index_file: &'static str,
    /// Tree that aliases run against.
    pub alias_root: RootFactory,
}

impl DirectoryConfig {
    /// Default layout rooted at `root`.
    pub fn new(root: impl Into<PathBuf>, alias_root: RootFactory) -> Self {
        Self {
            root: root.into(),
            suffix: ".cmd",
            index_file: "index.cmd",
            alias_root,
        }
    }

    fn child(&self, name: &str) -> Self {
        Self {
            root: self.root.join(name),
            ..self.clone()
        }
    }
}

/// Contents of a `.cmd` file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AliasDefinition {
    #[serde(default)]
    pub help: Option<String>,
    #[serde(default)]
    pub run: Option<AliasRun>,
}

/// The `run` entry of an alias.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AliasRun {
    Line(String),
    Args(Vec<String>),
}

impl AliasRun {
    fn argv(&self) -> Vec<String> {
        match self {
            AliasRun::Line(line) => line.split_whitespace().map(str::to_string).collect(),
            AliasRun::Args(args) => args.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryKind {
    File,
    Folder,
}

/// Serves the commands found in one directory.
pub struct DirectoryLoader {
    config: DirectoryConfig,
}

impl DirectoryLoader {
    /// Creates a loader; the directory is read lazily.
    pub fn new(config: DirectoryConfig) -> Self {
        Self { config }
    }

    /// Returns the directory served.
    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn entries(&self) -> BTreeMap<String, EntryKind> {
        let mut entries = BTreeMap::new();
        let Ok(dir) = fs::read_dir(&self.config.root) else {
            return entries;
        };

        for entry in dir.flatten() {
            let file_name = entry.file_name().to_string_lossy().to_string();
            if file_name.starts_with('.') || file_name.starts_with('_') {
                continue;
            }
            let path = entry.path();
            if path.is_dir() {
                // Folder beats a same-named file.
                entries.insert(file_name, EntryKind::Folder);
            } else if file_name != self.config.index_file {
                if let Some(stem) = file_name.strip_suffix(self.config.suffix) {
                    if !stem.is_empty() {
                        entries.entry(stem.to_string()).or_insert(EntryKind::File);
                    }
                }
            }
        }
        entries
    }

    fn kind_of(&self, name: &str) -> Option<EntryKind> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with(['.', '_']) {
            return None;
        }
        let folder = self.config.root.join(name);
        if folder.is_dir() {
            return Some(EntryKind::Folder);
        }
        let file = self.config.root.join(format!("{}{}", name, self.config.suffix));
        if file.is_file() && name != self.index_stem() {
            return Some(EntryKind::File);
        }
        None
    }

    fn index_stem(&self) -> &str {
        self.config
            .index_file
            .strip_suffix(self.config.suffix)
            .unwrap_or(self.config.index_file)
    }

    fn command_file(&self, name: &str) -> PathBuf {
        self.config.root.join(format!("{}{}", name, self.config.suffix))
    }

    fn read_definition(path: &Path, name: &str) -> Result<AliasDefinition, CommandLoadError> {
        let content = fs::read_to_string(path)
            .map_err(|e| CommandLoadError::new(name, LoadErrorKind::Io(e)))?;
        if content.trim().is_empty() {
            return Ok(AliasDefinition::default());
        }
        serde_yaml::from_str(&content)
            .map_err(|e| CommandLoadError::new(name, LoadErrorKind::Parse(e.to_string())))
    }

    /// Loads and checks one alias file.
    fn load_alias(&self, name: &str) -> Result<AliasCommand, CommandLoadError> {
        let definition = Self::read_definition(&self.command_file(name), name)?;
        let argv = definition
            .run
            .as_ref()
            .map(AliasRun::argv)
            .unwrap_or_default();
        if argv.is_empty() {
            return Err(CommandLoadError::new(
                name,
                LoadErrorKind::MissingEntryPoint("run"),
            ));
        }

        let root = (self.config.alias_root)();
        check_alias_target(root.as_ref(), &argv, 0)
            .map_err(|msg| CommandLoadError::new(name, LoadErrorKind::Evaluation(msg)))?;

        Ok(AliasCommand {
            help: definition.help,
            argv,
            alias_root: self.config.alias_root,
        })
    }
}

/// Walks `argv` through the tree and checks that it ends on a runnable
/// command.
fn check_alias_target(
    level: &dyn CommandLoader,
    argv: &[String],
    depth: usize,
) -> Result<(), String> {
    let Some(segment) = argv.get(depth) else {
        return Err(format!("'{}' is a command group, not a command", argv.join(" ")));
    };
    match level.get_command(segment) {
        Ok(CommandHandle::Leaf(_)) => Ok(()),
        Ok(CommandHandle::Group(next)) => check_alias_target(next.as_ref(), argv, depth + 1),
        Err(e) if e.is_not_found() => Err(format!(
            "'{}' is not a known command",
            argv[..=depth].join(" ")
        )),
        Err(e) => Err(e.to_string()),
    }
}

impl CommandLoader for DirectoryLoader {
    fn about(&self) -> Option<String> {
        let index = self.config.root.join(self.config.index_file);
        if !index.is_file() {
            return None;
        }
        Self::read_definition(&index, self.config.index_file)
            .ok()
            .and_then(|d| d.help)
    }

    fn list_commands(&self) -> Vec<String> {
        self.entries().into_keys().collect()
    }

    fn contains(&self, name: &str) -> bool {
        self.kind_of(name).is_some()
    }

    fn describe(&self, name: &str) -> Option<String> {
        match self.kind_of(name)? {
            EntryKind::Folder => DirectoryLoader::new(self.config.child(name)).about(),
            EntryKind::File => Self::read_definition(&self.command_file(name), name)
                .ok()
                .and_then(|d| d.help),
        }
    }

    fn get_command(&self, name: &str) -> Result<CommandHandle, CommandLoadError> {
        match self.kind_of(name) {
            Some(EntryKind::Folder) => Ok(CommandHandle::Group(Box::new(DirectoryLoader::new(
                self.config.child(name),
            )))),
            Some(EntryKind::File) => {
                let alias = self.load_alias(name).map_err(|e| {
                    tracing::warn!("{}", e);
                    e
                })?;
                Ok(CommandHandle::Leaf(Box::new(alias)))
            }
            None => Err(CommandLoadError::not_found(name)),
        }
    }
}

/// A user command that expands to a builtin command line.
#[derive(Debug, Clone)]
pub struct AliasCommand {
    help: Option<String>,
    argv: Vec<String>,
    alias_root: RootFactory,
}

impl AliasCommand {
    /// Returns the expansion.
    pub fn argv(&self) -> &[String] {
        &self.argv
    }
}

const EXTRA_ARGS: &str = "extra";

impl CliCommand for AliasCommand {
    fn command(&self) -> clap::Command {
        let mut cmd = clap::Command::new("alias").arg(
            Arg::new(EXTRA_ARGS)
                .help("Arguments appended to the alias")
                .num_args(0..)
                .trailing_var_arg(true)
                .allow_hyphen_values(true)
                .value_parser(clap::value_parser!(OsString)),
        );
        let expansion = format!("Runs: partcad {}", self.argv.join(" "));
        match self.help {
            Some(ref help) => {
                cmd = cmd
                    .about(help.clone())
                    .long_about(format!("{}\n\n{}", help, expansion));
            }
            None => cmd = cmd.about(expansion),
        }
        cmd
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> anyhow::Result<ExitCode> {
        let mut args: Vec<OsString> = self.argv.iter().map(OsString::from).collect();
        if let Some(extra) = matches.get_many::<OsString>(EXTRA_ARGS) {
            args.extend(extra.cloned());
        }
        tracing::debug!("alias expands to {:?}", args);
        let root = (self.alias_root)();
        run_tree(root.as_ref(), "partcad", &args, ctx)
    }
}
