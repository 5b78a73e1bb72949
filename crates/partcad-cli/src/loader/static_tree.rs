//! Compile-time command table.

use super::{CliCommand, CommandHandle, CommandLoadError, CommandLoader};

/// How to construct one entry.
#[derive(Clone, Copy)]
pub enum Builder {
    Leaf(fn() -> Box<dyn CliCommand>),
    Group(fn() -> Box<dyn CommandLoader>),
}

/// One row of a static command table.
#[derive(Clone, Copy)]
pub struct StaticEntry {
    pub name: &'static str,
    pub about: &'static str,
    pub build: Builder,
}

impl StaticEntry {
    /// A runnable command.
    pub const fn leaf(
        name: &'static str,
        about: &'static str,
        build: fn() -> Box<dyn CliCommand>,
    ) -> Self {
        Self {
            name,
            about,
            build: Builder::Leaf(build),
        }
    }

    /// A nested level.
    pub const fn group(
        name: &'static str,
        about: &'static str,
        build: fn() -> Box<dyn CommandLoader>,
    ) -> Self {
        Self {
            name,
            about,
            build: Builder::Group(build),
        }
    }
}

/// Serves a fixed table of commands. Nothing is constructed until
/// [`CommandLoader::get_command`] picks an entry.
#[derive(Clone, Copy)]
pub struct StaticLoader {
    about: &'static str,
    entries: &'static [StaticEntry],
}

impl StaticLoader {
    /// Creates a loader over `entries`.
    pub const fn new(about: &'static str, entries: &'static [StaticEntry]) -> Self {
        Self { about, entries }
    }

    fn entry(&self, name: &str) -> Option<&'static StaticEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl CommandLoader for StaticLoader {
    fn about(&self) -> Option<String> {
        Some(self.about.to_string())
    }

    fn list_commands(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.name.to_string()).collect();
        names.sort();
        names.dedup();
        names
    }

    fn contains(&self, name: &str) -> bool {
        self.entry(name).is_some()
    }

    fn describe(&self, name: &str) -> Option<String> {
        self.entry(name).map(|e| e.about.to_string())
    }

    fn get_command(&self, name: &str) -> Result<CommandHandle, CommandLoadError> {
        let entry = self
            .entry(name)
            .ok_or_else(|| CommandLoadError::not_found(name))?;
        Ok(match entry.build {
            Builder::Leaf(build) => CommandHandle::Leaf(build()),
            Builder::Group(build) => CommandHandle::Group(build()),
        })
    }
}
