//! Add command implementation
//!
//! Records files that already exist in (or next to) the package, and
//! declares dependencies on other packages.

use anyhow::{bail, Result};
use clap::{Arg, ArgMatches};
use colored::Colorize;
use partcad_core::{Domain, ImportDecl, ObjectConfig};
use std::path::PathBuf;
use std::process::ExitCode;

use super::{capability_names, file_stem, package_relative};
use crate::context::CliContext;
use crate::loader::{CliCommand, CommandLoader, StaticEntry, StaticLoader};

static ENTRIES: &[StaticEntry] = &[
    StaticEntry::leaf("assembly", "Add an existing assembly file", assembly),
    StaticEntry::leaf("dep", "Add a dependency on another package", dep),
    StaticEntry::leaf("part", "Add an existing part file", part),
    StaticEntry::leaf("sketch", "Add an existing sketch file", sketch),
];

/// Returns the `add` group.
pub fn loader() -> Box<dyn CommandLoader> {
    Box::new(StaticLoader::new(
        "Add a file or a dependency to the package",
        ENTRIES,
    ))
}

fn part() -> Box<dyn CliCommand> {
    Box::new(AddObject::new(Domain::Part))
}

fn sketch() -> Box<dyn CliCommand> {
    Box::new(AddObject::new(Domain::Sketch))
}

fn assembly() -> Box<dyn CliCommand> {
    Box::new(AddObject::new(Domain::Assembly))
}

fn dep() -> Box<dyn CliCommand> {
    Box::new(AddDependency)
}

/// `partcad add part|sketch|assembly <kind> <path>`
#[derive(Debug, Clone, Copy)]
pub struct AddObject {
    domain: Domain,
}

impl AddObject {
    pub fn new(domain: Domain) -> Self {
        Self { domain }
    }

    /// Capabilities whose formats may be added to this domain.
    fn capabilities(&self) -> &'static [&'static str] {
        match self.domain {
            Domain::Assembly => &["yaml_described", "importable"],
            Domain::Part | Domain::Sketch => &["importable"],
        }
    }
}

impl CliCommand for AddObject {
    fn command(&self) -> clap::Command {
        clap::Command::new(self.domain.as_str())
            .about(format!("Add an existing {} file", self.domain))
            .arg(Arg::new("kind").required(true).help("Object type, e.g. step or cadquery"))
            .arg(
                Arg::new("path")
                    .required(true)
                    .value_parser(clap::value_parser!(PathBuf))
                    .help("File to add"),
            )
            .arg(Arg::new("name").long("name").help("Object name (default: file stem)"))
            .arg(Arg::new("desc").long("desc").help("Description"))
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let domain = self.domain;
        let kind = matches.get_one::<String>("kind").cloned().unwrap_or_default();
        let path = matches.get_one::<PathBuf>("path").cloned().unwrap_or_default();
        let desc = matches.get_one::<String>("desc").cloned();

        let allowed = capability_names(ctx.registry(), domain, self.capabilities())?;
        if !allowed.contains(&kind.as_str()) {
            bail!(
                "'{}' is not a valid {} type (expected one of: {})",
                kind,
                domain,
                allowed.join(", ")
            );
        }
        if !path.is_file() {
            bail!("file not found: {}", path.display());
        }
        let name = match matches.get_one::<String>("name") {
            Some(name) => name.clone(),
            None => file_stem(&path)?,
        };

        let package = ctx.package()?;
        if package.get(domain, &name).is_some() {
            bail!("{} '{}' already exists in the package", domain, name);
        }
        let relative = package_relative(package, &path)?;
        package.set_object(
            domain,
            name.clone(),
            ObjectConfig::new(kind.as_str())
                .with_path(relative.as_str())
                .with_desc(desc),
        );
        package.save()?;

        println!(
            "{} {} '{}' ({}) from {}",
            "Added".green().bold(),
            domain,
            name,
            kind,
            relative
        );
        Ok(ExitCode::SUCCESS)
    }
}

/// Returns true if `location` names a git repository rather than a path.
pub fn is_git_location(location: &str) -> bool {
    location.contains("://") || location.starts_with("git@") || location.ends_with(".git")
}

/// `partcad add dep <alias> <location>`
#[derive(Debug, Default)]
pub struct AddDependency;

impl CliCommand for AddDependency {
    fn command(&self) -> clap::Command {
        clap::Command::new("dep")
            .about("Add a dependency on another package")
            .arg(Arg::new("alias").required(true).help("Name the package is imported as"))
            .arg(
                Arg::new("location")
                    .required(true)
                    .help("Local path or git URL of the package"),
            )
            .arg(
                Arg::new("revision")
                    .long("revision")
                    .help("Git branch, tag or commit"),
            )
            .arg(Arg::new("desc").long("desc").help("Description"))
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let alias = matches.get_one::<String>("alias").cloned().unwrap_or_default();
        let location = matches.get_one::<String>("location").cloned().unwrap_or_default();
        let revision = matches.get_one::<String>("revision").cloned();

        let mut decl = if is_git_location(&location) {
            let mut decl = ImportDecl::git(location.as_str());
            decl.revision = revision;
            decl
        } else {
            if revision.is_some() {
                bail!("--revision only applies to git dependencies");
            }
            ImportDecl::local(location.as_str())
        };
        decl.desc = matches.get_one::<String>("desc").cloned();
        let kind = decl.effective_kind();

        let package = ctx.package()?;
        if package.manifest().import.contains_key(&alias) {
            bail!("dependency '{}' already exists in the package", alias);
        }
        package.manifest_mut().import.insert(alias.clone(), decl);
        package.save()?;

        println!(
            "{} dependency '{}' ({:?}: {})",
            "Added".green().bold(),
            alias,
            kind,
            location
        );
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_locations() {
        assert!(is_git_location("https://github.com/partcad/partcad-index"));
        assert!(is_git_location("git@github.com:partcad/partcad-index"));
        assert!(is_git_location("../index.git"));
        assert!(!is_git_location("../lib"));
        assert!(!is_git_location("/opt/parts"));
    }
}
