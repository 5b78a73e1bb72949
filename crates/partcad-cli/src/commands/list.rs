//! List command implementation

use anyhow::Result;
use clap::ArgMatches;
use colored::Colorize;
use partcad_core::{Domain, ImportDecl, ImportKind, Package};
use std::process::ExitCode;

use crate::context::CliContext;
use crate::loader::{CliCommand, CommandLoader, StaticEntry, StaticLoader};

static ENTRIES: &[StaticEntry] = &[
    StaticEntry::leaf("all", "List everything in the package", all),
    StaticEntry::leaf("assemblies", "List assemblies", assemblies),
    StaticEntry::leaf("packages", "List imported packages", packages),
    StaticEntry::leaf("parts", "List parts", parts),
    StaticEntry::leaf("sketches", "List sketches", sketches),
];

/// Returns the `list` group.
pub fn loader() -> Box<dyn CommandLoader> {
    Box::new(StaticLoader::new("List package contents", ENTRIES))
}

fn all() -> Box<dyn CliCommand> {
    Box::new(List(Scope::All))
}

fn assemblies() -> Box<dyn CliCommand> {
    Box::new(List(Scope::Objects(Domain::Assembly)))
}

fn packages() -> Box<dyn CliCommand> {
    Box::new(List(Scope::Packages))
}

fn parts() -> Box<dyn CliCommand> {
    Box::new(List(Scope::Objects(Domain::Part)))
}

fn sketches() -> Box<dyn CliCommand> {
    Box::new(List(Scope::Objects(Domain::Sketch)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    Packages,
    Objects(Domain),
}

/// `partcad list <scope>`
#[derive(Debug)]
struct List(Scope);

impl CliCommand for List {
    fn command(&self) -> clap::Command {
        clap::Command::new("list")
    }

    fn run(&self, _matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let registry = std::sync::Arc::clone(ctx.registry());
        let package = ctx.package()?;

        match self.0 {
            Scope::Packages => print_packages(package),
            Scope::Objects(domain) => print_objects(package, domain),
            Scope::All => {
                println!("{} {}", "Package:".cyan().bold(), package.name());
                print_packages(package);
                for domain in [Domain::Sketch, Domain::Part, Domain::Assembly] {
                    print_objects(package, domain);
                }

                let problems = package.validate(&registry);
                if !problems.is_empty() {
                    println!();
                    for problem in &problems {
                        println!("  {} {}", "!!".yellow(), problem);
                    }
                    return Ok(ExitCode::from(1));
                }
            }
        }
        Ok(ExitCode::SUCCESS)
    }
}

fn heading(domain: Domain) -> &'static str {
    match domain {
        Domain::Sketch => "Sketches:",
        Domain::Part => "Parts:",
        Domain::Assembly => "Assemblies:",
    }
}

fn print_objects(package: &Package, domain: Domain) {
    let objects = package.manifest().objects(domain);
    println!("{}", heading(domain).bold());
    if objects.is_empty() {
        println!("  {}", "(none)".dimmed());
        return;
    }
    let width = objects.keys().map(String::len).max().unwrap_or(0);
    for (name, config) in objects {
        let desc = config
            .desc
            .as_deref()
            .map(|d| format!("  {}", d.dimmed()))
            .unwrap_or_default();
        println!("  {:<width$}  {}{}", name, config.kind.cyan(), desc, width = width);
    }
}

fn location(decl: &ImportDecl) -> String {
    let place = match decl.effective_kind() {
        ImportKind::Git => decl.url.as_deref(),
        ImportKind::Local => decl.path.as_deref(),
    };
    let mut text = place.unwrap_or("?").to_string();
    if let Some(ref revision) = decl.revision {
        text.push_str(&format!("@{}", revision));
    }
    text
}

fn print_packages(package: &Package) {
    let imports = &package.manifest().import;
    println!("{}", "Packages:".bold());
    if imports.is_empty() {
        println!("  {}", "(none)".dimmed());
        return;
    }
    let width = imports.keys().map(String::len).max().unwrap_or(0);
    for (alias, decl) in imports {
        let kind = match decl.effective_kind() {
            ImportKind::Git => "git",
            ImportKind::Local => "local",
        };
        println!("  {:<width$}  {:<5}  {}", alias, kind.cyan(), location(decl), width = width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_location() {
        let mut decl = ImportDecl::git("https://github.com/partcad/partcad-index.git");
        decl.revision = Some("v1".to_string());
        assert_eq!(location(&decl), "https://github.com/partcad/partcad-index.git@v1");
        assert_eq!(location(&ImportDecl::local("../lib")), "../lib");
    }
}
