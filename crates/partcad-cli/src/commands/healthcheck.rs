//! Healthcheck command implementation
//!
//! Runs tagged host checks. Warnings do not fail the command; any failed
//! check makes it exit with 1.

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches};
use colored::Colorize;
use std::fs;
use std::process::ExitCode;

use crate::context::CliContext;
use crate::loader::{CliCommand, CommandLoader, DirectoryConfig, DirectoryLoader};

/// Result of one check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Warn,
    Fail,
}

/// One line of a check's report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub status: Status,
    pub message: String,
}

impl Finding {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            status: Status::Ok,
            message: message.into(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: Status::Warn,
            message: message.into(),
        }
    }

    fn fail(message: impl Into<String>) -> Self {
        Self {
            status: Status::Fail,
            message: message.into(),
        }
    }
}

/// A named, tagged host check.
pub struct Check {
    pub name: &'static str,
    pub tags: &'static [&'static str],
    pub run: fn(&mut CliContext) -> Vec<Finding>,
}

impl Check {
    /// Returns true if the check carries any of `filters`, or if there are
    /// no filters.
    pub fn selected(&self, filters: &[String]) -> bool {
        filters.is_empty() || self.tags.iter().any(|t| filters.iter().any(|f| f == t))
    }
}

/// Every check, in report order.
pub static CHECKS: &[Check] = &[
    Check {
        name: "python",
        tags: &["python", "backends"],
        run: check_python,
    },
    Check {
        name: "wrappers",
        tags: &["python", "backends", "config"],
        run: check_wrappers_dir,
    },
    Check {
        name: "state-dir",
        tags: &["filesystem"],
        run: check_state_dir,
    },
    Check {
        name: "backends",
        tags: &["backends"],
        run: check_backends,
    },
    Check {
        name: "commands",
        tags: &["config"],
        run: check_commands_dir,
    },
    Check {
        name: "package",
        tags: &["package"],
        run: check_package,
    },
];

fn check_python(ctx: &mut CliContext) -> Vec<Finding> {
    match ctx.runner().find_python() {
        Ok(path) => vec![Finding::ok(format!("python at {}", path.display()))],
        Err(e) => vec![Finding::warn(format!("{} (python backends are unavailable)", e))],
    }
}

fn check_wrappers_dir(ctx: &mut CliContext) -> Vec<Finding> {
    match ctx.config().wrappers_dir {
        Some(ref dir) if dir.is_dir() => {
            vec![Finding::ok(format!("wrappers in {}", dir.display()))]
        }
        Some(ref dir) => vec![Finding::fail(format!(
            "wrappers directory {} does not exist",
            dir.display()
        ))],
        None => vec![Finding::warn(
            "no wrappers directory configured (set wrappersDir or PC_WRAPPERS_DIR)",
        )],
    }
}

fn check_state_dir(ctx: &mut CliContext) -> Vec<Finding> {
    let dir = ctx.state_dir();
    let marker = dir.join(".partcad_write_test");
    let result = fs::create_dir_all(&dir).and_then(|_| fs::write(&marker, "test"));
    match result {
        Ok(()) => {
            let _ = fs::remove_file(&marker);
            vec![Finding::ok(format!("{} is writable", dir.display()))]
        }
        Err(e) => vec![Finding::fail(format!("cannot write to {}: {}", dir.display(), e))],
    }
}

fn check_backends(ctx: &mut CliContext) -> Vec<Finding> {
    let backends = match ctx.backends() {
        Ok(backends) => backends,
        Err(e) => return vec![Finding::fail(format!("{:#}", e))],
    };
    let runner = ctx.runner();
    backends
        .iter()
        .map(|backend| {
            let label = format!(
                "{} ({}, {})",
                backend.name,
                backend.domain,
                backend.interface.describe()
            );
            if runner.is_available(&backend.interface) {
                Finding::ok(label)
            } else {
                Finding::warn(format!("{} unavailable", label))
            }
        })
        .collect()
}

fn check_commands_dir(ctx: &mut CliContext) -> Vec<Finding> {
    let Some(ref dir) = ctx.config().commands_dir else {
        return vec![Finding::ok("no user commands configured")];
    };
    if !dir.is_dir() {
        return vec![Finding::fail(format!(
            "commands directory {} does not exist",
            dir.display()
        ))];
    }

    let mut findings = Vec::new();
    let loader = DirectoryLoader::new(DirectoryConfig::new(dir, super::builtin_tree));
    walk_commands(&loader, "", &mut findings);
    if findings.is_empty() {
        findings.push(Finding::ok(format!("{} holds no commands", dir.display())));
    }
    findings
}

fn walk_commands(loader: &dyn CommandLoader, prefix: &str, findings: &mut Vec<Finding>) {
    for name in loader.list_commands() {
        let path = format!("{}{}", prefix, name);
        match loader.get_command(&name) {
            Ok(crate::loader::CommandHandle::Leaf(_)) => findings.push(Finding::ok(path)),
            Ok(crate::loader::CommandHandle::Group(child)) => {
                walk_commands(child.as_ref(), &format!("{} ", path), findings)
            }
            Err(e) => findings.push(Finding::fail(e.to_string())),
        }
    }
}

fn check_package(ctx: &mut CliContext) -> Vec<Finding> {
    let registry = std::sync::Arc::clone(ctx.registry());
    let package = match ctx.package() {
        Ok(package) => package,
        Err(e) => return vec![Finding::warn(format!("{:#}", e))],
    };
    let problems = package.validate(&registry);
    if problems.is_empty() {
        return vec![Finding::ok(format!("package '{}' is valid", package.name()))];
    }
    problems
        .into_iter()
        .map(|p| Finding::fail(p.to_string()))
        .collect()
}

/// `partcad healthcheck [--filters tags] [--dry-run]`
#[derive(Debug, Default)]
pub struct Healthcheck;

impl CliCommand for Healthcheck {
    fn command(&self) -> clap::Command {
        clap::Command::new("healthcheck")
            .about("Check the host for PartCAD requirements")
            .arg(
                Arg::new("filters")
                    .long("filters")
                    .value_delimiter(',')
                    .help("Only run checks with these tags (comma separated)"),
            )
            .arg(
                Arg::new("dry-run")
                    .long("dry-run")
                    .action(ArgAction::SetTrue)
                    .help("List the selected checks without running them"),
            )
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let filters: Vec<String> = matches
            .get_many::<String>("filters")
            .map(|values| values.cloned().collect())
            .unwrap_or_default();
        let dry_run = matches.get_flag("dry-run");

        println!("{}", "PartCAD Healthcheck".cyan().bold());
        println!("{}", "===================".cyan());

        let mut failed = 0usize;
        let mut ran = 0usize;
        for check in CHECKS.iter().filter(|c| c.selected(&filters)) {
            ran += 1;
            println!();
            println!("{} {}", check.name.bold(), format!("[{}]", check.tags.join(", ")).dimmed());
            if dry_run {
                continue;
            }
            for finding in (check.run)(ctx) {
                let marker = match finding.status {
                    Status::Ok => "ok".green(),
                    Status::Warn => "!!".yellow(),
                    Status::Fail => {
                        failed += 1;
                        "!!".red()
                    }
                };
                println!("  {} {}", marker, finding.message);
            }
        }

        println!();
        if ran == 0 {
            println!("{} no check matches {}", "WARNING".yellow().bold(), filters.join(","));
            return Ok(ExitCode::SUCCESS);
        }
        if dry_run {
            println!("{} {} checks selected", "DRY RUN".cyan().bold(), ran);
            Ok(ExitCode::SUCCESS)
        } else if failed == 0 {
            println!("{} All checks passed!", "SUCCESS".green().bold());
            Ok(ExitCode::SUCCESS)
        } else {
            println!("{} {} problems found. See above for details.", "FAILED".red().bold(), failed);
            Ok(ExitCode::from(1))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UserConfig;
    use partcad_core::FormatRegistry;
    use std::sync::Arc;

    fn context(config: UserConfig, dir: &std::path::Path) -> CliContext {
        CliContext::new(Arc::new(FormatRegistry::builtin().unwrap()), config, dir)
    }

    #[test]
    fn test_filters_select_by_tag() {
        let python = &CHECKS[0];
        assert!(python.selected(&[]));
        assert!(python.selected(&["backends".to_string()]));
        assert!(!python.selected(&["filesystem".to_string()]));
    }

    #[test]
    fn test_state_dir_check() {
        let dir = tempfile::tempdir().unwrap();
        let config = UserConfig {
            internal_state_dir: Some(dir.path().join("state")),
            ..Default::default()
        };
        let findings = check_state_dir(&mut context(config, dir.path()));
        assert_eq!(findings[0].status, Status::Ok);
        assert!(!dir.path().join("state/.partcad_write_test").exists());
    }

    #[test]
    fn test_builtin_mesh_backend_is_available() {
        let dir = tempfile::tempdir().unwrap();
        let findings = check_backends(&mut context(UserConfig::default(), dir.path()));
        let mesh = findings.iter().find(|f| f.message.starts_with("mesh ")).unwrap();
        assert_eq!(mesh.status, Status::Ok);
    }

    #[test]
    fn test_commands_check_reports_broken_alias() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("good.cmd"), "run: version").unwrap();
        fs::write(dir.path().join("bad.cmd"), "run: [unclosed").unwrap();
        let config = UserConfig {
            commands_dir: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let findings = check_commands_dir(&mut context(config, dir.path()));
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].status, Status::Fail);
        assert!(findings[0].message.contains("'bad'"));
        assert_eq!(findings[1], Finding::ok("good"));
    }

    #[test]
    fn test_missing_package_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let findings = check_package(&mut context(UserConfig::default(), dir.path()));
        assert_eq!(findings[0].status, Status::Warn);
    }
}
