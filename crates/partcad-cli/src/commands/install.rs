//! Install command implementation
//!
//! Resolves every import of the package. Local imports must point at a
//! package; git imports are cloned into the internal state directory. An
//! existing clone is reused as is unless the caller forces a fetch, which is
//! what `update` does.

use anyhow::{bail, Context, Result};
use clap::{Arg, ArgAction, ArgMatches};
use colored::Colorize;
use partcad_core::{ImportDecl, ImportKind, Package};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};

use crate::context::CliContext;
use crate::loader::CliCommand;

/// Sub-directory of the internal state directory holding git clones.
pub const GIT_CACHE_DIR: &str = "git";

/// Returns the clone directory of a git import.
///
/// The directory name is derived from the URL and revision so that two
/// packages importing the same repository share one clone.
pub fn git_cache_dir(state_dir: &Path, url: &str, revision: Option<&str>) -> PathBuf {
    let key = match revision {
        Some(rev) => format!("{}#{}", url, rev),
        None => url.to_string(),
    };
    let hash = blake3::hash(key.as_bytes()).to_hex();
    state_dir.join(GIT_CACHE_DIR).join(&hash.as_str()[..16])
}

/// `partcad install`
#[derive(Debug, Default)]
pub struct Install;

impl CliCommand for Install {
    fn command(&self) -> clap::Command {
        clap::Command::new("install")
            .about("Fetch the packages this package imports")
            .arg(
                Arg::new("dry-run")
                    .long("dry-run")
                    .action(ArgAction::SetTrue)
                    .help("Show what would be fetched"),
            )
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        resolve_imports(ctx, matches.get_flag("dry-run"), Fetch::IfMissing)
    }
}

/// When to talk to a git remote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Fetch {
    /// Clone missing repositories; reuse existing clones.
    IfMissing,
    /// Also fetch into existing clones.
    Always,
}

/// Resolves every import of the current package and prints one line each.
pub(crate) fn resolve_imports(
    ctx: &mut CliContext,
    dry_run: bool,
    fetch: Fetch,
) -> Result<ExitCode> {
    let state_dir = ctx.state_dir();
    let package = ctx.package()?;
    let imports: Vec<(String, ImportDecl)> = package
        .manifest()
        .import
        .iter()
        .map(|(alias, decl)| (alias.clone(), decl.clone()))
        .collect();
    let package_dir = package.dir().to_path_buf();

    if imports.is_empty() {
        println!("{}", "No dependencies to install".dimmed());
        return Ok(ExitCode::SUCCESS);
    }

    let mut failed = 0usize;
    for (alias, decl) in &imports {
        let outcome = match decl.effective_kind() {
            ImportKind::Local => check_local(&package_dir, decl),
            ImportKind::Git if dry_run => {
                let url = decl.url.as_deref().unwrap_or_default();
                let dir = git_cache_dir(&state_dir, url, decl.revision.as_deref());
                Ok(format!("would fetch into {}", dir.display()))
            }
            ImportKind::Git => fetch_git(&state_dir, decl, fetch),
        };
        match outcome {
            Ok(detail) => println!("  {} {} ({})", "ok".green(), alias, detail),
            Err(e) => {
                failed += 1;
                println!("  {} {}: {:#}", "!!".red(), alias, e);
            }
        }
    }

    if failed == 0 {
        println!("{} {} dependencies", "Resolved".green().bold(), imports.len());
        Ok(ExitCode::SUCCESS)
    } else {
        println!(
            "{} {} of {} dependencies failed",
            "FAILED".red().bold(),
            failed,
            imports.len()
        );
        Ok(ExitCode::from(1))
    }
}

fn check_local(package_dir: &Path, decl: &ImportDecl) -> Result<String> {
    let path = decl
        .path
        .as_deref()
        .context("local import without a path")?;
    let dir = package_dir.join(path);
    let package = Package::load(&dir)?;
    Ok(format!("local package '{}'", package.name()))
}

fn fetch_git(state_dir: &Path, decl: &ImportDecl, fetch: Fetch) -> Result<String> {
    let url = decl.url.as_deref().context("git import without a url")?;
    let dest = git_cache_dir(state_dir, url, decl.revision.as_deref());
    let cloned = dest.join(".git").is_dir();
    if cloned && fetch == Fetch::IfMissing {
        return Ok(format!("cached {}", dest.display()));
    }
    let git = which::which("git").context("git not found in PATH")?;

    if cloned {
        tracing::info!("fetching {} in {}", url, dest.display());
        run_git(Command::new(&git).arg("-C").arg(&dest).args(["fetch", "--quiet", "origin"]))?;
    } else {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        tracing::info!("cloning {} into {}", url, dest.display());
        run_git(Command::new(&git).args(["clone", "--quiet", url]).arg(&dest))?;
    }

    if let Some(ref revision) = decl.revision {
        run_git(
            Command::new(&git)
                .arg("-C")
                .arg(&dest)
                .args(["checkout", "--quiet", revision.as_str()]),
        )?;
    }
    Ok(format!("git {}", dest.display()))
}

fn run_git(cmd: &mut Command) -> Result<()> {
    tracing::debug!("running {:?}", cmd);
    let output = cmd.output().context("failed to run git")?;
    if !output.status.success() {
        bail!(
            "git exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_git_cache_dir_is_stable() {
        let state = Path::new("/state");
        let a = git_cache_dir(state, "https://github.com/partcad/partcad-index.git", None);
        let b = git_cache_dir(state, "https://github.com/partcad/partcad-index.git", None);
        let pinned = git_cache_dir(state, "https://github.com/partcad/partcad-index.git", Some("v1"));

        assert_eq!(a, b);
        assert_ne!(a, pinned);
        assert!(a.starts_with("/state/git"));
        assert_eq!(a.file_name().unwrap().len(), 16);
    }

    #[test]
    fn test_check_local() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("lib")).unwrap();
        std::fs::write(dir.path().join("lib/partcad.yaml"), "name: lib\n").unwrap();

        let detail = check_local(dir.path(), &ImportDecl::local("lib")).unwrap();
        assert_eq!(detail, "local package 'lib'");
        assert!(check_local(dir.path(), &ImportDecl::local("missing")).is_err());
    }

    #[test]
    fn test_existing_clone_is_reused_without_git() {
        let dir = tempfile::tempdir().unwrap();
        let decl = ImportDecl::git("https://example.invalid/lib.git");
        let dest = git_cache_dir(dir.path(), "https://example.invalid/lib.git", None);
        std::fs::create_dir_all(dest.join(".git")).unwrap();

        let detail = fetch_git(dir.path(), &decl, Fetch::IfMissing).unwrap();
        assert!(detail.starts_with("cached"), "{detail}");
    }
}
