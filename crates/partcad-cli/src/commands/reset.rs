//! Reset command implementation

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, ArgMatches};
use colored::Colorize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use walkdir::WalkDir;

use crate::context::CliContext;
use crate::loader::CliCommand;

/// State sub-directories removed as a whole.
pub(crate) const CACHE_DIRS: &[&str] = &["git", "tar"];
/// State sub-directory whose contents are removed.
pub(crate) const RUNTIME_DIR: &str = "runtime";

/// Everything under `state_dir` that `reset` deletes.
pub fn reset_targets(state_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut targets: Vec<PathBuf> = CACHE_DIRS
        .iter()
        .map(|name| state_dir.join(name))
        .filter(|path| path.exists())
        .collect();

    let runtime = state_dir.join(RUNTIME_DIR);
    if runtime.is_dir() {
        let mut entries = fs::read_dir(&runtime)
            .with_context(|| format!("failed to read {}", runtime.display()))?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("failed to read {}", runtime.display()))?;
        entries.sort();
        targets.extend(entries);
    }
    Ok(targets)
}

/// Number of files at or below `path`.
fn count_files(path: &Path) -> usize {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| !e.file_type().is_dir())
        .count()
}

fn remove(path: &Path) -> Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
    .with_context(|| format!("failed to remove {}", path.display()))
}

/// `partcad reset [--dry-run]`
#[derive(Debug, Default)]
pub struct Reset;

impl CliCommand for Reset {
    fn command(&self) -> clap::Command {
        clap::Command::new("reset")
            .about("Remove cached packages and runtime state")
            .arg(
                Arg::new("dry-run")
                    .long("dry-run")
                    .action(ArgAction::SetTrue)
                    .help("List what would be removed"),
            )
    }

    fn run(&self, matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let dry_run = matches.get_flag("dry-run");
        let state_dir = ctx.state_dir();
        let targets = reset_targets(&state_dir)?;

        if targets.is_empty() {
            println!("{} {}", "Nothing to remove in".dimmed(), state_dir.display());
            return Ok(ExitCode::SUCCESS);
        }

        let mut files = 0;
        for target in &targets {
            let count = count_files(target);
            files += count;
            if dry_run {
                println!("  {} {} ({} files)", "would remove".yellow(), target.display(), count);
            } else {
                remove(target)?;
                tracing::debug!("removed {}", target.display());
            }
        }

        if !dry_run {
            println!(
                "{} {} files from {}",
                "Removed".green().bold(),
                files,
                state_dir.display()
            );
        }
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reset_targets() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path();
        fs::create_dir_all(state.join("git/abc")).unwrap();
        fs::write(state.join("git/abc/partcad.yaml"), "").unwrap();
        fs::create_dir_all(state.join("runtime/python-3.11")).unwrap();
        fs::write(state.join("runtime/lock"), "").unwrap();
        fs::write(state.join("config.yaml"), "").unwrap();

        let targets = reset_targets(state).unwrap();
        assert_eq!(
            targets,
            vec![
                state.join("git"),
                state.join("runtime/lock"),
                state.join("runtime/python-3.11"),
            ]
        );
        assert_eq!(count_files(&state.join("git")), 1);

        for target in &targets {
            remove(target).unwrap();
        }
        assert!(state.join("config.yaml").exists());
        assert!(state.join("runtime").is_dir());
        assert!(reset_targets(state).unwrap().is_empty());
    }
}
