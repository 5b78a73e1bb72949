//! Status command implementation

use anyhow::Result;
use clap::ArgMatches;
use colored::Colorize;
use std::path::Path;
use std::process::ExitCode;
use walkdir::WalkDir;

use super::reset::{CACHE_DIRS, RUNTIME_DIR};
use crate::context::CliContext;
use crate::loader::CliCommand;

const MIB: f64 = 1024.0 * 1024.0;

/// Total size in bytes of the regular files below `path`. Symlinks are not
/// followed or counted; a missing path is empty.
pub fn dir_size(path: &Path) -> u64 {
    WalkDir::new(path)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| e.metadata().ok())
        .map(|m| m.len())
        .sum()
}

fn megabytes(bytes: u64) -> String {
    format!("{:.2}MB", bytes as f64 / MIB)
}

/// `partcad status`
#[derive(Debug, Default)]
pub struct Status;

impl CliCommand for Status {
    fn command(&self) -> clap::Command {
        clap::Command::new("status").about("Show the internal data used by PartCAD")
    }

    fn run(&self, _matches: &ArgMatches, ctx: &mut CliContext) -> Result<ExitCode> {
        let state_dir = ctx.state_dir();

        println!("{}", "PartCAD Status".cyan().bold());
        println!("{}", "==============".cyan());
        println!("  {:<22} {}", "Version:", env!("CARGO_PKG_VERSION"));
        println!("  {:<22} {}", "Internal data:", state_dir.display());
        println!();

        println!("  {:<22} {}", "Total:", megabytes(dir_size(&state_dir)).bold());
        for dir in CACHE_DIRS {
            let label = format!("{} cache:", dir);
            println!("  {:<22} {}", label, megabytes(dir_size(&state_dir.join(dir))));
        }
        println!(
            "  {:<22} {}",
            "Runtime environments:",
            megabytes(dir_size(&state_dir.join(RUNTIME_DIR)))
        );
        Ok(ExitCode::SUCCESS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    #[test]
    fn test_dir_size_sums_nested_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("git/abc")).unwrap();
        fs::write(dir.path().join("git/abc/a"), vec![0u8; 1000]).unwrap();
        fs::write(dir.path().join("b"), vec![0u8; 24]).unwrap();

        assert_eq!(dir_size(dir.path()), 1024);
        assert_eq!(dir_size(&dir.path().join("git")), 1000);
        assert_eq!(dir_size(&dir.path().join("missing")), 0);
    }

    #[test]
    fn test_megabytes() {
        assert_eq!(megabytes(0), "0.00MB");
        assert_eq!(megabytes(3 * 1024 * 1024 / 2), "1.50MB");
    }
}
