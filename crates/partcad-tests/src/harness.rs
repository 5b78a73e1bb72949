//! Test harness utilities for running the PartCAD binaries.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::OnceLock;
use tempfile::TempDir;

use crate::fixtures::write_config;

/// Environment variables that would leak the host's settings into a test.
const HOST_ENV: &[&str] = &[
    "PC_INTERNAL_STATE_DIR",
    "PC_PYTHON_PATH",
    "PC_WRAPPERS_DIR",
    "PC_COMMANDS_DIR",
    "PC_WRAPPER_TIMEOUT",
    "RUST_LOG",
];

/// Result of running a binary.
#[derive(Debug)]
pub struct CliResult {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    /// Create a CliResult from a Command Output.
    pub fn from_output(output: Output) -> Self {
        Self {
            success: output.status.success(),
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
    }

    fn spawn_failed(e: std::io::Error) -> Self {
        Self {
            success: false,
            exit_code: -1,
            stdout: String::new(),
            stderr: format!("Failed to run CLI: {}", e),
        }
    }

    /// Assert that the command succeeded.
    pub fn assert_success(&self) {
        assert!(
            self.success,
            "Command failed with exit code {}.\nstdout: {}\nstderr: {}",
            self.exit_code, self.stdout, self.stderr
        );
    }

    /// Assert that the command failed.
    pub fn assert_failure(&self) {
        assert!(
            !self.success,
            "Expected command to fail, but it succeeded.\nstdout: {}",
            self.stdout
        );
    }
}

/// A scratch package directory plus an isolated user config.
pub struct TestHarness {
    /// Working directory; also the package directory.
    pub work_dir: TempDir,
    config: PathBuf,
}

impl TestHarness {
    /// Create a harness with an empty config.
    pub fn new() -> Self {
        Self::with_config("")
    }

    /// Create a harness whose config has `extra` appended.
    pub fn with_config(extra: &str) -> Self {
        let work_dir = TempDir::new().expect("Failed to create work dir");
        let config = write_config(work_dir.path(), extra);
        Self { work_dir, config }
    }

    /// Get the working directory path.
    pub fn path(&self) -> &Path {
        self.work_dir.path()
    }

    /// Run `partcad` with the given arguments inside the work directory.
    pub fn run_cli(&self, args: &[&str]) -> CliResult {
        let mut cmd = cargo_run("partcad-cli", "partcad");
        cmd.arg("--no-ansi")
            .arg("--config")
            .arg(&self.config)
            .args(args)
            .current_dir(self.path());
        match cmd.output() {
            Ok(out) => CliResult::from_output(out),
            Err(e) => CliResult::spawn_failed(e),
        }
    }

    /// Run `partcad-mesh-wrapper` with `input` on stdin.
    pub fn run_mesh_wrapper(&self, input: &str) -> CliResult {
        let mut cmd = cargo_run("partcad-wrapper", "partcad-mesh-wrapper");
        cmd.current_dir(self.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => return CliResult::spawn_failed(e),
        };
        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(input.as_bytes())
                .expect("Failed to write wrapper input");
        }
        match child.wait_with_output() {
            Ok(out) => CliResult::from_output(out),
            Err(e) => CliResult::spawn_failed(e),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn cargo_run(package: &str, bin: &str) -> Command {
    let mut cmd = Command::new("cargo");
    cmd.args(["run", "--quiet", "--manifest-path"])
        .arg(workspace_manifest_path())
        .args(["-p", package, "--bin", bin, "--"]);
    for var in HOST_ENV {
        cmd.env_remove(var);
    }
    cmd
}

fn workspace_manifest_path() -> PathBuf {
    static PATH: OnceLock<PathBuf> = OnceLock::new();
    PATH.get_or_init(|| {
        let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let manifest_path = manifest_dir.join("..").join("..").join("Cargo.toml");
        manifest_path.canonicalize().unwrap_or(manifest_path)
    })
    .clone()
}
