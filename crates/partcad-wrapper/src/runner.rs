//! Runs one backend request through its declared interface.
//!
//! Python and executable backends are separate processes: the request goes
//! in on stdin as JSON, the response comes back on stdout, and the child is
//! killed once the configured timeout elapses. Builtin backends run
//! in-process behind the same guards.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use partcad_core::{WrapperRequest, WrapperResponse, PROTOCOL_VERSION};
use serde::{Deserialize, Serialize};

use crate::error::{WrapperError, WrapperResult};
use crate::mesh::MeshWrapper;
use crate::protocol::{process_guarded, ProcessWrapper};

/// Default backend timeout (5 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Environment variable overriding the python interpreter.
pub const PYTHON_PATH_ENV: &str = "PC_PYTHON_PATH";

static MESH_WRAPPER: MeshWrapper = MeshWrapper;

/// Names of the in-process backends.
pub const BUILTIN_BACKENDS: &[&str] = &["mesh"];

/// Looks up an in-process backend.
pub fn builtin_wrapper(name: &str) -> Option<&'static (dyn ProcessWrapper + Sync)> {
    match name {
        "mesh" => Some(&MESH_WRAPPER),
        _ => None,
    }
}

/// How a backend is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackendInterface {
    /// `<python> <wrappers_dir>/wrapper_<script>`.
    Python { script: String },
    /// Any program speaking the protocol on stdin/stdout.
    Executable {
        program: PathBuf,
        #[serde(default)]
        args: Vec<String>,
    },
    /// An in-process backend from [`BUILTIN_BACKENDS`].
    Builtin { name: String },
}

impl BackendInterface {
    /// Creates a python interface.
    pub fn python(script: impl Into<String>) -> Self {
        Self::Python {
            script: script.into(),
        }
    }

    /// Creates a builtin interface.
    pub fn builtin(name: impl Into<String>) -> Self {
        Self::Builtin { name: name.into() }
    }

    /// Short description for listings.
    pub fn describe(&self) -> String {
        match self {
            BackendInterface::Python { script } => format!("python {}", script),
            BackendInterface::Executable { program, .. } => {
                format!("exec {}", program.display())
            }
            BackendInterface::Builtin { name } => format!("builtin {}", name),
        }
    }
}

/// Configuration for the runner.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Explicit python interpreter.
    pub python_path: Option<PathBuf>,
    /// Directory holding the `wrapper_*.py` scripts.
    pub wrappers_dir: Option<PathBuf>,
    /// Per-invocation timeout.
    pub timeout: Duration,
    /// Whether to capture stderr (otherwise inherited).
    pub capture_stderr: bool,
    /// Working directory for child processes.
    pub working_dir: Option<PathBuf>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            python_path: None,
            wrappers_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            capture_stderr: true,
            working_dir: None,
        }
    }
}

impl RunnerConfig {
    /// Sets the python interpreter.
    pub fn python_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.python_path = Some(path.into());
        self
    }

    /// Sets the wrappers directory.
    pub fn wrappers_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.wrappers_dir = Some(dir.into());
        self
    }

    /// Sets the timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Sets the working directory.
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }
}

/// Runs requests against backends.
///
/// The runner holds no per-request state; one instance may serve many
/// threads at once.
#[derive(Debug, Clone, Default)]
pub struct WrapperRunner {
    config: RunnerConfig,
}

impl WrapperRunner {
    /// Creates a runner with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a runner with the given configuration.
    pub fn with_config(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Locates the python interpreter.
    ///
    /// Order: configured path, `PC_PYTHON_PATH`, then `python3` and
    /// `python` on `PATH`.
    pub fn find_python(&self) -> WrapperResult<PathBuf> {
        if let Some(ref path) = self.config.python_path {
            if path.exists() {
                return Ok(path.clone());
            }
            if let Ok(found) = which::which(path) {
                return Ok(found);
            }
        }

        if let Ok(path) = std::env::var(PYTHON_PATH_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(path);
            }
        }

        let names = if cfg!(windows) {
            vec!["python.exe", "python3", "python"]
        } else {
            vec!["python3", "python"]
        };
        for name in names {
            if let Ok(path) = which::which(name) {
                return Ok(path);
            }
        }

        Err(WrapperError::PythonNotFound)
    }

    /// Returns the path of a python wrapper script.
    pub fn script_path(&self, script: &str) -> WrapperResult<PathBuf> {
        let dir = self
            .config
            .wrappers_dir
            .as_ref()
            .ok_or(WrapperError::WrappersDirNotConfigured)?;
        let path = dir.join(format!("wrapper_{}", script));
        if !path.is_file() {
            return Err(WrapperError::ScriptNotFound { path });
        }
        Ok(path)
    }

    /// Returns true if the backend looks runnable on this host.
    pub fn is_available(&self, interface: &BackendInterface) -> bool {
        match interface {
            BackendInterface::Python { script } => {
                self.find_python().is_ok() && self.script_path(script).is_ok()
            }
            BackendInterface::Executable { program, .. } => {
                program.is_file() || which::which(program).is_ok()
            }
            BackendInterface::Builtin { name } => builtin_wrapper(name).is_some(),
        }
    }

    /// Sends `request` to the backend and returns its response.
    ///
    /// A backend that runs and reports failure yields `Ok` with an
    /// unsuccessful response; only infrastructure problems are errors.
    pub fn run(
        &self,
        interface: &BackendInterface,
        request: &WrapperRequest,
    ) -> WrapperResult<WrapperResponse> {
        let response = match interface {
            BackendInterface::Builtin { name } => {
                let wrapper = builtin_wrapper(name)
                    .ok_or_else(|| WrapperError::UnknownBuiltin(name.clone()))?;
                tracing::debug!("running builtin backend '{}'", name);
                process_guarded(wrapper, request.input(), request)
            }
            BackendInterface::Python { script } => {
                let python = self.find_python()?;
                let script = self.script_path(script)?;
                let mut cmd = Command::new(&python);
                cmd.arg(&script);
                self.run_process(cmd, &python.display().to_string(), request)?
            }
            BackendInterface::Executable { program, args } => {
                let mut cmd = Command::new(program);
                cmd.args(args);
                self.run_process(cmd, &program.display().to_string(), request)?
            }
        };

        if !response.is_supported_version() {
            return Err(WrapperError::UnsupportedVersion {
                found: response.version,
                supported: PROTOCOL_VERSION,
            });
        }
        Ok(response)
    }

    fn run_process(
        &self,
        mut cmd: Command,
        program: &str,
        request: &WrapperRequest,
    ) -> WrapperResult<WrapperResponse> {
        let payload = serde_json::to_vec(request).map_err(WrapperError::InvalidRequest)?;

        cmd.stdin(Stdio::piped()).stdout(Stdio::piped());
        if self.config.capture_stderr {
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stderr(Stdio::inherit());
        }
        if let Some(ref cwd) = self.config.working_dir {
            cmd.current_dir(cwd);
        }

        tracing::debug!("spawning backend '{}'", program);
        let start = Instant::now();
        let mut child = cmd.spawn().map_err(|e| WrapperError::SpawnFailed {
            program: program.to_string(),
            source: e,
        })?;

        // Both pipes are drained on their own threads so a chatty backend
        // cannot block on a full pipe while we wait for it.
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        if let Some(mut stdin) = child.stdin.take() {
            // A backend that exits without reading its input closes the
            // pipe; the exit status tells the rest of the story.
            if let Err(e) = stdin.write_all(&payload) {
                tracing::debug!("backend '{}' closed stdin early: {}", program, e);
            }
        }

        let status = wait_with_timeout(&mut child, self.config.timeout)?;
        let stdout = join(stdout);
        let stderr = join(stderr);
        tracing::debug!(
            "backend '{}' finished in {:?} with {}",
            program,
            start.elapsed(),
            status
        );

        match parse_response(&stdout) {
            Some(response) => Ok(response),
            None if !status.success() => Err(WrapperError::process_failed(
                status.code().unwrap_or(-1),
                String::from_utf8_lossy(&stderr).trim().to_string(),
            )),
            None => Err(WrapperError::invalid_response(format!(
                "no response document on stdout of '{}'",
                program
            ))),
        }
    }
}

fn drain<R: Read + Send + 'static>(mut reader: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = reader.read_to_end(&mut buf);
        buf
    })
}

fn join(handle: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    handle.and_then(|h| h.join().ok()).unwrap_or_default()
}

/// Extracts the response from backend stdout.
///
/// Backends may print diagnostics before the response, so when the whole
/// output is not one document the last line that parses wins.
pub fn parse_response(stdout: &[u8]) -> Option<WrapperResponse> {
    let text = String::from_utf8_lossy(stdout);
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(response) = serde_json::from_str(trimmed) {
        return Some(response);
    }
    trimmed
        .lines()
        .rev()
        .map(str::trim)
        .filter(|line| line.starts_with('{'))
        .find_map(|line| serde_json::from_str(line).ok())
}

/// Waits for a child process, killing it after `timeout`.
fn wait_with_timeout(child: &mut Child, timeout: Duration) -> WrapperResult<ExitStatus> {
    let start = Instant::now();
    loop {
        match child.try_wait()? {
            Some(status) => return Ok(status),
            None => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(WrapperError::Timeout { timeout });
                }
                thread::sleep(Duration::from_millis(20));
            }
        }
    }
}
