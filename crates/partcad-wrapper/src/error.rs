//! Error types for backend wrappers.

use partcad_core::ErrorCode;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for wrapper operations.
pub type WrapperResult<T> = Result<T, WrapperError>;

/// Errors raised while reaching a backend. A backend that runs and reports
/// a failure is not an error here; that arrives as an unsuccessful
/// [`partcad_core::WrapperResponse`].
#[derive(Debug, Error)]
pub enum WrapperError {
    /// No python interpreter could be located.
    #[error("Python interpreter not found. Install python3, set pythonPath in the user config, or set PC_PYTHON_PATH")]
    PythonNotFound,

    /// A python backend was requested without a wrappers directory.
    #[error("wrappers directory is not configured (set wrappersDir or PC_WRAPPERS_DIR)")]
    WrappersDirNotConfigured,

    /// The wrapper script does not exist.
    #[error("wrapper script not found at: {path}")]
    ScriptNotFound { path: PathBuf },

    /// Failed to spawn the backend process.
    #[error("failed to spawn '{program}': {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The backend did not finish in time and was killed.
    #[error("backend timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// The backend exited with an error and no usable response.
    #[error("backend exited with status {exit_code}: {stderr}")]
    ProcessFailed { exit_code: i32, stderr: String },

    /// The backend answered with something that is not a response.
    #[error("invalid backend response: {message}")]
    InvalidResponse { message: String },

    /// The request could not be read or decoded.
    #[error("invalid backend request: {0}")]
    InvalidRequest(#[source] serde_json::Error),

    /// The other side speaks a newer protocol.
    #[error("unsupported wrapper protocol version {found} (supported: {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    /// No in-process backend is registered under this name.
    #[error("unknown builtin backend '{0}'")]
    UnknownBuiltin(String),

    /// IO error on the request/response channel.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WrapperError {
    /// Creates an invalid response error.
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Creates a process failed error.
    pub fn process_failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::ProcessFailed {
            exit_code,
            stderr: stderr.into(),
        }
    }
}

impl ErrorCode for WrapperError {
    fn code(&self) -> &'static str {
        match self {
            WrapperError::PythonNotFound => "WRAPPER_001",
            WrapperError::WrappersDirNotConfigured => "WRAPPER_002",
            WrapperError::ScriptNotFound { .. } => "WRAPPER_003",
            WrapperError::SpawnFailed { .. } => "WRAPPER_004",
            WrapperError::Timeout { .. } => "WRAPPER_005",
            WrapperError::ProcessFailed { .. } => "WRAPPER_006",
            WrapperError::InvalidResponse { .. } => "WRAPPER_007",
            WrapperError::InvalidRequest(_) => "WRAPPER_008",
            WrapperError::UnsupportedVersion { .. } => "WRAPPER_009",
            WrapperError::UnknownBuiltin(_) => "WRAPPER_010",
            WrapperError::Io(_) => "WRAPPER_011",
        }
    }

    fn category(&self) -> &'static str {
        "wrapper"
    }
}
