//! User configuration (`~/.partcad/config.yaml`).
//!
//! Every setting can be overridden from the environment with a `PC_`
//! variable; the environment wins over the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use indexmap::IndexMap;
use partcad_core::ErrorCode;
use partcad_wrapper::{RunnerConfig, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backends::BackendSpec;

/// Name of the per-user directory under the home directory.
pub const CONFIG_DIR_NAME: &str = ".partcad";
/// Name of the config file inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.yaml";

pub const ENV_INTERNAL_STATE_DIR: &str = "PC_INTERNAL_STATE_DIR";
pub const ENV_PYTHON_PATH: &str = "PC_PYTHON_PATH";
pub const ENV_WRAPPERS_DIR: &str = "PC_WRAPPERS_DIR";
pub const ENV_COMMANDS_DIR: &str = "PC_COMMANDS_DIR";
pub const ENV_WRAPPER_TIMEOUT: &str = "PC_WRAPPER_TIMEOUT";

/// Errors while loading the user configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            ConfigError::Read { .. } => "CONFIG_001",
            ConfigError::Parse { .. } => "CONFIG_002",
            ConfigError::InvalidEnv { .. } => "CONFIG_003",
        }
    }

    fn category(&self) -> &'static str {
        "config"
    }
}

/// Settings read from the user config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserConfig {
    /// Where cloned packages and runtime state live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_state_dir: Option<PathBuf>,
    /// Python interpreter for python backends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub python_path: Option<PathBuf>,
    /// Directory holding the `wrapper_*.py` scripts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrappers_dir: Option<PathBuf>,
    /// Directory with user command aliases.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commands_dir: Option<PathBuf>,
    /// Per-backend timeout in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wrapper_timeout_secs: Option<u64>,
    /// Extra backends, registered after the builtin ones.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub backends: Vec<BackendSpec>,
    /// Keys used by other PartCAD tools.
    #[serde(flatten)]
    pub extra: IndexMap<String, serde_yaml::Value>,
    /// File the settings were read from; `None` when defaults are used.
    #[serde(skip)]
    pub source: Option<PathBuf>,
    /// `PC_*` variables that replaced file settings.
    #[serde(skip)]
    pub env_overrides: Vec<&'static str>,
}

impl UserConfig {
    /// Returns `~/.partcad`.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(CONFIG_DIR_NAME))
    }

    /// Returns `~/.partcad/config.yaml`.
    pub fn default_path() -> Option<PathBuf> {
        Self::config_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
    }

    /// Parses a config document.
    pub fn from_yaml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Reads a config file. An explicit path must exist; the default one
    /// is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match Self::default_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !required && !path.exists() {
            tracing::debug!("no user config at {}", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).map_err(|e| ConfigError::Read {
            path: path.clone(),
            source: e,
        })?;
        tracing::debug!("loaded user config {}", path.display());
        let mut config = Self::from_yaml(&content, &path)?;
        config.source = Some(path);
        Ok(config)
    }

    /// Reads the config and applies the process environment.
    pub fn load_with_env(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env(|var| std::env::var(var).ok())?;
        Ok(config)
    }

    /// Applies `PC_*` overrides taken from `lookup`.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        let path = |var: &str| lookup(var).filter(|v| !v.is_empty()).map(PathBuf::from);
        let targets: [(&'static str, &mut Option<PathBuf>); 4] = [
            (ENV_INTERNAL_STATE_DIR, &mut self.internal_state_dir),
            (ENV_PYTHON_PATH, &mut self.python_path),
            (ENV_WRAPPERS_DIR, &mut self.wrappers_dir),
            (ENV_COMMANDS_DIR, &mut self.commands_dir),
        ];
        let mut applied = Vec::new();
        for (var, field) in targets {
            if let Some(value) = path(var) {
                *field = Some(value);
                applied.push(var);
            }
        }
        self.env_overrides.extend(applied);
        if let Some(value) = lookup(ENV_WRAPPER_TIMEOUT).filter(|v| !v.is_empty()) {
            let secs = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidEnv {
                    var: ENV_WRAPPER_TIMEOUT,
                    value: value.clone(),
                })?;
            self.wrapper_timeout_secs = Some(secs);
            self.env_overrides.push(ENV_WRAPPER_TIMEOUT);
        }
        Ok(())
    }

    /// Returns the internal state directory, `~/.partcad` by default.
    pub fn internal_state_dir(&self) -> PathBuf {
        self.internal_state_dir
            .clone()
            .or_else(Self::config_dir)
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR_NAME))
    }

    /// Returns the backend timeout.
    pub fn wrapper_timeout(&self) -> Duration {
        Duration::from_secs(self.wrapper_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Builds the backend runner settings.
    pub fn runner_config(&self) -> RunnerConfig {
        let mut config = RunnerConfig::default().timeout(self.wrapper_timeout());
        if let Some(ref python) = self.python_path {
            config = config.python_path(python);
        }
        if let Some(ref dir) = self.wrappers_dir {
            config = config.wrappers_dir(dir);
        }
        config
    }
}
