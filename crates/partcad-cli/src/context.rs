//! State shared by every command of one invocation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use partcad_core::{FormatRegistry, Package};
use partcad_wrapper::WrapperRunner;

use crate::backends::BackendRegistry;
use crate::config::UserConfig;
use crate::dispatch::ConversionDispatcher;

/// Invocation context handed to commands.
///
/// The package is loaded on first use so that commands which never touch
/// it (`version`, `healthcheck`, `init`) work outside a package.
pub struct CliContext {
    registry: Arc<FormatRegistry>,
    config: UserConfig,
    package_path: PathBuf,
    package: Option<Package>,
}

impl CliContext {
    /// Creates a context for the package at `package_path` (a directory or
    /// a `partcad.yaml` file).
    pub fn new(
        registry: Arc<FormatRegistry>,
        config: UserConfig,
        package_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            config,
            package_path: package_path.into(),
            package: None,
        }
    }

    /// Returns the format registry.
    pub fn registry(&self) -> &Arc<FormatRegistry> {
        &self.registry
    }

    /// Returns the user configuration.
    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    /// Returns the package path given on the command line.
    pub fn package_path(&self) -> &Path {
        &self.package_path
    }

    /// Returns the package, loading it on first use.
    pub fn package(&mut self) -> Result<&mut Package> {
        if self.package.is_none() {
            let package = Package::load(&self.package_path).with_context(|| {
                format!("failed to open package at {}", self.package_path.display())
            })?;
            tracing::debug!("loaded package '{}'", package.name());
            self.package = Some(package);
        }
        self.package
            .as_mut()
            .context("package not loaded")
    }

    /// Replaces the cached package, e.g. after `init`.
    pub fn set_package(&mut self, package: Package) {
        self.package = Some(package);
    }

    /// Builds the backend registry: builtins, then the configured extras.
    pub fn backends(&self) -> Result<BackendRegistry> {
        let mut backends = BackendRegistry::builtin(Arc::clone(&self.registry))
            .context("invalid builtin backend table")?;
        backends
            .register_all(self.config.backends.iter().cloned())
            .context("invalid backend in user config")?;
        Ok(backends)
    }

    /// Returns a runner configured from the user settings.
    pub fn runner(&self) -> WrapperRunner {
        WrapperRunner::with_config(self.config.runner_config())
    }

    /// Builds a conversion dispatcher.
    pub fn dispatcher(&self) -> Result<ConversionDispatcher> {
        Ok(ConversionDispatcher::new(Arc::new(self.backends()?), self.runner()))
    }

    /// Returns the internal state directory.
    pub fn state_dir(&self) -> PathBuf {
        self.config.internal_state_dir()
    }
}
