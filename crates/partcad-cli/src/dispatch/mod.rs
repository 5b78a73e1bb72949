//! Conversion dispatch
//!
//! Validates a conversion against the format registry, short-circuits
//! same-format requests to a file copy, and otherwise hands the work to the
//! one backend that claims the `source -> target` pair.


use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use partcad_core::{
    Domain, ErrorCode, Format, FormatRegistry, WrapperOperation, WrapperRequest,
};
use partcad_wrapper::{WrapperError, WrapperRunner};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::backends::BackendRegistry;

/// Errors that stop a conversion before or while reaching a backend.
///
/// A backend that runs and fails is not an error: it yields an unsuccessful
/// [`ConversionResult`].
#[derive(Debug, Error)]
pub enum ConversionError {
    /// A format is not registered in the domain.
    #[error("unsupported {role} format '{format}' for {domain}")]
    UnsupportedFormat {
        domain: Domain,
        format: String,
        role: &'static str,
    },

    /// No backend converts this pair.
    #[error("no backend converts {domain} {source_format} -> {target}")]
    UnsupportedPair {
        domain: Domain,
        source_format: String,
        target: String,
    },

    /// The input file is missing.
    #[error("input file not found: {0}")]
    SourceMissing(PathBuf),

    /// The backend could not be reached or answered garbage.
    #[error("backend '{backend}' failed: {error}")]
    Wrapper {
        backend: String,
        #[source]
        error: WrapperError,
    },

    /// Preparing the output location failed.
    #[error("failed to prepare {path}: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
}

impl ErrorCode for ConversionError {
    fn code(&self) -> &'static str {
        match self {
            ConversionError::UnsupportedFormat { .. } => "CONVERT_001",
            ConversionError::UnsupportedPair { .. } => "CONVERT_002",
            ConversionError::SourceMissing(_) => "CONVERT_003",
            ConversionError::Wrapper { .. } => "CONVERT_004",
            ConversionError::Io { .. } => "CONVERT_005",
        }
    }

    fn category(&self) -> &'static str {
        "convert"
    }
}

/// One conversion job.
#[derive(Debug, Clone)]
pub struct ConversionRequest {
    pub domain: Domain,
    pub source_path: PathBuf,
    pub source_format: Format,
    pub target_format: Format,
    pub params: Map<String, Value>,
    pub output_path: PathBuf,
}

impl ConversionRequest {
    /// Creates a request writing next to the source with the target
    /// extension.
    pub fn new(
        domain: Domain,
        source_path: impl Into<PathBuf>,
        source_format: Format,
        target_format: Format,
    ) -> Self {
        let source_path = source_path.into();
        let output_path = default_output(&source_path, &target_format);
        Self {
            domain,
            source_path,
            source_format,
            target_format,
            params: Map::new(),
            output_path,
        }
    }

    /// Sets the output file.
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Sets the operation parameters.
    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }
}

fn default_output(source: &Path, target: &Format) -> PathBuf {
    if target.is_file_based() {
        source.with_extension(target.ext())
    } else {
        source.to_path_buf()
    }
}

/// Outcome of a conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionResult {
    pub success: bool,
    /// Backend error text, verbatim.
    pub exception: Option<String>,
    /// Opaque handle returned by the backend.
    pub shape: Option<Value>,
    /// Where the result was written.
    pub output_path: PathBuf,
    /// Backend that did the work; `None` for the copy short-circuit.
    pub backend: Option<String>,
}

impl ConversionResult {
    fn copied(output_path: PathBuf) -> Self {
        Self {
            success: true,
            exception: None,
            shape: None,
            output_path,
            backend: None,
        }
    }

    fn copy_failed(output_path: PathBuf, message: String) -> Self {
        Self {
            success: false,
            exception: Some(message),
            shape: None,
            output_path,
            backend: None,
        }
    }
}

/// Routes conversions to backends.
///
/// Holds only read-only state, so one dispatcher can serve concurrent
/// conversions from several threads.
#[derive(Debug, Clone)]
pub struct ConversionDispatcher {
    formats: Arc<FormatRegistry>,
    backends: Arc<BackendRegistry>,
    runner: WrapperRunner,
}

impl ConversionDispatcher {
    /// Creates a dispatcher.
    pub fn new(backends: Arc<BackendRegistry>, runner: WrapperRunner) -> Self {
        Self {
            formats: Arc::clone(backends.formats()),
            backends,
            runner,
        }
    }

    /// Returns the backend registry.
    pub fn backends(&self) -> &BackendRegistry {
        &self.backends
    }

    /// Resolves a format name in `domain`, for callers holding strings.
    pub fn resolve(
        &self,
        domain: Domain,
        name: &str,
        role: &'static str,
    ) -> Result<Format, ConversionError> {
        self.formats
            .resolve(domain, name)
            .map_err(|_| ConversionError::UnsupportedFormat {
                domain,
                format: name.to_string(),
                role,
            })
    }

    fn check_registered(
        &self,
        domain: Domain,
        format: &Format,
        role: &'static str,
    ) -> Result<(), ConversionError> {
        if self.formats.is_registered(domain, format) {
            Ok(())
        } else {
            Err(ConversionError::UnsupportedFormat {
                domain,
                format: format.name().to_string(),
                role,
            })
        }
    }

    /// Performs one conversion.
    ///
    /// Nothing touches the filesystem until both formats are known to be
    /// registered and a route exists. Backend failures are returned as an
    /// unsuccessful result carrying the backend's own message; there is no
    /// retry.
    pub fn convert(
        &self,
        request: &ConversionRequest,
    ) -> Result<ConversionResult, ConversionError> {
        let domain = request.domain;
        self.check_registered(domain, &request.source_format, "source")?;
        self.check_registered(domain, &request.target_format, "target")?;

        if request.source_format == request.target_format {
            return Ok(self.copy(request));
        }

        let source = request.source_format.name();
        let target = request.target_format.name();
        let backend = self.backends.find(domain, source, target).ok_or_else(|| {
            ConversionError::UnsupportedPair {
                domain,
                source_format: source.to_string(),
                target: target.to_string(),
            }
        })?;

        if request.source_format.is_file_based() && !request.source_path.is_file() {
            return Err(ConversionError::SourceMissing(request.source_path.clone()));
        }
        if let Some(parent) = request.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| ConversionError::Io {
                    path: parent.to_path_buf(),
                    error: e,
                })?;
            }
        }

        let operation = if domain == Domain::Part && source == "extrude" {
            WrapperOperation::Extrude
        } else {
            WrapperOperation::Convert
        };
        let mut wrapper_request = WrapperRequest::convert(
            &request.source_path,
            source,
            target,
            &request.output_path,
        )
        .with_operation(operation);
        wrapper_request.params = request.params.clone();

        tracing::info!(
            "converting {} ({} -> {}) with backend '{}'",
            request.source_path.display(),
            source,
            target,
            backend.name
        );
        let response = self
            .runner
            .run(&backend.interface, &wrapper_request)
            .map_err(|e| ConversionError::Wrapper {
                backend: backend.name.clone(),
                error: e,
            })?;

        if !response.success {
            tracing::warn!(
                "backend '{}' failed: {}",
                backend.name,
                response.exception.as_deref().unwrap_or("unknown error")
            );
        }
        Ok(ConversionResult {
            success: response.success,
            exception: response.exception,
            shape: if response.success { response.shape } else { None },
            output_path: request.output_path.clone(),
            backend: Some(backend.name.clone()),
        })
    }

    /// Same-format conversion: a plain copy, no backend involved.
    fn copy(&self, request: &ConversionRequest) -> ConversionResult {
        let from = &request.source_path;
        let to = request.output_path.clone();
        if !request.source_format.is_file_based() || same_file(from, &to) {
            tracing::debug!("{} already in target format", from.display());
            return ConversionResult::copied(to);
        }

        tracing::info!("copying {} to {}", from.display(), to.display());
        let result = to
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or(Ok(()), fs::create_dir_all)
            .and_then(|_| fs::copy(from, &to));
        match result {
            Ok(_) => ConversionResult::copied(to),
            Err(e) => {
                let message = format!("failed to copy {}: {}", from.display(), e);
                ConversionResult::copy_failed(to, message)
            }
        }
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
