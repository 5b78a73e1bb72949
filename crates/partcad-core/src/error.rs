//! Error types for the PartCAD core library.

use std::path::PathBuf;
use thiserror::Error;

use crate::registry::Domain;

/// Stable error codes shared by all PartCAD error types.
///
/// The CLI prints `[code] message` in verbose mode so failures can be
/// searched for regardless of how the message text evolves.
pub trait ErrorCode: std::error::Error {
    /// Returns a static code like "FORMAT_001".
    fn code(&self) -> &'static str;

    /// Returns the category used to group related errors.
    fn category(&self) -> &'static str;
}

/// Errors raised while building or querying the format registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// A symbolic name is already owned by another group of the same domain.
    #[error("format '{name}' of group '{group}' is already registered by group '{existing}' in the {domain} domain")]
    DuplicateFormat {
        domain: Domain,
        name: String,
        group: String,
        existing: String,
    },

    /// A group with this name already exists in the domain.
    #[error("format group '{group}' is already registered in the {domain} domain")]
    DuplicateGroup { domain: Domain, group: String },

    /// No group of the domain contains the name.
    #[error("unknown {domain} format '{name}'")]
    UnknownFormat { domain: Domain, name: String },

    /// A capability refers to a group that does not exist.
    #[error("unknown format group '{group}' in the {domain} domain")]
    UnknownGroup { domain: Domain, group: String },

    /// The capability is not declared for the domain.
    #[error("unknown {domain} format capability '{name}'")]
    UnknownCapability { domain: Domain, name: String },
}

impl ErrorCode for FormatError {
    fn code(&self) -> &'static str {
        match self {
            FormatError::DuplicateFormat { .. } => "FORMAT_001",
            FormatError::DuplicateGroup { .. } => "FORMAT_002",
            FormatError::UnknownFormat { .. } => "FORMAT_003",
            FormatError::UnknownGroup { .. } => "FORMAT_004",
            FormatError::UnknownCapability { .. } => "FORMAT_005",
        }
    }

    fn category(&self) -> &'static str {
        "format"
    }
}

/// Errors raised while reading, editing or writing `partcad.yaml`.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// The manifest file does not exist.
    #[error("PartCAD package not found at {0}")]
    NotFound(PathBuf),

    /// Refusing to overwrite an existing manifest.
    #[error("package manifest already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Failed to read the manifest.
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the manifest.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Failed to serialize the manifest.
    #[error("failed to serialize package manifest: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// Failed to write the manifest.
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The object is not declared in the package.
    #[error("{domain} '{name}' is not declared in the package")]
    UnknownObject { domain: Domain, name: String },

    /// The object declares a type that the domain does not know.
    #[error("{domain} '{name}' has an invalid type: {source}")]
    InvalidType {
        domain: Domain,
        name: String,
        #[source]
        source: FormatError,
    },
}

impl ErrorCode for ManifestError {
    fn code(&self) -> &'static str {
        match self {
            ManifestError::NotFound(_) => "MANIFEST_001",
            ManifestError::AlreadyExists(_) => "MANIFEST_002",
            ManifestError::Read { .. } => "MANIFEST_003",
            ManifestError::Parse { .. } => "MANIFEST_004",
            ManifestError::Serialize(_) => "MANIFEST_005",
            ManifestError::Write { .. } => "MANIFEST_006",
            ManifestError::UnknownObject { .. } => "MANIFEST_007",
            ManifestError::InvalidType { .. } => "MANIFEST_008",
        }
    }

    fn category(&self) -> &'static str {
        "manifest"
    }
}
