//! PartCAD core library
//!
//! This crate holds the pieces of PartCAD that every other crate agrees on:
//! the closed table of artifact formats, the per-domain format registry,
//! the `partcad.yaml` package manifest and the request/response contract
//! spoken by conversion backends.
//!
//! # Example
//!
//! ```
//! use partcad_core::{Domain, FormatRegistry};
//!
//! let registry = FormatRegistry::builtin().unwrap();
//!
//! let svg = registry.resolve(Domain::Sketch, "svg").unwrap();
//! assert_eq!(svg.ext(), "svg");
//!
//! let outputs = registry.capability(Domain::Part, "convert_output").unwrap();
//! assert!(outputs.contains("step"));
//! assert!(!outputs.contains("cadquery"));
//! ```
//!
//! # Modules
//!
//! - [`format`]: `Format` values and `FormatGroup` collections
//! - [`registry`]: per-domain registry of format groups and capabilities
//! - [`tables`]: the builtin format tables
//! - [`contract`]: wrapper request/response schema
//! - [`package`]: `partcad.yaml` manifest loading and editing
//! - [`error`]: error types and stable error codes

pub mod contract;
pub mod error;
pub mod format;
pub mod package;
pub mod registry;
pub mod tables;

pub use contract::{WrapperOperation, WrapperRequest, WrapperResponse, PROTOCOL_VERSION};
pub use error::{ErrorCode, FormatError, ManifestError};
pub use format::{Format, FormatGroup};
pub use package::{
    ImportDecl, ImportKind, ObjectConfig, Package, PackageManifest, DEFAULT_VERSION_REQ,
    MANIFEST_FILE,
};
pub use registry::{Domain, DomainFormats, FormatRegistry, FormatView};

/// Version of this crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
