//! PartCAD backend wrappers
//!
//! Geometry work is delegated to backends that each take one
//! [`WrapperRequest`](partcad_core::WrapperRequest) and answer with one
//! [`WrapperResponse`](partcad_core::WrapperResponse).
//!
//! # Crate Structure
//!
//! - [`protocol`] - The [`ProcessWrapper`] and [`WrapperChannel`] traits and
//!   the one-shot [`serve`] loop
//! - [`runner`] - Reaches python, executable and builtin backends, with a
//!   timeout at the invocation boundary
//! - [`mesh`] - Builtin STL/OBJ backend, also shipped as the
//!   `partcad-mesh-wrapper` binary
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```no_run
//! use partcad_core::WrapperRequest;
//! use partcad_wrapper::{BackendInterface, WrapperRunner};
//!
//! let runner = WrapperRunner::new();
//! let request = WrapperRequest::convert("bracket.stl", "stl", "obj", "bracket.obj");
//! let response = runner.run(&BackendInterface::builtin("mesh"), &request)?;
//! assert!(response.success);
//! # Ok::<(), partcad_wrapper::WrapperError>(())
//! ```

pub mod error;
pub mod mesh;
pub mod protocol;
pub mod runner;

pub use error::{WrapperError, WrapperResult};
pub use mesh::{Mesh, MeshError, MeshWrapper};
pub use protocol::{process_guarded, serve, ProcessWrapper, StdioChannel, WrapperChannel};
pub use runner::{
    builtin_wrapper, parse_response, BackendInterface, RunnerConfig, WrapperRunner,
    BUILTIN_BACKENDS, DEFAULT_TIMEOUT_SECS, PYTHON_PATH_ENV,
};
