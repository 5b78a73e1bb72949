//! PartCAD End-to-End Test Infrastructure
//!
//! Integration tests for flows that cross crate boundaries:
//!
//! - Command trees on disk resolved through the loaders
//! - Conversions routed through the dispatcher to real backends
//! - The `partcad` binary driven as a user would
//! - The `partcad-mesh-wrapper` binary spoken to over stdin/stdout
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p partcad-tests
//! ```

pub mod fixtures;
pub mod harness;

pub use harness::{CliResult, TestHarness};
