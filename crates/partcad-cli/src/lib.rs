//! PartCAD CLI library.
//!
//! Hosts the lazily loaded command tree, the conversion backend registry and
//! dispatcher, and the user configuration behind the `partcad` binary.

pub mod backends;
pub mod commands;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod loader;
pub mod logging;
