//! Standalone mesh backend.
//!
//! Reads one request on stdin and writes one response on stdout, so it can be
//! declared as an `executable` backend in the user config.

use std::process::ExitCode;

use partcad_wrapper::{serve, MeshWrapper, StdioChannel};

fn main() -> ExitCode {
    let mut channel = StdioChannel::stdio();
    match serve(&MeshWrapper, &mut channel) {
        Ok(response) if response.success => ExitCode::SUCCESS,
        Ok(_) => ExitCode::from(1),
        Err(e) => {
            eprintln!("partcad-mesh-wrapper: {}", e);
            ExitCode::from(2)
        }
    }
}
