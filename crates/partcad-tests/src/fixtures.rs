//! Small geometry and package fixtures.

use std::fs;
use std::path::{Path, PathBuf};

/// A unit square as two triangles.
pub const SQUARE_OBJ: &str = "\
# unit square
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
f 1 2 3 4
";

/// A single ASCII STL facet.
pub const TRIANGLE_STL: &str = "\
solid triangle
  facet normal 0 0 1
    outer loop
      vertex 0 0 0
      vertex 1 0 0
      vertex 0 1 0
    endloop
  endfacet
endsolid triangle
";

/// A CadQuery script header.
pub const CADQUERY_SCRIPT: &str = "\
# Simple box
import cadquery as cq

result = cq.Workplane(\"XY\").box(10, 10, 2)
";

/// Writes `content` to `dir/name` and returns the path.
pub fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Writes a user config that keeps all state inside `dir`.
pub fn write_config(dir: &Path, extra: &str) -> PathBuf {
    let state = dir.join("state");
    let content = format!(
        "internalStateDir: {}\n{}",
        state.display().to_string().replace('\\', "/"),
        extra
    );
    write_file(dir, "config.yaml", &content)
}
