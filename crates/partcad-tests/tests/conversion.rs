//! Conversion tests
//!
//! Tests verify:
//! - Format lookups per domain
//! - Same-format short-circuit without backends
//! - Routing to the builtin mesh backend and to executable backends
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p partcad-tests --test conversion
//! ```

use std::fs;
use std::sync::Arc;

use partcad_cli::backends::{BackendRegistry, BackendSpec};
use partcad_cli::dispatch::{ConversionDispatcher, ConversionError, ConversionRequest};
use partcad_core::tables::{part, sketch};
use partcad_core::{Domain, ErrorCode, FormatRegistry};
use partcad_tests::fixtures::{write_file, SQUARE_OBJ, TRIANGLE_STL};
use partcad_wrapper::{BackendInterface, WrapperRunner};
use pretty_assertions::assert_eq;

fn formats() -> Arc<FormatRegistry> {
    Arc::new(FormatRegistry::builtin().unwrap())
}

fn dispatcher(backends: BackendRegistry) -> ConversionDispatcher {
    ConversionDispatcher::new(Arc::new(backends), WrapperRunner::new())
}

#[test]
fn test_sketch_format_lookup() {
    let registry = formats();
    let svg = registry.resolve(Domain::Sketch, "svg").unwrap();
    assert_eq!((svg.name(), svg.ext()), ("svg", "svg"));

    let err = registry.resolve(Domain::Sketch, "stl").unwrap_err();
    assert_eq!(err.code(), "FORMAT_002");
}

#[test]
fn test_same_format_needs_no_backend() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_file(dir.path(), "outline.svg", "<svg/>");
    let output = dir.path().join("copies/outline.svg");

    let dispatcher = dispatcher(BackendRegistry::new(formats()));
    let request =
        ConversionRequest::new(Domain::Sketch, &input, sketch::SVG, sketch::SVG).output(&output);
    let result = dispatcher.convert(&request).unwrap();

    assert!(result.success);
    assert_eq!(fs::read_to_string(output).unwrap(), "<svg/>");
}

#[test]
fn test_mesh_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let stl = write_file(dir.path(), "triangle.stl", TRIANGLE_STL);
    let dispatcher = dispatcher(BackendRegistry::builtin(formats()).unwrap());

    let to_obj = ConversionRequest::new(Domain::Part, &stl, part::STL, part::OBJ)
        .output(dir.path().join("out/triangle.obj"));
    let result = dispatcher.convert(&to_obj).unwrap();
    assert!(result.success, "{:?}", result.exception);
    assert_eq!(result.shape.as_ref().unwrap()["triangles"], 1);

    let obj_text = fs::read_to_string(&result.output_path).unwrap();
    assert_eq!(obj_text.lines().filter(|l| l.starts_with("v ")).count(), 3);

    let obj = write_file(dir.path(), "square.obj", SQUARE_OBJ);
    let to_stl = ConversionRequest::new(Domain::Part, &obj, part::OBJ, part::STL);
    let result = dispatcher.convert(&to_stl).unwrap();
    assert!(result.success);
    // Quad fan-triangulated into two facets.
    assert_eq!(fs::metadata(dir.path().join("square.stl")).unwrap().len(), 84 + 2 * 50);
}

#[test]
fn test_unknown_target_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let stl = write_file(dir.path(), "triangle.stl", TRIANGLE_STL);
    let dispatcher = dispatcher(BackendRegistry::builtin(formats()).unwrap());

    // `dxf` is not a part format; part `svg` is, but nothing renders to it.
    let request = ConversionRequest::new(Domain::Part, &stl, part::STL, sketch::DXF)
        .output(dir.path().join("never/triangle.dxf"));
    let err = dispatcher.convert(&request).unwrap_err();
    assert!(matches!(err, ConversionError::UnsupportedFormat { .. }));
    assert!(!dir.path().join("never").exists());

    let request = ConversionRequest::new(Domain::Part, &stl, part::STL, part::SVG)
        .output(dir.path().join("never/triangle.svg"));
    let err = dispatcher.convert(&request).unwrap_err();
    assert!(matches!(err, ConversionError::UnsupportedPair { .. }));
    assert!(!dir.path().join("never").exists());
}

#[cfg(unix)]
#[test]
fn test_executable_backend_failure_is_verbatim() {
    let dir = tempfile::tempdir().unwrap();
    let stl = write_file(dir.path(), "triangle.stl", TRIANGLE_STL);

    let mut backends = BackendRegistry::builtin(formats()).unwrap();
    backends
        .register(
            BackendSpec::new(
                "failing",
                Domain::Part,
                BackendInterface::Executable {
                    program: "sh".into(),
                    args: vec![
                        "-c".to_string(),
                        r#"cat >/dev/null; echo '{"version":1,"success":false,"exception":"mesh is not watertight"}'"#
                            .to_string(),
                    ],
                },
            )
            .converts("stl", &["3mf"]),
        )
        .unwrap();

    let request = ConversionRequest::new(Domain::Part, &stl, part::STL, part::THREE_MF);
    let result = dispatcher(backends).convert(&request).unwrap();
    assert!(!result.success);
    assert_eq!(result.exception.as_deref(), Some("mesh is not watertight"));
    assert_eq!(result.backend.as_deref(), Some("failing"));
}
