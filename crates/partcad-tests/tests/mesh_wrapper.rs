//! Mesh wrapper binary tests
//!
//! Speaks the wrapper protocol to `partcad-mesh-wrapper` over stdin/stdout.
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p partcad-tests --test mesh_wrapper
//! ```

use partcad_core::{WrapperRequest, WrapperResponse};
use partcad_tests::fixtures::{write_file, TRIANGLE_STL};
use partcad_tests::TestHarness;
use pretty_assertions::assert_eq;

fn response(stdout: &str) -> WrapperResponse {
    let line = stdout.lines().last().expect("wrapper printed nothing");
    serde_json::from_str(line).expect("wrapper printed invalid JSON")
}

#[test]
fn test_convert_request() {
    let harness = TestHarness::new();
    let stl = write_file(harness.path(), "triangle.stl", TRIANGLE_STL);
    let output = harness.path().join("triangle.obj");

    let request = WrapperRequest::convert(&stl, "stl", "obj", &output);
    let result = harness.run_mesh_wrapper(&serde_json::to_string(&request).unwrap());
    result.assert_success();

    let response = response(&result.stdout);
    assert!(response.success);
    assert_eq!(response.shape.unwrap()["vertices"], 3);
    assert!(output.exists());
}

#[test]
fn test_unreadable_request() {
    let harness = TestHarness::new();
    let result = harness.run_mesh_wrapper("{ not json");
    result.assert_failure();
    assert_eq!(result.exit_code, 1);

    let response = response(&result.stdout);
    assert!(!response.success);
    assert!(response.exception.is_some());
}

#[test]
fn test_missing_input_file() {
    let harness = TestHarness::new();
    let request = serde_json::json!({
        "operation": "convert",
        "path": harness.path().join("absent.stl"),
        "source_format": "stl",
        "target_format": "obj",
    });
    let result = harness.run_mesh_wrapper(&request.to_string());
    assert_eq!(result.exit_code, 1);
    assert!(!response(&result.stdout).success);
}
