//! Request/response contract for conversion backends.
//!
//! A backend (often called a wrapper) receives one [`WrapperRequest`],
//! performs one unit of geometry work and answers with one
//! [`WrapperResponse`]. Both messages are JSON documents carrying a
//! `version` field so backends and the CLI can evolve independently.
//!
//! # Request
//!
//! ```json
//! {
//!   "version": 1,
//!   "operation": "convert",
//!   "path": "/pkg/bracket.step",
//!   "source_format": "step",
//!   "target_format": "stl",
//!   "output_path": "/pkg/bracket.stl",
//!   "params": {}
//! }
//! ```
//!
//! # Response
//!
//! ```json
//! { "version": 1, "success": true, "exception": null, "shape": null }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Current wrapper protocol version.
pub const PROTOCOL_VERSION: u32 = 1;

fn default_version() -> u32 {
    PROTOCOL_VERSION
}

/// The kind of work a backend is asked to perform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WrapperOperation {
    /// Load the input and return its shape handle.
    Read,
    /// Write the input to `output_path` in `target_format`.
    Convert,
    /// Extrude a sketch by `params.depth` and write the result.
    Extrude,
}

/// A single job sent to a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperRequest {
    /// Protocol version of the sender.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Requested operation.
    pub operation: WrapperOperation,
    /// Input file.
    pub path: PathBuf,
    /// Symbolic name of the input format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,
    /// Symbolic name of the requested output format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_format: Option<String>,
    /// Where the backend must write its output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Operation-specific parameters.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub params: Map<String, Value>,
}

impl WrapperRequest {
    /// Creates a read request.
    pub fn read(path: impl Into<PathBuf>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            operation: WrapperOperation::Read,
            path: path.into(),
            source_format: None,
            target_format: None,
            output_path: None,
            params: Map::new(),
        }
    }

    /// Creates a conversion request.
    pub fn convert(
        path: impl Into<PathBuf>,
        source_format: impl Into<String>,
        target_format: impl Into<String>,
        output_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            operation: WrapperOperation::Convert,
            path: path.into(),
            source_format: Some(source_format.into()),
            target_format: Some(target_format.into()),
            output_path: Some(output_path.into()),
            params: Map::new(),
        }
    }

    /// Replaces the operation.
    pub fn with_operation(mut self, operation: WrapperOperation) -> Self {
        self.operation = operation;
        self
    }

    /// Adds a parameter.
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    /// Returns the input path.
    pub fn input(&self) -> &Path {
        &self.path
    }

    /// Reads a numeric parameter. Numeric strings are accepted since
    /// manifest values often arrive quoted.
    pub fn param_f64(&self, key: &str) -> Option<f64> {
        match self.params.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Reads a string parameter.
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }
}

/// The answer of a backend to one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WrapperResponse {
    /// Protocol version of the backend.
    #[serde(default = "default_version")]
    pub version: u32,
    /// Whether the job succeeded.
    pub success: bool,
    /// Human readable failure description.
    #[serde(default)]
    pub exception: Option<String>,
    /// Opaque handle to the produced geometry; never inspected here.
    #[serde(default)]
    pub shape: Option<Value>,
}

impl WrapperResponse {
    /// Creates a successful response.
    pub fn success(shape: Option<Value>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            success: true,
            exception: None,
            shape,
        }
    }

    /// Creates a failed response. The shape is always absent.
    pub fn failure(exception: impl Into<String>) -> Self {
        Self {
            version: PROTOCOL_VERSION,
            success: false,
            exception: Some(exception.into()),
            shape: None,
        }
    }

    /// Returns true if this CLI understands the response.
    pub fn is_supported_version(&self) -> bool {
        self.version <= PROTOCOL_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_request_json_shape() {
        let request = WrapperRequest::convert("in.step", "step", "stl", "out.stl")
            .with_param("tolerance", 0.1);
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "version": 1,
                "operation": "convert",
                "path": "in.step",
                "source_format": "step",
                "target_format": "stl",
                "output_path": "out.stl",
                "params": { "tolerance": 0.1 }
            })
        );
    }

    #[test]
    fn test_request_defaults_version() {
        let request: WrapperRequest =
            serde_json::from_str(r#"{"operation":"read","path":"a.brep"}"#).unwrap();
        assert_eq!(request.version, PROTOCOL_VERSION);
        assert_eq!(request, WrapperRequest::read("a.brep"));
    }

    #[test]
    fn test_numeric_params_accept_strings() {
        let request = WrapperRequest::read("s.dxf")
            .with_operation(WrapperOperation::Extrude)
            .with_param("depth", "2.5")
            .with_param("height", 4)
            .with_param("label", "top");
        assert_eq!(request.param_f64("depth"), Some(2.5));
        assert_eq!(request.param_f64("height"), Some(4.0));
        assert_eq!(request.param_f64("label"), None);
        assert_eq!(request.param_str("label"), Some("top"));
    }

    #[test]
    fn test_failure_response_has_no_shape() {
        let response = WrapperResponse::failure("STEP File could not be loaded");
        assert!(!response.success);
        assert!(response.shape.is_none());

        let parsed: WrapperResponse =
            serde_json::from_str(r#"{"success": false, "exception": "boom"}"#).unwrap();
        assert_eq!(parsed.exception.as_deref(), Some("boom"));
        assert!(parsed.is_supported_version());
    }

    #[test]
    fn test_newer_response_version_is_flagged() {
        let parsed: WrapperResponse =
            serde_json::from_str(r#"{"version": 7, "success": true}"#).unwrap();
        assert!(!parsed.is_supported_version());
    }
}
