//! Envelope validation with field-level diagnostics.
//!
//! Works on raw decoded values rather than serde structs so every problem
//! in one envelope is reported, each anchored to the field that caused it.

use serde_json::Value;

use crate::types::{Request, RequestId, JSONRPC_VERSION};

/// One validation finding, anchored to a field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(path: &str, message: &str) -> Self {
        Self {
            path: path.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path, self.message)
        }
    }
}

/// Join diagnostics into one human-readable line.
pub fn render(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(Diagnostic::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Validate a raw value against the Request shape, producing either a typed
/// request or every diagnostic found. There is no partial-parse fallback.
pub fn validate_request(raw: &Value) -> Result<Request, Vec<Diagnostic>> {
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => return Err(vec![Diagnostic::new("", "must be an object")]),
    };

    let mut diagnostics = Vec::new();

    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        diagnostics.push(Diagnostic::new("jsonrpc", "must be the literal \"2.0\""));
    }

    let method = match obj.get("method") {
        None => {
            diagnostics.push(Diagnostic::new("method", "is required"));
            None
        }
        Some(Value::String(name)) => Some(name.clone()),
        Some(_) => {
            diagnostics.push(Diagnostic::new("method", "must be a string"));
            None
        }
    };

    let id = match obj.get("id") {
        None => None,
        Some(value) => match request_id(value) {
            Ok(id) => Some(id),
            Err(message) => {
                diagnostics.push(Diagnostic::new("id", message));
                None
            }
        },
    };

    if !diagnostics.is_empty() {
        return Err(diagnostics);
    }

    Ok(Request {
        jsonrpc: JSONRPC_VERSION.to_string(),
        id,
        // Unwrap is safe: a missing method pushed a diagnostic above.
        method: method.unwrap_or_default(),
        params: obj.get("params").cloned(),
    })
}

/// Validate a raw value against the Response shape. Exactly one of
/// `result`/`error` must be present; both or neither is its own finding,
/// distinct from the per-field ones.
pub fn validate_response(raw: &Value) -> Result<(), Vec<Diagnostic>> {
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => return Err(vec![Diagnostic::new("", "must be an object")]),
    };

    let mut diagnostics = Vec::new();

    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        diagnostics.push(Diagnostic::new("jsonrpc", "must be the literal \"2.0\""));
    }

    match obj.get("id") {
        None => diagnostics.push(Diagnostic::new("id", "is required")),
        Some(value) => {
            if let Err(message) = request_id(value) {
                diagnostics.push(Diagnostic::new("id", message));
            }
        }
    }

    let has_result = obj.contains_key("result");
    let has_error = obj.contains_key("error");
    if has_result == has_error {
        diagnostics.push(Diagnostic::new(
            "",
            "exactly one of result or error must be present",
        ));
    } else if has_error {
        diagnostics.extend(validate_error_object(&obj["error"]));
    }

    if diagnostics.is_empty() {
        Ok(())
    } else {
        Err(diagnostics)
    }
}

fn validate_error_object(raw: &Value) -> Vec<Diagnostic> {
    let obj = match raw.as_object() {
        Some(obj) => obj,
        None => return vec![Diagnostic::new("error", "must be an object")],
    };
    let mut diagnostics = Vec::new();
    if !obj.get("code").map(Value::is_i64).unwrap_or(false) {
        diagnostics.push(Diagnostic::new("error.code", "must be an integer"));
    }
    if !obj.get("message").map(Value::is_string).unwrap_or(false) {
        diagnostics.push(Diagnostic::new("error.message", "must be a string"));
    }
    diagnostics
}

fn request_id(value: &Value) -> Result<RequestId, &'static str> {
    match value {
        Value::Null => Ok(RequestId::Null),
        Value::String(s) => Ok(RequestId::String(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(RequestId::Number)
            .ok_or("must be an integer"),
        _ => Err("must be a string, a number, or null"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_request_passes() {
        let req = validate_request(&json!({
            "jsonrpc": "2.0", "id": 1, "method": "ping", "params": {"a": 1}
        }))
        .unwrap();
        assert_eq!(req.method, "ping");
        assert_eq!(req.id, Some(RequestId::Number(1)));
        assert_eq!(req.params, Some(json!({"a": 1})));
    }

    #[test]
    fn test_wrong_version_is_flagged() {
        let diags = validate_request(&json!({
            "jsonrpc": "1.0", "id": 99, "method": "initialize"
        }))
        .unwrap_err();
        assert_eq!(render(&diags), "jsonrpc: must be the literal \"2.0\"");
    }

    #[test]
    fn test_all_problems_are_collected() {
        let diags = validate_request(&json!({
            "jsonrpc": "1.0", "id": true, "method": 5
        }))
        .unwrap_err();
        assert_eq!(diags.len(), 3);
        let rendered = render(&diags);
        assert!(rendered.contains("jsonrpc: "));
        assert!(rendered.contains("method: must be a string"));
        assert!(rendered.contains("id: must be a string, a number, or null"));
        assert!(rendered.contains("; "));
    }

    #[test]
    fn test_non_object_input() {
        let diags = validate_request(&json!([1, 2, 3])).unwrap_err();
        assert_eq!(render(&diags), "must be an object");
    }

    #[test]
    fn test_response_requires_exactly_one_of_result_error() {
        assert!(validate_response(&json!({
            "jsonrpc": "2.0", "id": 1, "result": {}
        }))
        .is_ok());
        assert!(validate_response(&json!({
            "jsonrpc": "2.0", "id": 1,
            "error": {"code": -32600, "message": "Invalid request"}
        }))
        .is_ok());

        let both = validate_response(&json!({
            "jsonrpc": "2.0", "id": 1, "result": {},
            "error": {"code": -32600, "message": "x"}
        }))
        .unwrap_err();
        assert_eq!(render(&both), "exactly one of result or error must be present");

        let neither = validate_response(&json!({"jsonrpc": "2.0", "id": 1})).unwrap_err();
        assert_eq!(
            render(&neither),
            "exactly one of result or error must be present"
        );
    }

    #[test]
    fn test_response_error_object_shape() {
        let diags = validate_response(&json!({
            "jsonrpc": "2.0", "id": 1, "error": {"code": "oops"}
        }))
        .unwrap_err();
        let rendered = render(&diags);
        assert!(rendered.contains("error.code: must be an integer"));
        assert!(rendered.contains("error.message: must be a string"));
    }
}
