//! Error types and JSON-RPC error codes.

use serde_json::{json, Value};

use super::message::{ErrorObject, ErrorResponse, RequestId, JSONRPC_VERSION};

/// Standard JSON-RPC 2.0 error codes.
pub mod codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// All errors that can occur in the RPC engine.
///
/// The variant is the classification: the dispatcher maps variants to wire
/// codes without inspecting message content. `InvalidParams` is the one
/// handlers raise deliberately for rejected input; everything else a handler
/// returns is reported as an internal failure.
#[derive(thiserror::Error, Debug)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    /// Envelope failed schema validation. Carries the joined diagnostics.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Application-level input validation failure, tagged at the source.
    #[error("Invalid input: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RpcError {
    pub fn code(&self) -> i32 {
        use codes::*;
        match self {
            RpcError::Parse(_) | RpcError::Json(_) => PARSE_ERROR,
            RpcError::InvalidRequest(_) => INVALID_REQUEST,
            RpcError::MethodNotFound(_) => METHOD_NOT_FOUND,
            RpcError::InvalidParams(_) => INVALID_PARAMS,
            RpcError::Internal(_) | RpcError::Transport(_) | RpcError::Io(_) => INTERNAL_ERROR,
        }
    }

    /// Build the wire error response. Messages stay canonical; detail goes
    /// in `data` where the variant carries any.
    pub fn to_error_response(&self, id: RequestId) -> ErrorResponse {
        let (message, data) = match self {
            RpcError::InvalidRequest(detail) => (
                "Invalid request".to_string(),
                Some(Value::String(detail.clone())),
            ),
            RpcError::MethodNotFound(method) => (
                "Method not found".to_string(),
                Some(json!({ "method": method })),
            ),
            RpcError::Internal(message) => (message.clone(), None),
            other => (other.to_string(), None),
        };
        ErrorResponse {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: ErrorObject {
                code: self.code(),
                message,
                data,
            },
        }
    }
}

impl From<mnemo::MnemoError> for RpcError {
    fn from(e: mnemo::MnemoError) -> Self {
        match e {
            mnemo::MnemoError::InvalidInput(msg) => RpcError::InvalidParams(msg),
            other => RpcError::Internal(other.to_string()),
        }
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
