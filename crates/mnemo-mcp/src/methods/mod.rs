//! Application method registration.
//!
//! Each module registers one method family. Input validation happens here,
//! tagged as `InvalidParams` so the dispatcher answers -32602 instead of
//! -32603; the actual work is delegated to the mnemo services.

pub mod memory;
pub mod projects;
pub mod resources;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use uuid::Uuid;

use crate::context::ServerContext;
use crate::protocol::ProtocolServer;
use crate::transport::Transport;
use crate::types::RpcError;

pub const TOOLS_LIST_METHOD: &str = "tools.list";

/// The full application method set, in registration order.
pub const METHOD_NAMES: [&str; 6] = [
    "projects.start_or_resume",
    "projects.attach_git",
    "resources.save_text",
    "resources.list",
    "projects.snapshot",
    "memory.search",
];

/// Register every application method on `server`.
pub fn register_all<T: Transport>(server: &mut ProtocolServer<T>, ctx: Arc<ServerContext>) {
    server.register(TOOLS_LIST_METHOD, |_params, _req| async {
        Ok(json!(METHOD_NAMES))
    });

    projects::register(server, Arc::clone(&ctx));
    resources::register(server, Arc::clone(&ctx));
    memory::register(server, ctx);
}

/// Deserialize params, treating absent params as `{}`. Failures are tagged
/// input-validation errors.
pub(crate) fn parse_params<P: DeserializeOwned>(params: Option<Value>) -> Result<P, RpcError> {
    let value = params.unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|e| RpcError::InvalidParams(e.to_string()))
}

/// Resolve the project id: an explicit param wins, otherwise the ambient
/// boot project.
pub(crate) fn resolve_project_id(
    ctx: &ServerContext,
    explicit: Option<&str>,
) -> Result<Uuid, RpcError> {
    match explicit {
        Some(raw) => Uuid::parse_str(raw)
            .map_err(|_| RpcError::InvalidParams("project_id: must be a valid UUID".to_string())),
        None => Ok(ctx.session.project_id),
    }
}

/// Require a non-empty string field of at least `min` characters.
pub(crate) fn require_str(
    path: &str,
    value: Option<String>,
    min: usize,
) -> Result<String, RpcError> {
    match value {
        None => Err(RpcError::InvalidParams(format!("{path}: is required"))),
        Some(s) if s.chars().count() < min => Err(RpcError::InvalidParams(format!(
            "{path}: must be at least {min} characters"
        ))),
        Some(s) => Ok(s),
    }
}
