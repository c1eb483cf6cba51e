//! Handshake types: server identity and the `initialize` exchange.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Protocol version this server speaks.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVER_NAME: &str = "mnemo-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Immutable identity fixed at construction and echoed verbatim in every
/// `initialize` result.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    pub name: String,
    pub version: String,
    pub protocol_version: String,
}

impl ServerIdentity {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            protocol_version: PROTOCOL_VERSION.to_string(),
        }
    }

    pub fn with_protocol_version(mut self, protocol_version: impl Into<String>) -> Self {
        self.protocol_version = protocol_version.into();
        self
    }
}

impl Default for ServerIdentity {
    fn default() -> Self {
        Self::new(SERVER_NAME, SERVER_VERSION)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// What the caller sends with `initialize`. Both fields are accepted and
/// ignored — the server always answers with its own fixed version.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<Map<String, Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: Map<String, Value>,
    pub server_info: ServerInfo,
}

impl InitializeResult {
    pub fn for_identity(identity: &ServerIdentity) -> Self {
        Self {
            protocol_version: identity.protocol_version.clone(),
            capabilities: Map::new(),
            server_info: ServerInfo {
                name: identity.name.clone(),
                version: identity.version.clone(),
            },
        }
    }
}
