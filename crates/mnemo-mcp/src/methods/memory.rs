//! Memory methods: search.

use std::sync::Arc;

use serde::Deserialize;

use super::{parse_params, resolve_project_id};
use crate::context::ServerContext;
use crate::protocol::ProtocolServer;
use crate::transport::Transport;
use crate::types::RpcError;

const DEFAULT_TOP_K: u32 = 8;
const MAX_TOP_K: u32 = 32;

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    top_k: Option<u32>,
}

pub fn register<T: Transport>(server: &mut ProtocolServer<T>, ctx: Arc<ServerContext>) {
    server.register("memory.search", move |params, _req| {
        let ctx = Arc::clone(&ctx);
        async move {
            let input: SearchParams = parse_params(params)?;
            let project_id = resolve_project_id(&ctx, input.project_id.as_deref())?;
            let query = match input.query {
                None => {
                    return Err(RpcError::InvalidParams("query: is required".to_string()))
                }
                Some(q) if q.trim().is_empty() => {
                    return Err(RpcError::InvalidParams("query: must not be empty".to_string()))
                }
                Some(q) => q,
            };
            let top_k = input.top_k.unwrap_or(DEFAULT_TOP_K);
            if !(1..=MAX_TOP_K).contains(&top_k) {
                return Err(RpcError::InvalidParams(format!(
                    "top_k: must be between 1 and {MAX_TOP_K}"
                )));
            }

            let hits =
                mnemo::search_memory(&ctx.ports, project_id, &query, top_k as usize).await?;
            serde_json::to_value(hits).map_err(RpcError::Json)
        }
    });
}
