//! Resource methods: save_text, list.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;

use super::{parse_params, require_str, resolve_project_id};
use crate::context::ServerContext;
use crate::protocol::ProtocolServer;
use crate::transport::Transport;
use crate::types::RpcError;

#[derive(Debug, Deserialize)]
struct SaveTextParams {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    uri: Option<String>,
    #[serde(default)]
    mime: Option<String>,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListParams {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    filter: Option<FilterParams>,
}

#[derive(Debug, Deserialize)]
struct FilterParams {
    #[serde(default)]
    prefix: Option<String>,
    #[serde(default)]
    mime: Option<String>,
    #[serde(default)]
    updated_after: Option<String>,
    #[serde(default)]
    updated_before: Option<String>,
}

pub fn register<T: Transport>(server: &mut ProtocolServer<T>, ctx: Arc<ServerContext>) {
    {
        let ctx = Arc::clone(&ctx);
        server.register("resources.save_text", move |params, _req| {
            let ctx = Arc::clone(&ctx);
            async move {
                let input: SaveTextParams = parse_params(params)?;
                let project_id = resolve_project_id(&ctx, input.project_id.as_deref())?;
                let uri = require_str("uri", input.uri, 3)?;
                let mime = require_str("mime", input.mime, 3)?;
                let content = input
                    .content
                    .ok_or_else(|| RpcError::InvalidParams("content: is required".to_string()))?;

                let resource_id = mnemo::save_text_resource(
                    &ctx.ports,
                    project_id,
                    &uri,
                    mnemo::SaveTextOpts {
                        mime,
                        content,
                        title: input.title,
                    },
                )
                .await?;
                Ok(json!({ "resource_id": resource_id }))
            }
        });
    }

    server.register("resources.list", move |params, _req| {
        let ctx = Arc::clone(&ctx);
        async move {
            let input: ListParams = parse_params(params)?;
            let project_id = resolve_project_id(&ctx, input.project_id.as_deref())?;
            let filter = match input.filter {
                Some(f) => mnemo::ResourceFilter {
                    prefix: f.prefix,
                    mime: f.mime,
                    updated_after: parse_datetime("filter.updated_after", f.updated_after)?,
                    updated_before: parse_datetime("filter.updated_before", f.updated_before)?,
                },
                None => mnemo::ResourceFilter::default(),
            };
            let items = mnemo::list_project_resources(&ctx.ports, project_id, &filter).await?;
            serde_json::to_value(items).map_err(RpcError::Json)
        }
    });
}

fn parse_datetime(path: &str, raw: Option<String>) -> Result<Option<DateTime<Utc>>, RpcError> {
    raw.map(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|_| RpcError::InvalidParams(format!("{path}: must be an RFC 3339 datetime")))
    })
    .transpose()
}
