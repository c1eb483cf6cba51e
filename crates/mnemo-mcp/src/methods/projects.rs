//! Project methods: start_or_resume, attach_git, snapshot.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::json;

use super::{parse_params, resolve_project_id};
use crate::context::ServerContext;
use crate::protocol::ProtocolServer;
use crate::transport::Transport;
use crate::types::RpcError;

#[derive(Debug, Deserialize)]
struct StartOrResumeParams {
    #[serde(default)]
    project_hint: Option<String>,
    #[serde(default)]
    git_repo_url: Option<String>,
    #[serde(default)]
    git_repo_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AttachGitParams {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    git_repo_url: Option<String>,
    #[serde(default)]
    git_repo_path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SnapshotParams {
    #[serde(default)]
    project_id: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    git_sha: Option<String>,
}

pub fn register<T: Transport>(server: &mut ProtocolServer<T>, ctx: Arc<ServerContext>) {
    {
        let ctx = Arc::clone(&ctx);
        server.register("projects.start_or_resume", move |params, _req| {
            let ctx = Arc::clone(&ctx);
            async move {
                let input: StartOrResumeParams = parse_params(params)?;
                let no_hint = input.project_hint.is_none()
                    && input.git_repo_url.is_none()
                    && input.git_repo_path.is_none();
                let boot = if no_hint {
                    ctx.session.clone()
                } else {
                    let hint = mnemo::ProjectHint {
                        name: input.project_hint,
                        git_repo_url: input.git_repo_url,
                        git_repo_path: input.git_repo_path,
                    };
                    mnemo::start_or_resume_project(&ctx.ports, &hint, None).await?
                };
                Ok(json!({
                    "project_id": boot.project_id,
                    "session_id": boot.session_id,
                    "created": boot.created,
                }))
            }
        });
    }

    {
        let ctx = Arc::clone(&ctx);
        server.register("projects.attach_git", move |params, _req| {
            let ctx = Arc::clone(&ctx);
            async move {
                let input: AttachGitParams = parse_params(params)?;
                if input.git_repo_url.is_none() && input.git_repo_path.is_none() {
                    return Err(RpcError::InvalidParams(
                        "provide git_repo_url or git_repo_path".to_string(),
                    ));
                }
                let project_id = resolve_project_id(&ctx, input.project_id.as_deref())?;
                mnemo::attach_git(
                    &ctx.ports,
                    project_id,
                    input.git_repo_url.as_deref(),
                    input.git_repo_path.as_deref(),
                )
                .await?;
                Ok(json!({ "ok": true }))
            }
        });
    }

    server.register("projects.snapshot", move |params, _req| {
        let ctx = Arc::clone(&ctx);
        async move {
            let input: SnapshotParams = parse_params(params)?;
            let project_id = resolve_project_id(&ctx, input.project_id.as_deref())?;
            let snapshot = mnemo::snapshot(
                &ctx.ports,
                project_id,
                input.git_sha.as_deref(),
                input.label.as_deref(),
            )
            .await?;
            Ok(json!({ "snapshot_id": snapshot.id }))
        }
    });
}
