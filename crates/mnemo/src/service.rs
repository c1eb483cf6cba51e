//! Port-orchestration services: the operations the RPC methods delegate to.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::ports::{
    IndexMeta, NewProject, NewSession, ObjectStore, ProjectStore, ResourceMeta, SemanticIndex,
};
use crate::types::{MnemoResult, Project, ResourceFilter, ResourceListItem, SearchHit, Snapshot};

/// The set of ports every service call runs against.
#[derive(Clone)]
pub struct Context {
    pub store: Arc<dyn ProjectStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub index: Arc<dyn SemanticIndex>,
}

/// Hints used to resolve or create a project on connect.
#[derive(Debug, Clone, Default)]
pub struct ProjectHint {
    pub name: Option<String>,
    pub git_repo_url: Option<String>,
    pub git_repo_path: Option<String>,
}

/// Identity of the connecting client, recorded on the session.
#[derive(Debug, Clone)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

/// Result of [`start_or_resume_project`].
#[derive(Debug, Clone)]
pub struct BootSession {
    pub project_id: Uuid,
    pub session_id: Uuid,
    pub created: bool,
}

/// Options for [`save_text_resource`].
#[derive(Debug, Clone)]
pub struct SaveTextOpts {
    pub mime: String,
    pub content: String,
    pub title: Option<String>,
}

/// Resolve an existing project from the hint (repo url/path first, then
/// name) or create one, then open a session on it.
///
/// `created` reports whether the hint carried no resolution key at all, in
/// which case a throwaway project is always created.
pub async fn start_or_resume_project(
    ctx: &Context,
    hint: &ProjectHint,
    client: Option<&ClientInfo>,
) -> MnemoResult<BootSession> {
    let key = hint
        .git_repo_url
        .as_deref()
        .or(hint.git_repo_path.as_deref())
        .or(hint.name.as_deref());

    let existing = find_existing_project(ctx, hint, key).await?;
    let project = match existing {
        Some(p) => p,
        None => create_project_from_hint(ctx, hint).await?,
    };

    let session = ctx
        .store
        .create_session(NewSession {
            project_id: project.id,
            client_name: client.map(|c| c.name.clone()),
            client_version: client.map(|c| c.version.clone()),
        })
        .await?;

    tracing::info!(project = %project.id, session = %session.id, "session opened");

    Ok(BootSession {
        project_id: project.id,
        session_id: session.id,
        created: key.is_none(),
    })
}

async fn find_existing_project(
    ctx: &Context,
    hint: &ProjectHint,
    key: Option<&str>,
) -> MnemoResult<Option<Project>> {
    if hint.git_repo_url.is_some() || hint.git_repo_path.is_some() {
        return ctx
            .store
            .find_project_by_repo(hint.git_repo_url.as_deref(), hint.git_repo_path.as_deref())
            .await;
    }
    if let Some(name) = key {
        return ctx.store.find_project_by_name(name).await;
    }
    Ok(None)
}

async fn create_project_from_hint(ctx: &Context, hint: &ProjectHint) -> MnemoResult<Project> {
    let name = match (&hint.git_repo_url, &hint.name) {
        (Some(url), _) => url.clone(),
        (None, Some(name)) => name.clone(),
        (None, None) => format!("Untitled {}", Utc::now().to_rfc3339()),
    };
    ctx.store
        .create_project(NewProject {
            name,
            git_repo_url: hint.git_repo_url.clone(),
            git_repo_path: hint.git_repo_path.clone(),
        })
        .await
}

/// Save one text resource version: upsert the resource, store the content
/// under a content-addressed key, record the blob, and index it.
pub async fn save_text_resource(
    ctx: &Context,
    project_id: Uuid,
    uri: &str,
    opts: SaveTextOpts,
) -> MnemoResult<Uuid> {
    let resource = ctx
        .store
        .upsert_resource(
            project_id,
            uri,
            ResourceMeta {
                mime: Some(opts.mime.clone()),
                title: opts.title.clone(),
            },
        )
        .await?;

    let sha = hex::encode(Sha256::digest(opts.content.as_bytes()));
    let key = format!("{project_id}/{sha}");
    let storage_url = ctx
        .objects
        .put_object(&key, opts.content.as_bytes(), &opts.mime)
        .await?;

    let blob = ctx
        .store
        .create_blob(
            resource.id,
            &sha,
            opts.content.len() as u64,
            &storage_url,
        )
        .await?;
    ctx.store.set_latest_blob(resource.id, blob.id).await?;

    // Inline for now; a real embedding backend would queue this.
    ctx.index
        .index(
            blob.id,
            &opts.content,
            IndexMeta {
                project_id,
                resource_id: resource.id,
                uri: uri.to_string(),
                mime: Some(opts.mime),
                title: opts.title,
            },
        )
        .await?;

    Ok(resource.id)
}

/// Capture a manifest of every resource's latest blob. Resources that have
/// never stored content are left out.
pub async fn snapshot(
    ctx: &Context,
    project_id: Uuid,
    git_sha: Option<&str>,
    label: Option<&str>,
) -> MnemoResult<Snapshot> {
    let listed = ctx.store.list_resources_with_latest(project_id).await?;
    let mut manifest = BTreeMap::new();
    for (resource_id, latest) in listed {
        if let Some(blob_id) = latest {
            manifest.insert(resource_id, blob_id);
        }
    }
    ctx.store
        .create_snapshot(project_id, manifest, git_sha, label)
        .await
}

pub async fn attach_git(
    ctx: &Context,
    project_id: Uuid,
    git_repo_url: Option<&str>,
    git_repo_path: Option<&str>,
) -> MnemoResult<()> {
    ctx.store
        .attach_git(project_id, git_repo_url, git_repo_path)
        .await
}

/// List a project's resources, mapped to wire items.
pub async fn list_project_resources(
    ctx: &Context,
    project_id: Uuid,
    filter: &ResourceFilter,
) -> MnemoResult<Vec<ResourceListItem>> {
    let resources = ctx.store.list_resources(project_id, filter).await?;
    Ok(resources
        .into_iter()
        .map(|r| ResourceListItem {
            id: r.id,
            uri: r.uri,
            title: r.title,
            mime: r.mime,
            updated_at: r.updated_at.to_rfc3339(),
            latest_blob_id: r.latest_blob_id,
        })
        .collect())
}

pub async fn search_memory(
    ctx: &Context,
    project_id: Uuid,
    query: &str,
    top_k: usize,
) -> MnemoResult<Vec<SearchHit>> {
    ctx.index.search(project_id, query, top_k).await
}
