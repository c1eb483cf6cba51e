//! Capability ports consumed by the services layer.
//!
//! Implementations decide where data actually lives — the in-memory
//! adapter in [`crate::memory`] backs tests and single-process servers,
//! while SQL/object-store/embedding backends plug in behind the same
//! traits without touching the callers.

use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::types::{
    Blob, MnemoResult, Project, Resource, ResourceFilter, SearchHit, Session, Snapshot,
};

/// Fields for a new project row.
#[derive(Debug, Clone, Default)]
pub struct NewProject {
    pub name: String,
    pub git_repo_url: Option<String>,
    pub git_repo_path: Option<String>,
}

/// Fields for a new session row.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub project_id: Uuid,
    pub client_name: Option<String>,
    pub client_version: Option<String>,
}

/// Mutable metadata carried by a resource upsert.
#[derive(Debug, Clone, Default)]
pub struct ResourceMeta {
    pub mime: Option<String>,
    pub title: Option<String>,
}

/// Metadata attached to an indexed blob.
#[derive(Debug, Clone)]
pub struct IndexMeta {
    pub project_id: Uuid,
    pub resource_id: Uuid,
    pub uri: String,
    pub mime: Option<String>,
    pub title: Option<String>,
}

/// Persistence port: projects, sessions, resources, blobs, snapshots.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn find_project_by_repo(
        &self,
        git_repo_url: Option<&str>,
        git_repo_path: Option<&str>,
    ) -> MnemoResult<Option<Project>>;

    async fn find_project_by_name(&self, name: &str) -> MnemoResult<Option<Project>>;

    async fn create_project(&self, new: NewProject) -> MnemoResult<Project>;

    async fn create_session(&self, new: NewSession) -> MnemoResult<Session>;

    /// Insert or update the resource at `uri` within a project.
    async fn upsert_resource(
        &self,
        project_id: Uuid,
        uri: &str,
        meta: ResourceMeta,
    ) -> MnemoResult<Resource>;

    async fn create_blob(
        &self,
        resource_id: Uuid,
        sha256: &str,
        size: u64,
        storage_url: &str,
    ) -> MnemoResult<Blob>;

    async fn set_latest_blob(&self, resource_id: Uuid, blob_id: Uuid) -> MnemoResult<()>;

    async fn list_resources(
        &self,
        project_id: Uuid,
        filter: &ResourceFilter,
    ) -> MnemoResult<Vec<Resource>>;

    /// (resource id, latest blob id) pairs for snapshot manifests.
    async fn list_resources_with_latest(
        &self,
        project_id: Uuid,
    ) -> MnemoResult<Vec<(Uuid, Option<Uuid>)>>;

    async fn create_snapshot(
        &self,
        project_id: Uuid,
        manifest: BTreeMap<Uuid, Uuid>,
        git_sha: Option<&str>,
        label: Option<&str>,
    ) -> MnemoResult<Snapshot>;

    async fn attach_git(
        &self,
        project_id: Uuid,
        git_repo_url: Option<&str>,
        git_repo_path: Option<&str>,
    ) -> MnemoResult<()>;
}

/// Blob-storage port. Returns a locator URL for the stored object.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, key: &str, body: &[u8], mime: &str) -> MnemoResult<String>;
}

/// Semantic-indexing port.
#[async_trait]
pub trait SemanticIndex: Send + Sync {
    async fn index(&self, blob_id: Uuid, text: &str, meta: IndexMeta) -> MnemoResult<()>;

    async fn search(
        &self,
        project_id: Uuid,
        query: &str,
        top_k: usize,
    ) -> MnemoResult<Vec<SearchHit>>;
}
