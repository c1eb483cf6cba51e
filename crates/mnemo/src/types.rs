//! Core data types for projects, versioned resources, and recall.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A project — the top-level container every resource and session belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub git_repo_url: Option<String>,
    pub git_repo_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One client connection's working session against a project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub project_id: Uuid,
    pub client_name: Option<String>,
    pub client_version: Option<String>,
    pub started_at: DateTime<Utc>,
}

/// A named, URI-addressed resource. Content lives in blobs; the resource
/// tracks the latest one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: Uuid,
    pub project_id: Uuid,
    pub uri: String,
    pub title: Option<String>,
    pub mime: Option<String>,
    pub updated_at: DateTime<Utc>,
    pub latest_blob_id: Option<Uuid>,
}

/// An immutable, content-addressed version of a resource's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    pub id: Uuid,
    pub resource_id: Uuid,
    pub sha256: String,
    pub size: u64,
    pub storage_url: String,
    pub created_at: DateTime<Utc>,
}

/// A point-in-time manifest mapping resource ids to their latest blob ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: Uuid,
    pub project_id: Uuid,
    pub manifest: BTreeMap<Uuid, Uuid>,
    pub git_sha: Option<String>,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Filter for resource listings. All fields are conjunctive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceFilter {
    pub prefix: Option<String>,
    pub mime: Option<String>,
    pub updated_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
}

/// Wire-shaped resource listing entry. Optional fields serialize as
/// explicit nulls, timestamps as RFC 3339.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceListItem {
    pub id: Uuid,
    pub uri: String,
    pub title: Option<String>,
    pub mime: Option<String>,
    pub updated_at: String,
    pub latest_blob_id: Option<Uuid>,
}

/// A ranked semantic search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub resource_id: Uuid,
    pub blob_id: Uuid,
    pub uri: String,
    pub title: Option<String>,
    pub excerpt: String,
    pub score: f32,
}

/// Errors that can occur in the memory library.
#[derive(thiserror::Error, Debug)]
pub enum MnemoError {
    #[error("Project not found: {0}")]
    ProjectNotFound(Uuid),

    #[error("Resource not found: {0}")]
    ResourceNotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Index error: {0}")]
    Index(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenience result type.
pub type MnemoResult<T> = Result<T, MnemoError>;
