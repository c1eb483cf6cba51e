//! In-memory implementation of all three ports.
//!
//! Backs tests and single-process servers. Search is naive token-overlap
//! scoring standing in for a real embedding index behind the same trait.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::ports::{
    IndexMeta, NewProject, NewSession, ObjectStore, ProjectStore, ResourceMeta, SemanticIndex,
};
use crate::types::{
    Blob, MnemoError, MnemoResult, Project, Resource, ResourceFilter, SearchHit, Session, Snapshot,
};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    mime: String,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    blob_id: Uuid,
    project_id: Uuid,
    uri: String,
    title: Option<String>,
    text: String,
}

#[derive(Default)]
struct Inner {
    projects: HashMap<Uuid, Project>,
    sessions: HashMap<Uuid, Session>,
    resources: HashMap<Uuid, Resource>,
    blobs: HashMap<Uuid, Blob>,
    snapshots: HashMap<Uuid, Snapshot>,
    objects: HashMap<String, StoredObject>,
    // Latest indexed content per resource.
    index: HashMap<Uuid, IndexEntry>,
}

/// In-memory store implementing [`ProjectStore`], [`ObjectStore`], and
/// [`SemanticIndex`].
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct stored objects (content-addressed keys).
    pub fn object_count(&self) -> usize {
        self.lock().objects.len()
    }

    /// Fetch a stored object's bytes and mime type by key.
    pub fn get_object(&self, key: &str) -> Option<(Vec<u8>, String)> {
        self.lock()
            .objects
            .get(key)
            .map(|o| (o.bytes.clone(), o.mime.clone()))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn find_project_by_repo(
        &self,
        git_repo_url: Option<&str>,
        git_repo_path: Option<&str>,
    ) -> MnemoResult<Option<Project>> {
        let inner = self.lock();
        let found = inner.projects.values().find(|p| {
            let url_match = match git_repo_url {
                Some(url) => p.git_repo_url.as_deref() == Some(url),
                None => false,
            };
            let path_match = match git_repo_path {
                Some(path) => p.git_repo_path.as_deref() == Some(path),
                None => false,
            };
            url_match || path_match
        });
        Ok(found.cloned())
    }

    async fn find_project_by_name(&self, name: &str) -> MnemoResult<Option<Project>> {
        let inner = self.lock();
        Ok(inner.projects.values().find(|p| p.name == name).cloned())
    }

    async fn create_project(&self, new: NewProject) -> MnemoResult<Project> {
        let project = Project {
            id: Uuid::new_v4(),
            name: new.name,
            git_repo_url: new.git_repo_url,
            git_repo_path: new.git_repo_path,
            created_at: Utc::now(),
        };
        self.lock().projects.insert(project.id, project.clone());
        Ok(project)
    }

    async fn create_session(&self, new: NewSession) -> MnemoResult<Session> {
        let mut inner = self.lock();
        if !inner.projects.contains_key(&new.project_id) {
            return Err(MnemoError::ProjectNotFound(new.project_id));
        }
        let session = Session {
            id: Uuid::new_v4(),
            project_id: new.project_id,
            client_name: new.client_name,
            client_version: new.client_version,
            started_at: Utc::now(),
        };
        inner.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn upsert_resource(
        &self,
        project_id: Uuid,
        uri: &str,
        meta: ResourceMeta,
    ) -> MnemoResult<Resource> {
        let mut inner = self.lock();
        if !inner.projects.contains_key(&project_id) {
            return Err(MnemoError::ProjectNotFound(project_id));
        }
        let existing = inner
            .resources
            .values()
            .find(|r| r.project_id == project_id && r.uri == uri)
            .map(|r| r.id);

        let resource = match existing {
            Some(id) => {
                let r = inner
                    .resources
                    .get_mut(&id)
                    .ok_or(MnemoError::ResourceNotFound(id))?;
                if meta.mime.is_some() {
                    r.mime = meta.mime;
                }
                if meta.title.is_some() {
                    r.title = meta.title;
                }
                r.updated_at = Utc::now();
                r.clone()
            }
            None => {
                let resource = Resource {
                    id: Uuid::new_v4(),
                    project_id,
                    uri: uri.to_string(),
                    title: meta.title,
                    mime: meta.mime,
                    updated_at: Utc::now(),
                    latest_blob_id: None,
                };
                inner.resources.insert(resource.id, resource.clone());
                resource
            }
        };
        Ok(resource)
    }

    async fn create_blob(
        &self,
        resource_id: Uuid,
        sha256: &str,
        size: u64,
        storage_url: &str,
    ) -> MnemoResult<Blob> {
        let mut inner = self.lock();
        if !inner.resources.contains_key(&resource_id) {
            return Err(MnemoError::ResourceNotFound(resource_id));
        }
        let blob = Blob {
            id: Uuid::new_v4(),
            resource_id,
            sha256: sha256.to_string(),
            size,
            storage_url: storage_url.to_string(),
            created_at: Utc::now(),
        };
        inner.blobs.insert(blob.id, blob.clone());
        Ok(blob)
    }

    async fn set_latest_blob(&self, resource_id: Uuid, blob_id: Uuid) -> MnemoResult<()> {
        let mut inner = self.lock();
        let resource = inner
            .resources
            .get_mut(&resource_id)
            .ok_or(MnemoError::ResourceNotFound(resource_id))?;
        resource.latest_blob_id = Some(blob_id);
        resource.updated_at = Utc::now();
        Ok(())
    }

    async fn list_resources(
        &self,
        project_id: Uuid,
        filter: &ResourceFilter,
    ) -> MnemoResult<Vec<Resource>> {
        let inner = self.lock();
        let mut listed: Vec<Resource> = inner
            .resources
            .values()
            .filter(|r| r.project_id == project_id)
            .filter(|r| match &filter.prefix {
                Some(prefix) => r.uri.starts_with(prefix.as_str()),
                None => true,
            })
            .filter(|r| match &filter.mime {
                Some(mime) => r.mime.as_deref() == Some(mime.as_str()),
                None => true,
            })
            .filter(|r| match filter.updated_after {
                Some(after) => r.updated_at > after,
                None => true,
            })
            .filter(|r| match filter.updated_before {
                Some(before) => r.updated_at < before,
                None => true,
            })
            .cloned()
            .collect();
        listed.sort_by(|a, b| a.uri.cmp(&b.uri));
        Ok(listed)
    }

    async fn list_resources_with_latest(
        &self,
        project_id: Uuid,
    ) -> MnemoResult<Vec<(Uuid, Option<Uuid>)>> {
        let inner = self.lock();
        Ok(inner
            .resources
            .values()
            .filter(|r| r.project_id == project_id)
            .map(|r| (r.id, r.latest_blob_id))
            .collect())
    }

    async fn create_snapshot(
        &self,
        project_id: Uuid,
        manifest: BTreeMap<Uuid, Uuid>,
        git_sha: Option<&str>,
        label: Option<&str>,
    ) -> MnemoResult<Snapshot> {
        let mut inner = self.lock();
        if !inner.projects.contains_key(&project_id) {
            return Err(MnemoError::ProjectNotFound(project_id));
        }
        let snapshot = Snapshot {
            id: Uuid::new_v4(),
            project_id,
            manifest,
            git_sha: git_sha.map(str::to_string),
            label: label.map(str::to_string),
            created_at: Utc::now(),
        };
        inner.snapshots.insert(snapshot.id, snapshot.clone());
        Ok(snapshot)
    }

    async fn attach_git(
        &self,
        project_id: Uuid,
        git_repo_url: Option<&str>,
        git_repo_path: Option<&str>,
    ) -> MnemoResult<()> {
        let mut inner = self.lock();
        let project = inner
            .projects
            .get_mut(&project_id)
            .ok_or(MnemoError::ProjectNotFound(project_id))?;
        if git_repo_url.is_some() {
            project.git_repo_url = git_repo_url.map(str::to_string);
        }
        if git_repo_path.is_some() {
            project.git_repo_path = git_repo_path.map(str::to_string);
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, key: &str, body: &[u8], mime: &str) -> MnemoResult<String> {
        let mut inner = self.lock();
        inner.objects.insert(
            key.to_string(),
            StoredObject {
                bytes: body.to_vec(),
                mime: mime.to_string(),
            },
        );
        Ok(format!("mem://{key}"))
    }
}

#[async_trait]
impl SemanticIndex for MemoryStore {
    async fn index(&self, blob_id: Uuid, text: &str, meta: IndexMeta) -> MnemoResult<()> {
        let mut inner = self.lock();
        inner.index.insert(
            meta.resource_id,
            IndexEntry {
                blob_id,
                project_id: meta.project_id,
                uri: meta.uri,
                title: meta.title,
                text: text.to_string(),
            },
        );
        Ok(())
    }

    async fn search(
        &self,
        project_id: Uuid,
        query: &str,
        top_k: usize,
    ) -> MnemoResult<Vec<SearchHit>> {
        let terms = tokenize(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }
        let inner = self.lock();
        let mut hits: Vec<SearchHit> = inner
            .index
            .iter()
            .filter(|(_, entry)| entry.project_id == project_id)
            .filter_map(|(resource_id, entry)| {
                let score = overlap_score(&terms, &entry.text);
                if score <= 0.0 {
                    return None;
                }
                Some(SearchHit {
                    resource_id: *resource_id,
                    blob_id: entry.blob_id,
                    uri: entry.uri.clone(),
                    title: entry.title.clone(),
                    excerpt: excerpt(&entry.text, &terms),
                    score,
                })
            })
            .collect();
        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.uri.cmp(&b.uri))
        });
        hits.truncate(top_k);
        Ok(hits)
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Fraction of query terms present in the document.
fn overlap_score(terms: &[String], text: &str) -> f32 {
    let doc = tokenize(text);
    let matched = terms.iter().filter(|t| doc.contains(t)).count();
    matched as f32 / terms.len() as f32
}

const EXCERPT_LEN: usize = 160;

/// A short window of the document around the first matching term.
fn excerpt(text: &str, terms: &[String]) -> String {
    let lower = text.to_lowercase();
    let at = terms
        .iter()
        .filter_map(|t| lower.find(t.as_str()))
        .min()
        .unwrap_or(0);
    let start = at.saturating_sub(EXCERPT_LEN / 4);
    let start = ceil_char_boundary(text, start);
    let end = ceil_char_boundary(text, (start + EXCERPT_LEN).min(text.len()));
    text[start..end].trim().to_string()
}

fn ceil_char_boundary(text: &str, mut at: usize) -> usize {
    while at < text.len() && !text.is_char_boundary(at) {
        at += 1;
    }
    at.min(text.len())
}
