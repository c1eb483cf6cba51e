//! Server context: the port set plus the ambient project/session resolved
//! when the server boots.

use std::sync::Arc;

use mnemo::{
    start_or_resume_project, BootSession, ClientInfo, Context, MemoryStore, MnemoResult,
    ProjectHint,
};

/// Shared state application methods close over. One per server process;
/// connections share it read-mostly through the ports.
pub struct ServerContext {
    pub ports: Context,
    pub session: BootSession,
}

/// Build a context over the in-memory store and resolve the boot project —
/// hosts typically call a discovery method before anything project-scoped,
/// so the ambient project must already exist.
pub async fn make_server_context(client: ClientInfo) -> MnemoResult<ServerContext> {
    let store = Arc::new(MemoryStore::new());
    let ports = Context {
        store: store.clone(),
        objects: store.clone(),
        index: store,
    };
    let session = start_or_resume_project(&ports, &boot_hint(), Some(&client)).await?;
    Ok(ServerContext { ports, session })
}

fn boot_hint() -> ProjectHint {
    let cwd = std::env::current_dir()
        .ok()
        .map(|p| p.display().to_string());
    ProjectHint {
        name: cwd.clone(),
        git_repo_url: std::env::var("GIT_REMOTE_URL").ok(),
        git_repo_path: cwd,
    }
}
