//! Mnemo — core library for project memory: projects, versioned resources, snapshots, and semantic recall.

pub mod memory;
pub mod ports;
pub mod service;
pub mod types;

pub use memory::MemoryStore;
pub use ports::{ObjectStore, ProjectStore, SemanticIndex};
pub use service::{
    attach_git, list_project_resources, save_text_resource, search_memory, snapshot,
    start_or_resume_project, BootSession, ClientInfo, Context, ProjectHint, SaveTextOpts,
};
pub use types::*;
