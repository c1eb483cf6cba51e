//! Mnemo MCP Server — project memory for AI agents over JSON-RPC.

pub mod config;
pub mod context;
pub mod methods;
pub mod protocol;
pub mod transport;
pub mod types;

pub use context::{make_server_context, ServerContext};
pub use protocol::{serve_tcp, MethodRegistry, ProtocolServer};
pub use transport::{MemoryTransport, StdioTransport, TcpTransport};
