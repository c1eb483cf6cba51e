//! Protocol engine: validation, method registry, dispatch.

pub mod registry;
pub mod server;
pub mod validate;

pub use registry::{MethodHandler, MethodRegistry};
pub use server::{serve_tcp, ProtocolServer};
