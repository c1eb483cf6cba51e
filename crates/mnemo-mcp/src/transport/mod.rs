//! Transport layer: bidirectional message channels the server runs over.

pub mod framing;
pub mod memory;
pub mod stdio;
pub mod tcp;

pub use memory::{MemoryClient, MemoryTransport};
pub use stdio::StdioTransport;
pub use tcp::TcpTransport;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::types::{RpcError, RpcResult};

/// One inbound frame: a decoded message, or the decode failure for the
/// dispatcher to classify (the transport never answers on its own).
pub type Inbound = Result<Value, RpcError>;

/// Depth of the inbound channel. A full channel pauses the reader task, so
/// a slow handler back-pressures the peer instead of buffering unboundedly.
pub(crate) const INBOUND_CAPACITY: usize = 64;

/// A bidirectional message channel.
///
/// The inbound side is a single-subscriber channel: `incoming` moves the
/// receiver out, so exactly one consumer can ever be attached. `send`
/// writes one complete frame per call; frames never interleave.
#[async_trait]
pub trait Transport: Send {
    /// Begin delivering inbound messages. Calling twice must not spawn a
    /// second reader.
    async fn start(&mut self) -> RpcResult<()>;

    /// Cease delivery. In-flight sends are best-effort.
    async fn stop(&mut self) -> RpcResult<()>;

    /// Deliver one fully-formed outbound message.
    async fn send(&mut self, message: Value) -> RpcResult<()>;

    /// Take the inbound receiver. Returns `None` once taken.
    fn incoming(&mut self) -> Option<mpsc::Receiver<Inbound>>;
}
