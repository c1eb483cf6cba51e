//! In-process transport test double.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use super::{Inbound, Transport, INBOUND_CAPACITY};
use crate::types::{RpcError, RpcResult};

/// In-memory transport. Sent messages land in a shared outbox; the paired
/// [`MemoryClient`] injects inbound frames.
pub struct MemoryTransport {
    rx: Option<mpsc::Receiver<Inbound>>,
    outbox: Arc<Mutex<Vec<Value>>>,
    stopped: bool,
}

/// Test-side handle: pushes inbound frames and reads what the server sent.
#[derive(Clone)]
pub struct MemoryClient {
    tx: mpsc::Sender<Inbound>,
    outbox: Arc<Mutex<Vec<Value>>>,
}

impl MemoryTransport {
    /// Build a transport plus its client handle. Dropping every client
    /// clone closes the inbound channel and ends the server's run loop.
    pub fn pair() -> (Self, MemoryClient) {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let outbox = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                rx: Some(rx),
                outbox: outbox.clone(),
                stopped: false,
            },
            MemoryClient { tx, outbox },
        )
    }
}

impl MemoryClient {
    /// Inject one decoded inbound message.
    pub async fn push(&self, message: Value) {
        let _ = self.tx.send(Ok(message)).await;
    }

    /// Inject a frame-decode failure, as a byte transport would surface it.
    pub async fn push_decode_failure(&self, error: RpcError) {
        let _ = self.tx.send(Err(error)).await;
    }

    /// Snapshot of everything the server has sent so far.
    pub fn sent(&self) -> Vec<Value> {
        self.outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn start(&mut self) -> RpcResult<()> {
        Ok(())
    }

    async fn stop(&mut self) -> RpcResult<()> {
        self.stopped = true;
        Ok(())
    }

    async fn send(&mut self, message: Value) -> RpcResult<()> {
        if self.stopped {
            return Err(RpcError::Transport("transport stopped".to_string()));
        }
        self.outbox
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(message);
        Ok(())
    }

    fn incoming(&mut self) -> Option<mpsc::Receiver<Inbound>> {
        self.rx.take()
    }
}
