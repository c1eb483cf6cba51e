//! TCP transport — one instance per accepted connection.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::framing::{self, FrameDecoder};
use super::{Inbound, Transport, INBOUND_CAPACITY};
use crate::types::{RpcError, RpcResult};

/// Transport over one TCP connection. The accept loop lives with the
/// embedding application; each accepted socket gets its own transport and
/// server, so connections proceed fully independently.
pub struct TcpTransport {
    tx: Option<mpsc::Sender<Inbound>>,
    rx: Option<mpsc::Receiver<Inbound>>,
    read_half: Option<OwnedReadHalf>,
    write_half: OwnedWriteHalf,
    reader: Option<JoinHandle<()>>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        Self {
            tx: Some(tx),
            rx: Some(rx),
            read_half: Some(read_half),
            write_half,
            reader: None,
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn start(&mut self) -> RpcResult<()> {
        if self.reader.is_some() {
            return Ok(());
        }
        let (tx, mut read_half) = match (self.tx.take(), self.read_half.take()) {
            (Some(tx), Some(read_half)) => (tx, read_half),
            _ => return Err(RpcError::Transport("transport already stopped".to_string())),
        };

        self.reader = Some(tokio::spawn(async move {
            let mut decoder = FrameDecoder::new();
            let mut chunk = [0u8; 8192];
            loop {
                match read_half.read(&mut chunk).await {
                    Ok(0) => {
                        tracing::debug!("peer closed connection");
                        break;
                    }
                    Ok(n) => {
                        decoder.push(&chunk[..n]);
                        while let Some(frame) = decoder.next_frame() {
                            if tx.send(framing::decode(&frame)).await.is_err() {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!("socket read failed: {e}");
                        break;
                    }
                }
            }
        }));

        Ok(())
    }

    async fn stop(&mut self) -> RpcResult<()> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.tx = None;
        let _ = self.write_half.shutdown().await;
        Ok(())
    }

    async fn send(&mut self, message: Value) -> RpcResult<()> {
        let framed = framing::encode(&message)?;
        self.write_half
            .write_all(framed.as_bytes())
            .await
            .map_err(RpcError::Io)?;
        self.write_half.flush().await.map_err(RpcError::Io)
    }

    fn incoming(&mut self) -> Option<mpsc::Receiver<Inbound>> {
        self.rx.take()
    }
}
