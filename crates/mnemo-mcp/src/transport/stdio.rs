//! Stdio transport — frames on stdin/stdout, logs on stderr.

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::framing::{self, FrameDecoder};
use super::{Inbound, Transport, INBOUND_CAPACITY};
use crate::types::{RpcError, RpcResult};

/// Transport over the process's stdin/stdout, for desktop hosts that spawn
/// the server as a child process.
pub struct StdioTransport {
    tx: Option<mpsc::Sender<Inbound>>,
    rx: Option<mpsc::Receiver<Inbound>>,
    stdout: tokio::io::Stdout,
    reader: Option<JoinHandle<()>>,
}

impl StdioTransport {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        Self {
            tx: Some(tx),
            rx: Some(rx),
            stdout: tokio::io::stdout(),
            reader: None,
        }
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for StdioTransport {
    async fn start(&mut self) -> RpcResult<()> {
        if self.reader.is_some() {
            return Ok(());
        }
        let tx = match self.tx.take() {
            Some(tx) => tx,
            None => return Err(RpcError::Transport("transport already stopped".to_string())),
        };

        self.reader = Some(tokio::spawn(async move {
            let mut stdin = tokio::io::stdin();
            let mut decoder = FrameDecoder::new();
            let mut chunk = [0u8; 8192];
            loop {
                match stdin.read(&mut chunk).await {
                    Ok(0) => {
                        tracing::info!("EOF on stdin, closing inbound channel");
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
                        tracing::error!("stdin read failed: {e}");
                        break;
                    }
                }
            }
            // tx drops here; the receiver sees the channel close.
        }));

        tracing::info!("stdio transport started");
        Ok(())
    }

    async fn stop(&mut self) -> RpcResult<()> {
        if let Some(reader) = self.reader.take() {
            reader.abort();
        }
        self.tx = None;
        Ok(())
    }

    async fn send(&mut self, message: Value) -> RpcResult<()> {
        let framed = framing::encode(&message)?;
        self.stdout
            .write_all(framed.as_bytes())
            .await
            .map_err(RpcError::Io)?;
        self.stdout.flush().await.map_err(RpcError::Io)
    }

    fn incoming(&mut self) -> Option<mpsc::Receiver<Inbound>> {
        self.rx.take()
    }
}
