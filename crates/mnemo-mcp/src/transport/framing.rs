//! Newline-delimited JSON framing.
//!
//! The decoder is a plain byte-accumulating state machine with no I/O of
//! its own, so byte-stream transports and the dispatcher stay independently
//! testable.

use serde_json::Value;

use crate::types::{RpcError, RpcResult};

/// Accumulates bytes and yields complete, trimmed, non-empty lines.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed raw bytes into the decoder.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Pop the next complete frame, if a full line has arrived. Blank lines
    /// are discarded silently rather than treated as protocol errors.
    pub fn next_frame(&mut self) -> Option<String> {
        while let Some(at) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=at).collect();
            let line = String::from_utf8_lossy(&line[..at]);
            let line = line.trim();
            if !line.is_empty() {
                return Some(line.to_string());
            }
        }
        None
    }
}

/// Decode one frame as a JSON value.
pub fn decode(frame: &str) -> RpcResult<Value> {
    serde_json::from_str(frame).map_err(|e| RpcError::Parse(e.to_string()))
}

/// Serialize a message to a frame (JSON line with trailing newline).
pub fn encode(message: &Value) -> RpcResult<String> {
    let mut json = serde_json::to_string(message).map_err(RpcError::Json)?;
    json.push('\n');
    Ok(json)
}
