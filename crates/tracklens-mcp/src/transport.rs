//! Transport layer for MCP JSON-RPC communication.
//!
//! MCP uses newline-delimited JSON over stdin/stdout.

use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};

use crate::protocol::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};

/// Message that can be received from the client.
#[derive(Debug)]
pub enum IncomingMessage {
    Request(JsonRpcRequest),
    Notification(JsonRpcNotification),
}

/// Line-delimited JSON-RPC transport over any async reader/writer pair.
pub struct Transport<R, W> {
    reader: R,
    writer: W,
}

/// Transport bound to the process stdin/stdout.
pub type StdioTransport = Transport<BufReader<Stdin>, Stdout>;

impl StdioTransport {
    /// Create a transport using stdin/stdout.
    pub fn stdio() -> Self {
        Transport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> Transport<R, W>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    /// Read the next JSON-RPC message. Blank lines are skipped; `None`
    /// means EOF.
    pub async fn read_message(&mut self) -> io::Result<Option<IncomingMessage>> {
        let mut line = String::new();
        loop {
            line.clear();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            tracing::debug!("Received: {}", trimmed);

            // Requests carry an id, notifications do not
            if let Ok(request) = serde_json::from_str::<JsonRpcRequest>(trimmed) {
                return Ok(Some(IncomingMessage::Request(request)));
            }
            if let Ok(notification) = serde_json::from_str::<JsonRpcNotification>(trimmed) {
                return Ok(Some(IncomingMessage::Notification(notification)));
            }

            tracing::warn!("Failed to parse message: {}", trimmed);
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Invalid JSON-RPC message: {}", trimmed),
            ));
        }
    }

    /// Write a JSON-RPC response followed by a newline.
    pub async fn write_response(&mut self, response: &JsonRpcResponse) -> io::Result<()> {
        let mut json = serde_json::to_string(response).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("Serialization error: {}", e))
        })?;

        tracing::debug!("Sending: {}", json);

        json.push('\n');
        self.writer.write_all(json.as_bytes()).await?;
        self.writer.flush().await
    }

    /// Consume the transport, returning the writer.
    pub fn into_writer(self) -> W {
        self.writer
    }
}
