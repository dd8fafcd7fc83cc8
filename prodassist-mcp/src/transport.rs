//! Message transports for the tool protocol.
//!
//! Every transport moves whole JSON-RPC messages as strings:
//! - [`LineTransport`]: NDJSON over any async reader/writer pair
//! - [`StdioTransport`]: the server side, over the process stdin/stdout
//! - [`ProcessTransport`]: the client side, over a spawned server's pipes
//! - [`ChannelTransport`]: in-process tokio mpsc channels (for tests)

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

use crate::error::McpError;

/// Reads and writes framed JSON-RPC messages.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Next message, or `Ok(None)` once the peer has closed its side.
    async fn read_message(&mut self) -> Result<Option<String>, McpError>;

    /// Write one message, framing and flushing it.
    async fn write_message(&mut self, message: &str) -> Result<(), McpError>;

    async fn close(&mut self) -> Result<(), McpError>;
}

// ---------------------------------------------------------------------------
// LineTransport
// ---------------------------------------------------------------------------

/// Newline-delimited JSON: one message per line. Blank lines are skipped.
pub struct LineTransport<R, W> {
    reader: R,
    writer: W,
}

impl<R, W> LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }
}

#[async_trait]
impl<R, W> Transport for LineTransport<R, W>
where
    R: AsyncBufRead + Unpin + Send + Sync,
    W: AsyncWrite + Unpin + Send + Sync,
{
    async fn read_message(&mut self) -> Result<Option<String>, McpError> {
        loop {
            let mut line = String::new();
            if self.reader.read_line(&mut line).await? == 0 {
                return Ok(None);
            }
            let trimmed = line.trim_end();
            if !trimmed.is_empty() {
                return Ok(Some(trimmed.to_string()));
            }
        }
    }

    async fn write_message(&mut self, message: &str) -> Result<(), McpError> {
        if message.contains('\n') {
            return Err(McpError::TransportError {
                message: "message contains a raw newline".into(),
            });
        }
        self.writer.write_all(message.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.writer.shutdown().await?;
        Ok(())
    }
}

/// Server transport over the process stdin/stdout.
pub type StdioTransport = LineTransport<BufReader<tokio::io::Stdin>, tokio::io::Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        LineTransport::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

// ---------------------------------------------------------------------------
// ProcessTransport
// ---------------------------------------------------------------------------

/// Client transport over the pipes of a spawned tool server.
pub type ProcessTransport = LineTransport<BufReader<ChildStdout>, ChildStdin>;

/// Spawn `command` and connect to its stdin/stdout.
///
/// The child's stderr is inherited so server logs reach the terminal. The
/// returned [`Child`] is killed when dropped.
pub fn spawn_process(
    command: &Path,
    args: &[String],
    env: &HashMap<String, String>,
) -> Result<(ProcessTransport, Child), McpError> {
    let mut child = Command::new(command)
        .args(args)
        .envs(env)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| McpError::TransportError {
            message: format!("Failed to spawn {}: {}", command.display(), e),
        })?;

    let stdin = child.stdin.take().ok_or_else(|| McpError::TransportError {
        message: "Failed to capture child stdin".into(),
    })?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| McpError::TransportError {
            message: "Failed to capture child stdout".into(),
        })?;

    Ok((LineTransport::new(BufReader::new(stdout), stdin), child))
}

// ---------------------------------------------------------------------------
// ChannelTransport
// ---------------------------------------------------------------------------

/// In-process transport backed by tokio mpsc channels.
pub struct ChannelTransport {
    receiver: mpsc::Receiver<String>,
    sender: mpsc::Sender<String>,
}

impl ChannelTransport {
    pub fn new(receiver: mpsc::Receiver<String>, sender: mpsc::Sender<String>) -> Self {
        Self { receiver, sender }
    }

    /// Two connected ends: what one writes the other reads.
    pub fn pair(buffer: usize) -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::channel(buffer);
        let (tx_b, rx_b) = mpsc::channel(buffer);
        (
            ChannelTransport::new(rx_a, tx_b),
            ChannelTransport::new(rx_b, tx_a),
        )
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn read_message(&mut self) -> Result<Option<String>, McpError> {
        Ok(self.receiver.recv().await)
    }

    async fn write_message(&mut self, message: &str) -> Result<(), McpError> {
        self.sender
            .send(message.to_string())
            .await
            .map_err(|e| McpError::TransportError {
                message: format!("channel send failed: {e}"),
            })
    }

    async fn close(&mut self) -> Result<(), McpError> {
        self.receiver.close();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_line_transport_frames_messages() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let (server_read, server_write) = tokio::io::split(server_io);
        let mut client = LineTransport::new(BufReader::new(client_read), client_write);
        let mut server = LineTransport::new(BufReader::new(server_read), server_write);

        client.write_message(r#"{"id":1}"#).await.unwrap();
        client.write_message(r#"{"id":2}"#).await.unwrap();
        let first = server.read_message().await.unwrap();
        assert_eq!(first.as_deref(), Some(r#"{"id":1}"#));
        let second = server.read_message().await.unwrap();
        assert_eq!(second.as_deref(), Some(r#"{"id":2}"#));

        client.close().await.unwrap();
        assert_eq!(server.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_transport_skips_blank_lines() {
        let input: &[u8] = b"\n\r\n{\"a\":1}\r\n";
        let mut transport = LineTransport::new(BufReader::new(input), tokio::io::sink());
        assert_eq!(
            transport.read_message().await.unwrap().as_deref(),
            Some(r#"{"a":1}"#)
        );
        assert_eq!(transport.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_line_transport_rejects_embedded_newline() {
        let mut transport = LineTransport::new(BufReader::new(&b""[..]), tokio::io::sink());
        let result = transport.write_message("{\n}").await;
        assert!(matches!(result, Err(McpError::TransportError { .. })));
    }

    #[tokio::test]
    async fn test_channel_transport_roundtrip_and_eof() {
        let (mut client, mut server) = ChannelTransport::pair(16);
        client.write_message(r#"{"method":"ping"}"#).await.unwrap();
        assert_eq!(
            server.read_message().await.unwrap().as_deref(),
            Some(r#"{"method":"ping"}"#)
        );

        drop(client);
        assert_eq!(server.read_message().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let result = spawn_process(
            Path::new("nonexistent_binary_that_does_not_exist"),
            &[],
            &HashMap::new(),
        );
        match result {
            Err(e) => assert!(e.to_string().contains("Failed to spawn")),
            Ok(_) => panic!("Expected spawn to fail"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_process_transport_echo_roundtrip() {
        // `cat` copies stdin to stdout.
        if let Ok((mut transport, _child)) = spawn_process(Path::new("cat"), &[], &HashMap::new())
        {
            transport.write_message(r#"{"id":1}"#).await.unwrap();
            assert_eq!(
                transport.read_message().await.unwrap().as_deref(),
                Some(r#"{"id":1}"#)
            );
        }
    }
}
