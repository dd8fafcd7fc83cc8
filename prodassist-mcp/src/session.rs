//! A long-lived connection to one tool server with typed lookups.

use crate::client::McpClient;
use crate::error::McpError;
use crate::protocol::McpTool;
use crate::transport::Transport;
use async_trait::async_trait;
use prodassist_core::types::Lookup;
use std::time::Duration;
use tokio::process::Child;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Grace period for the server to exit after its stdin closes.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Anything that can run a named single-query tool and classify the result.
#[async_trait]
pub trait ToolLookup: Send + Sync {
    async fn lookup(&self, tool: &str, query: &str) -> Lookup;
}

/// One transport, discovered once, shared by every lookup.
///
/// Calls are serialized through a mutex; the protocol has one request in
/// flight at a time.
pub struct ToolSession {
    client: Mutex<McpClient>,
    tools: Vec<McpTool>,
    child: Mutex<Option<Child>>,
}

impl ToolSession {
    /// Handshake over `transport` and discover the server's tools.
    pub async fn connect(transport: Box<dyn Transport>) -> Result<Self, McpError> {
        let mut client = McpClient::new(transport);
        client.initialize().await?;
        let tools = client.list_tools().await?;
        debug!(
            tools = ?tools.iter().map(|t| t.name.as_str()).collect::<Vec<_>>(),
            "Tool session ready"
        );
        Ok(Self {
            client: Mutex::new(client),
            tools,
            child: Mutex::new(None),
        })
    }

    /// Tie a spawned server process to this session's lifetime.
    pub fn with_child(self, child: Child) -> Self {
        Self {
            child: Mutex::new(Some(child)),
            ..self
        }
    }

    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.name == name)
    }

    /// Close the transport and wait briefly for the server process to exit.
    pub async fn shutdown(&self) -> Result<(), McpError> {
        self.client.lock().await.close().await?;
        if let Some(mut child) = self.child.lock().await.take() {
            match tokio::time::timeout(SHUTDOWN_GRACE, child.wait()).await {
                Ok(status) => {
                    let status = status?;
                    debug!(%status, "Tool server exited");
                }
                Err(_) => {
                    warn!("Tool server did not exit, killing it");
                    child.kill().await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ToolLookup for ToolSession {
    /// Transport and protocol failures become [`Lookup::Failed`].
    async fn lookup(&self, tool: &str, query: &str) -> Lookup {
        if !self.has_tool(tool) {
            return Lookup::Failed(
                McpError::ToolUnavailable {
                    name: tool.to_string(),
                }
                .to_string(),
            );
        }

        let result = self
            .client
            .lock()
            .await
            .call_tool(tool, serde_json::json!({ "query": query }))
            .await;

        match result {
            Ok(result) => Lookup::classify(&result.joined_text(), result.is_error()),
            Err(e) => {
                warn!(tool, error = %e, "Tool call failed");
                Lookup::Failed(e.to_string())
            }
        }
    }
}
