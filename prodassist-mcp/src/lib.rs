//! # prodassist MCP
//!
//! The product tool server and the client that talks to it.
//!
//! The server exposes `get_product_info` and `web_search` via JSON-RPC 2.0
//! over stdio. The client side spawns the server, performs the handshake, and
//! applies the local-first retrieval policy on top of the two tools.
//!
//! ## Architecture
//!
//! ```text
//! RoutedContext -> ToolSession -> McpClient -> Transport (process pipes)
//!                                                  |
//!                       Transport (stdio) <- McpServer <- RequestHandler <- ToolRegistry
//! ```

pub mod client;
pub mod discovery;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod routing;
pub mod session;
pub mod transport;

pub use client::McpClient;
pub use discovery::spawn_session;
pub use error::McpError;
pub use routing::{RoutedAnswer, RoutedContext, Source, route_query};
pub use session::ToolSession;

use handlers::RequestHandler;
use protocol::{IncomingMessage, JSONRPC_VERSION, JsonRpcResponse, RequestId};
use prodassist_tools::registry::ToolRegistry;
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use transport::Transport;

/// Processes JSON-RPC messages from a transport until the peer disconnects.
pub struct McpServer {
    handler: RequestHandler,
}

impl McpServer {
    pub fn new(tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            handler: RequestHandler::new(tool_registry),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.handler.is_initialized()
    }

    /// Serve until EOF. Malformed messages get an error response with a null
    /// id; only transport write failures end the loop early.
    pub async fn run<T: Transport + ?Sized>(&mut self, transport: &mut T) -> Result<(), McpError> {
        info!("Tool server starting");

        loop {
            let message = match transport.read_message().await {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    info!("Transport closed, shutting down tool server");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Transport read error");
                    break;
                }
            };
            debug!(message = %message, "Received message");

            let response = match self.process_message(&message).await {
                Ok(Some(response)) => response,
                Ok(None) => continue,
                Err(e) => {
                    warn!(error = %e, "Rejected malformed message");
                    JsonRpcResponse::from_mcp_error(RequestId::Null, e)
                }
            };
            let json = serde_json::to_string(&response)?;
            transport.write_message(&json).await?;
        }

        transport.close().await?;
        info!("Tool server stopped");
        Ok(())
    }

    /// `Some(response)` for requests, `None` for notifications.
    async fn process_message(&mut self, raw: &str) -> Result<Option<JsonRpcResponse>, McpError> {
        let incoming: IncomingMessage =
            serde_json::from_str(raw).map_err(|e| McpError::ParseError {
                message: format!("Invalid JSON-RPC message: {}", e),
            })?;

        if incoming.jsonrpc != JSONRPC_VERSION {
            return Err(McpError::InvalidRequest {
                message: format!("Expected jsonrpc version 2.0, got: {}", incoming.jsonrpc),
            });
        }

        let Some(id) = incoming.id else {
            if let Err(e) = self.handler.route(&incoming.method, incoming.params).await {
                warn!(method = %incoming.method, error = %e, "Notification handler error");
            }
            return Ok(None);
        };

        let response = match self.handler.route(&incoming.method, incoming.params).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => JsonRpcResponse::from_mcp_error(id, e),
        };
        Ok(Some(response))
    }
}
