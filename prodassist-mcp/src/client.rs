//! Client side of the tool protocol.
//!
//! [`McpClient`] owns a transport to a tool server, performs the
//! initialization handshake, lists tools, and issues tool calls. Requests are
//! strictly sequential: one request is in flight at a time.

use crate::error::McpError;
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, JsonRpcNotification,
    JsonRpcRequest, JsonRpcResponse, ListToolsResult, MCP_PROTOCOL_VERSION, McpTool, PeerInfo,
    RequestId,
};
use crate::transport::Transport;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

pub struct McpClient {
    transport: Box<dyn Transport>,
    server_info: Option<PeerInfo>,
    next_id: i64,
}

impl McpClient {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport,
            server_info: None,
            next_id: 1,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.server_info.is_some()
    }

    pub fn server_info(&self) -> Option<&PeerInfo> {
        self.server_info.as_ref()
    }

    /// Handshake: `initialize` followed by `notifications/initialized`.
    pub async fn initialize(&mut self) -> Result<PeerInfo, McpError> {
        let params = InitializeParams {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: Value::Object(Default::default()),
            client_info: PeerInfo::current(),
        };
        let result: InitializeResult = self
            .request("initialize", Some(serde_json::to_value(params)?))
            .await?;

        if result.protocol_version != MCP_PROTOCOL_VERSION {
            warn!(
                server_version = %result.protocol_version,
                "Tool server speaks a different protocol version"
            );
        }
        info!(
            server = %result.server_info.name,
            version = %result.server_info.version,
            "Connected to tool server"
        );

        let notification = JsonRpcNotification::new("notifications/initialized");
        self.transport
            .write_message(&serde_json::to_string(&notification)?)
            .await?;

        self.server_info = Some(result.server_info.clone());
        Ok(result.server_info)
    }

    pub async fn list_tools(&mut self) -> Result<Vec<McpTool>, McpError> {
        self.require_initialized()?;
        let result: ListToolsResult = self.request("tools/list", None).await?;
        debug!(count = result.tools.len(), "Discovered tools");
        Ok(result.tools)
    }

    pub async fn call_tool(
        &mut self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, McpError> {
        self.require_initialized()?;
        let params = CallToolParams {
            name: name.to_string(),
            arguments: Some(arguments),
        };
        self.request("tools/call", Some(serde_json::to_value(params)?))
            .await
    }

    pub async fn ping(&mut self) -> Result<(), McpError> {
        let _: Value = self.request("ping", None).await?;
        Ok(())
    }

    pub async fn close(&mut self) -> Result<(), McpError> {
        self.transport.close().await
    }

    fn require_initialized(&self) -> Result<(), McpError> {
        if self.is_initialized() {
            Ok(())
        } else {
            Err(McpError::NotInitialized)
        }
    }

    async fn request<T: DeserializeOwned>(
        &mut self,
        method: &str,
        params: Option<Value>,
    ) -> Result<T, McpError> {
        let id = self.next_id;
        self.next_id += 1;

        let request = JsonRpcRequest::new(id, method, params);
        self.transport
            .write_message(&serde_json::to_string(&request)?)
            .await?;

        let response = self.read_response(RequestId::Number(id)).await?;
        let result = response.into_result()?;
        serde_json::from_value(result).map_err(|e| McpError::ParseError {
            message: format!("Unexpected {} result: {}", method, e),
        })
    }

    /// Read until the response to `expected` arrives. Stray messages with
    /// other ids are logged and dropped.
    async fn read_response(&mut self, expected: RequestId) -> Result<JsonRpcResponse, McpError> {
        loop {
            let raw = self
                .transport
                .read_message()
                .await?
                .ok_or_else(|| McpError::TransportError {
                    message: "Transport closed while waiting for response".into(),
                })?;

            let response: JsonRpcResponse =
                serde_json::from_str(&raw).map_err(|e| McpError::ParseError {
                    message: format!("Invalid JSON-RPC response: {}", e),
                })?;

            if response.id == expected {
                return Ok(response);
            }
            debug!(id = ?response.id, "Dropping response for another request");
        }
    }
}
