//! Request routing for the tool server.

use crate::error::McpError;
use crate::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, ListToolsResult,
    MCP_PROTOCOL_VERSION, McpTool, PeerInfo, ServerCapabilities, ToolsCapability,
};
use prodassist_tools::registry::ToolRegistry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Dispatches JSON-RPC methods to the tool registry.
///
/// Everything except `initialize` and `ping` is refused until the client has
/// completed the handshake.
pub struct RequestHandler {
    tool_registry: Arc<ToolRegistry>,
    initialized: bool,
    server_info: PeerInfo,
}

impl RequestHandler {
    pub fn new(tool_registry: Arc<ToolRegistry>) -> Self {
        Self {
            tool_registry,
            initialized: false,
            server_info: PeerInfo::current(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn require_initialized(&self) -> Result<(), McpError> {
        if self.initialized {
            Ok(())
        } else {
            Err(McpError::NotInitialized)
        }
    }

    pub fn handle_initialize(&mut self, params: InitializeParams) -> Result<Value, McpError> {
        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            protocol_version = %params.protocol_version,
            "Tool client connecting"
        );
        if params.protocol_version != MCP_PROTOCOL_VERSION {
            warn!(
                requested = %params.protocol_version,
                offered = MCP_PROTOCOL_VERSION,
                "Client requested a different protocol version"
            );
        }

        self.initialized = true;

        to_value(InitializeResult {
            protocol_version: MCP_PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: Some(false),
                }),
            },
            server_info: self.server_info.clone(),
        })
    }

    pub fn handle_tools_list(&self) -> Result<Value, McpError> {
        self.require_initialized()?;

        let tools: Vec<McpTool> = self
            .tool_registry
            .list_definitions()
            .into_iter()
            .map(McpTool::from)
            .collect();
        debug!(count = tools.len(), "Listing tools");

        to_value(ListToolsResult { tools })
    }

    /// Run a tool. Tool-level failures come back as an `isError` result, not
    /// as a JSON-RPC error, so the caller can still read the message.
    pub async fn handle_tools_call(&self, params: CallToolParams) -> Result<Value, McpError> {
        self.require_initialized()?;

        let tool_name = params.name.as_str();
        if self.tool_registry.get(tool_name).is_none() {
            return Err(McpError::ToolUnavailable {
                name: tool_name.to_string(),
            });
        }
        let arguments = params
            .arguments
            .unwrap_or_else(|| Value::Object(Default::default()));
        debug!(tool = %tool_name, args = %arguments, "Tool call arguments");

        let result = match self.tool_registry.execute(tool_name, arguments).await {
            Ok(output) => CallToolResult::from(output),
            Err(e) => {
                warn!(tool = %tool_name, error = %e, "Tool execution failed");
                CallToolResult::error(format!("Error: {}", e))
            }
        };
        to_value(result)
    }

    /// Route a method to its handler. Notifications yield `Value::Null`.
    pub async fn route(&mut self, method: &str, params: Value) -> Result<Value, McpError> {
        match method {
            "initialize" => {
                let params = parse_params::<InitializeParams>(method, params)?;
                self.handle_initialize(params)
            }
            "notifications/initialized" => {
                info!("Tool client initialized");
                Ok(Value::Null)
            }
            "ping" => Ok(Value::Object(Default::default())),
            "tools/list" => self.handle_tools_list(),
            "tools/call" => {
                let params = parse_params::<CallToolParams>(method, params)?;
                self.handle_tools_call(params).await
            }
            _ => Err(McpError::MethodNotFound {
                method: method.to_string(),
            }),
        }
    }
}

fn parse_params<T: DeserializeOwned>(method: &str, params: Value) -> Result<T, McpError> {
    serde_json::from_value(params).map_err(|e| McpError::InvalidParams {
        message: format!("Invalid {} params: {}", method, e),
    })
}

fn to_value<T: Serialize>(result: T) -> Result<Value, McpError> {
    serde_json::to_value(result).map_err(|e| McpError::InternalError {
        message: format!("Failed to serialize result: {}", e),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use prodassist_core::error::ToolError;
    use prodassist_core::types::ToolOutput;
    use prodassist_tools::registry::{Tool, query_argument, query_schema};
    use serde_json::json;

    struct UpperTool;

    #[async_trait]
    impl Tool for UpperTool {
        fn name(&self) -> &str {
            "upper"
        }
        fn description(&self) -> &str {
            "Upper-cases the query"
        }
        fn parameters_schema(&self) -> Value {
            query_schema("text")
        }
        async fn execute(&self, args: Value) -> Result<ToolOutput, ToolError> {
            let text = query_argument("upper", &args)?;
            Ok(ToolOutput::text(text.to_uppercase()))
        }
    }

    fn handler() -> RequestHandler {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(UpperTool)).unwrap();
        RequestHandler::new(Arc::new(registry))
    }

    async fn initialized() -> RequestHandler {
        let mut handler = handler();
        handler
            .route(
                "initialize",
                json!({
                    "protocolVersion": MCP_PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {"name": "test-client", "version": "1.0"}
                }),
            )
            .await
            .unwrap();
        handler
    }

    #[tokio::test]
    async fn test_initialize_advertises_tools() {
        let mut handler = handler();
        assert!(!handler.is_initialized());
        let result = handler
            .route(
                "initialize",
                json!({"protocolVersion": MCP_PROTOCOL_VERSION, "clientInfo": {"name": "c"}}),
            )
            .await
            .unwrap();
        assert!(handler.is_initialized());
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], "prodassist");
        assert!(result["capabilities"]["tools"].is_object());
    }

    #[tokio::test]
    async fn test_calls_before_initialize_are_refused() {
        let mut handler = handler();
        let err = handler.route("tools/list", Value::Null).await.unwrap_err();
        assert_eq!(err.error_code(), -32003);
        let err = handler
            .route(
                "tools/call",
                json!({"name": "upper", "arguments": {"query": "x"}}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), -32003);
        // Liveness checks work at any time.
        assert!(handler.route("ping", Value::Null).await.is_ok());
    }

    #[tokio::test]
    async fn test_tools_list() {
        let mut handler = initialized().await;
        let result = handler.route("tools/list", Value::Null).await.unwrap();
        assert_eq!(result["tools"][0]["name"], "upper");
        assert_eq!(result["tools"][0]["inputSchema"]["required"][0], "query");
    }

    #[tokio::test]
    async fn test_tools_call() {
        let mut handler = initialized().await;
        let result = handler
            .route(
                "tools/call",
                json!({"name": "upper", "arguments": {"query": "pixel"}}),
            )
            .await
            .unwrap();
        assert_eq!(result["content"][0]["text"], "PIXEL");
        assert!(result.get("isError").is_none());
    }

    #[tokio::test]
    async fn test_tool_failure_is_in_band() {
        let mut handler = initialized().await;
        let result = handler
            .route("tools/call", json!({"name": "upper", "arguments": {}}))
            .await
            .unwrap();
        assert_eq!(result["isError"], true);
        let text = result["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Error:"));
    }

    #[tokio::test]
    async fn test_unknown_tool_and_method() {
        let mut handler = initialized().await;
        let err = handler
            .route("tools/call", json!({"name": "nope"}))
            .await
            .unwrap_err();
        assert!(matches!(err, McpError::ToolUnavailable { .. }));

        let err = handler
            .route("resources/list", Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), -32601);

        let err = handler
            .route("tools/call", json!({"arguments": {}}))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), -32602);
    }
}
