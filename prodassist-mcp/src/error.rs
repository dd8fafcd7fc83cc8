//! Tool protocol error types.

/// Errors raised by the tool server, the client, or the transport between them.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("JSON-RPC parse error: {message}")]
    ParseError { message: String },

    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Invalid parameters: {message}")]
    InvalidParams { message: String },

    #[error("Internal error: {message}")]
    InternalError { message: String },

    #[error("Tool execution failed: {message}")]
    ToolError { message: String },

    #[error("Tool not offered by server: {name}")]
    ToolUnavailable { name: String },

    #[error("Transport error: {message}")]
    TransportError { message: String },

    #[error("Server not initialized")]
    NotInitialized,

    /// An error object returned by the remote side.
    #[error("Server error {code}: {message}")]
    Remote { code: i64, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Convert to a JSON-RPC error code.
    pub fn error_code(&self) -> i64 {
        match self {
            McpError::ParseError { .. } | McpError::Json(_) => -32700,
            McpError::InvalidRequest { .. } => -32600,
            McpError::MethodNotFound { .. } => -32601,
            McpError::InvalidParams { .. } => -32602,
            McpError::InternalError { .. } | McpError::Io(_) => -32603,
            McpError::ToolError { .. } => -32000,
            McpError::ToolUnavailable { .. } => -32001,
            McpError::TransportError { .. } => -32002,
            McpError::NotInitialized => -32003,
            McpError::Remote { code, .. } => *code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let cases = [
            (
                McpError::ParseError {
                    message: "bad json".into(),
                },
                -32700,
            ),
            (
                McpError::MethodNotFound {
                    method: "unknown".into(),
                },
                -32601,
            ),
            (
                McpError::InvalidParams {
                    message: "bad params".into(),
                },
                -32602,
            ),
            (
                McpError::ToolError {
                    message: "fail".into(),
                },
                -32000,
            ),
            (
                McpError::ToolUnavailable {
                    name: "web_search".into(),
                },
                -32001,
            ),
            (McpError::NotInitialized, -32003),
            (
                McpError::Remote {
                    code: -32601,
                    message: "nope".into(),
                },
                -32601,
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.error_code(), code, "{err}");
        }
    }

    #[test]
    fn test_error_display() {
        let err = McpError::MethodNotFound {
            method: "tools/execute".into(),
        };
        assert_eq!(err.to_string(), "Method not found: tools/execute");
        let err = McpError::Remote {
            code: -32003,
            message: "Server not initialized".into(),
        };
        assert_eq!(
            err.to_string(),
            "Server error -32003: Server not initialized"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broken");
        let mcp_err: McpError = io_err.into();
        assert!(matches!(mcp_err, McpError::Io(_)));
        assert_eq!(mcp_err.error_code(), -32603);
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let mcp_err: McpError = json_err.into();
        assert_eq!(mcp_err.error_code(), -32700);
    }
}
