//! Error types for the prodassist core.
//!
//! Uses `thiserror` for public API error types with structured error variants
//! covering LLM, retrieval, tool execution, scoring, graph, and configuration
//! domains.

use std::path::PathBuf;

/// Top-level error type for the prodassist core library.
#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] EvaluationError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from LLM provider interactions.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("API request failed: {message}")]
    ApiRequest { message: String },

    #[error("API response parse error: {message}")]
    ResponseParse { message: String },

    #[error("Authentication failed for provider {provider}")]
    AuthFailed { provider: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Provider connection failed: {message}")]
    Connection { message: String },

    #[error("Prompt template error: {message}")]
    Template { message: String },
}

/// Errors from the product retriever and its index.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Catalog not found: {path}")]
    CatalogNotFound { path: PathBuf },

    #[error("Catalog parse error: {message}")]
    CatalogParse { message: String },

    #[error("Embedding failed: {message}")]
    Embedding { message: String },

    #[error("Retriever backend unavailable: {message}")]
    Backend { message: String },
}

/// Errors from tool registration and execution.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Tool not found: {name}")]
    NotFound { name: String },

    #[error("Tool already registered: {name}")]
    AlreadyRegistered { name: String },

    #[error("Invalid arguments for tool '{name}': {reason}")]
    InvalidArguments { name: String, reason: String },

    #[error("Tool '{name}' execution failed: {message}")]
    ExecutionFailed { name: String, message: String },

    #[error("Tool '{name}' timed out after {timeout_secs}s")]
    Timeout { name: String, timeout_secs: u64 },
}

/// Errors from answer scoring. These never reach the caller of a workflow;
/// they are logged and the unscored answer is returned.
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    #[error("No contexts to score against")]
    NoContexts,

    #[error("Judge returned an unusable verdict: {message}")]
    BadVerdict { message: String },

    #[error("Scoring LLM call failed: {0}")]
    Llm(#[from] LlmError),
}

/// Errors from the orchestration graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("No transition from {node} on {outcome}")]
    MissingTransition { node: String, outcome: String },

    #[error("Step limit ({max}) reached without reaching the end state")]
    StepLimitReached { max: usize },

    #[error("Node {node} expected a {expected} signal but found none")]
    MissingSignal { node: String, expected: String },
}

/// Errors from the configuration system.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Environment variable not set: {var}")]
    EnvVarMissing { var: String },

    #[error("Configuration parse error: {message}")]
    ParseError { message: String },
}

/// A type alias for results using the top-level `AssistantError`.
pub type Result<T> = std::result::Result<T, AssistantError>;
