//! LLM provider implementations.
//!
//! Provides an OpenAI-compatible implementation of the `LlmProvider` trait
//! covering OpenAI itself and local servers that speak the same chat
//! completions format (Ollama, vLLM, LM Studio).
//!
//! Use `create_provider()` to instantiate the provider named in config.

pub mod openai_compat;

use crate::brain::LlmProvider;
use crate::config::LlmConfig;
use crate::error::LlmError;
use std::sync::Arc;

pub use openai_compat::OpenAiCompatibleProvider;

/// Default endpoint for `provider = "local"` when no base URL is configured.
const LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

/// Create the provider described by `config`.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCompatibleProvider::new(config)?)),
        "local" | "ollama" => {
            let config = LlmConfig {
                base_url: Some(
                    config
                        .base_url
                        .clone()
                        .unwrap_or_else(|| LOCAL_BASE_URL.to_string()),
                ),
                ..config.clone()
            };
            Ok(Arc::new(OpenAiCompatibleProvider::new(&config)?))
        }
        other => Err(LlmError::ApiRequest {
            message: format!("Unknown LLM provider '{other}' (expected openai or local)"),
        }),
    }
}
