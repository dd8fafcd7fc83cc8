//! Brain module: LLM provider abstraction.
//!
//! Defines the `LlmProvider` trait for model-agnostic LLM interactions and a
//! scriptable `MockLlmProvider` used throughout the test suites.

use crate::error::LlmError;
use crate::types::{CompletionRequest, CompletionResponse, Message, TokenUsage};
use async_trait::async_trait;
use std::sync::Mutex;
use tracing::debug;

/// Trait for LLM providers.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Perform a full completion and return the response.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Return the model name.
    fn model_name(&self) -> &str;

    /// Send a single user prompt and return the reply text.
    async fn complete_text(&self, prompt: &str) -> Result<String, LlmError> {
        self.complete_messages(vec![Message::user(prompt)]).await
    }

    /// Send a message list and return the reply text.
    async fn complete_messages(&self, messages: Vec<Message>) -> Result<String, LlmError> {
        let request = CompletionRequest {
            messages,
            ..Default::default()
        };
        let response = self.complete(request).await?;
        debug!(
            model = %response.model,
            tokens = response.usage.total(),
            "LLM completion finished"
        );
        Ok(response.message.content)
    }
}

enum MockReply {
    Text(String),
    Fail(String),
}

struct MockRule {
    needle: String,
    reply: MockReply,
}

/// A mock LLM provider for testing.
///
/// Rules are checked first: the first rule whose needle occurs in the last
/// message answers. Otherwise queued responses are returned in order, then a
/// fixed default.
pub struct MockLlmProvider {
    model: String,
    rules: Mutex<Vec<MockRule>>,
    responses: Mutex<Vec<CompletionResponse>>,
    prompts: Mutex<Vec<String>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self {
            model: "mock-model".to_string(),
            rules: Mutex::new(Vec::new()),
            responses: Mutex::new(Vec::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Create a MockLlmProvider that always returns the given text.
    pub fn with_response(text: &str) -> Self {
        Self::new().with_rule("", text)
    }

    /// Reply with `text` whenever the prompt contains `needle`.
    pub fn with_rule(self, needle: &str, text: &str) -> Self {
        lock(&self.rules).push(MockRule {
            needle: needle.to_string(),
            reply: MockReply::Text(text.to_string()),
        });
        self
    }

    /// Fail with an API error whenever the prompt contains `needle`.
    pub fn with_failure(self, needle: &str, message: &str) -> Self {
        lock(&self.rules).push(MockRule {
            needle: needle.to_string(),
            reply: MockReply::Fail(message.to_string()),
        });
        self
    }

    /// Queue a response to be returned by the next unmatched `complete` call.
    pub fn queue_response(&self, response: CompletionResponse) {
        lock(&self.responses).push(response);
    }

    /// Create a simple text response for testing.
    pub fn text_response(text: &str) -> CompletionResponse {
        CompletionResponse {
            message: Message::assistant(text),
            usage: TokenUsage {
                input_tokens: 100,
                output_tokens: 50,
            },
            model: "mock-model".to_string(),
            finish_reason: Some("stop".to_string()),
        }
    }

    /// Every prompt seen so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Number of prompts containing `needle`.
    pub fn calls_containing(&self, needle: &str) -> usize {
        lock(&self.prompts)
            .iter()
            .filter(|p| p.contains(needle))
            .count()
    }
}

impl Default for MockLlmProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl LlmProvider for MockLlmProvider {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let prompt = request
            .messages
            .last()
            .map(|m| m.content.clone())
            .unwrap_or_default();
        lock(&self.prompts).push(prompt.clone());

        if let Some(rule) = lock(&self.rules)
            .iter()
            .find(|rule| prompt.contains(&rule.needle))
        {
            return match &rule.reply {
                MockReply::Text(text) => Ok(Self::text_response(text)),
                MockReply::Fail(message) => Err(LlmError::ApiRequest {
                    message: message.clone(),
                }),
            };
        }

        let mut responses = lock(&self.responses);
        if responses.is_empty() {
            Ok(Self::text_response("I'm a mock LLM with nothing queued."))
        } else {
            Ok(responses.remove(0))
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
