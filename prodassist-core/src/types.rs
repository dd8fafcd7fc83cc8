//! Core type definitions for prodassist.
//!
//! Defines the data structures shared across the workspace: chat messages,
//! tool descriptions and outputs, typed tool outcomes, answer scores, and the
//! unified reply returned by both workflow variants.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Text returned by product lookup when nothing matched.
pub const NO_LOCAL_RESULTS: &str = "No local results found.";

/// Text returned by web search when the engine produced no items.
pub const NO_WEB_RESULTS: &str = "No web results.";

/// Represents a participant role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// A single chat message sent to or received from an LLM.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message with auto-generated ID and current timestamp.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, text)
    }
}

/// A definition describing a tool to a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Output produced by a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    pub content: String,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl ToolOutput {
    /// Create a simple text output.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Create an error output. The text is still delivered to the caller,
    /// flagged so it can be told apart from a real result.
    pub fn error(message: impl Into<String>) -> Self {
        let mut output = Self::text(message);
        output
            .metadata
            .insert("is_error".into(), serde_json::Value::Bool(true));
        output
    }

    pub fn is_error(&self) -> bool {
        self.metadata
            .get("is_error")
            .and_then(|v| v.as_bool())
            .unwrap_or(false)
    }
}

/// Typed outcome of a product or web lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Lookup {
    /// Usable text came back.
    Found(String),
    /// The source ran but had nothing for this query.
    Empty,
    /// The source failed; carries the error description.
    Failed(String),
}

impl Lookup {
    /// Classify raw tool text into a typed outcome.
    ///
    /// Error-flagged results and text starting with `Error` are failures;
    /// blank text and the two "no results" sentinels are empty.
    pub fn classify(text: &str, is_error: bool) -> Self {
        let trimmed = text.trim();
        if is_error || trimmed.starts_with("Error") {
            Lookup::Failed(trimmed.to_string())
        } else if trimmed.is_empty() || trimmed == NO_LOCAL_RESULTS || trimmed == NO_WEB_RESULTS
        {
            Lookup::Empty
        } else {
            Lookup::Found(text.to_string())
        }
    }

    pub fn found(&self) -> Option<&str> {
        match self {
            Lookup::Found(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Lookup::Found(_))
    }
}

/// Answer quality scores, each clamped to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScorePair {
    pub context_precision: f64,
    pub response_relevancy: f64,
}

impl ScorePair {
    pub fn new(context_precision: f64, response_relevancy: f64) -> Self {
        Self {
            context_precision: clamp_unit(context_precision),
            response_relevancy: clamp_unit(response_relevancy),
        }
    }

    /// The footer line appended to scored answers.
    pub fn footer(&self) -> String {
        format!(
            "[Eval] Context Precision: {:.2} | Response Relevancy: {:.2}",
            self.context_precision, self.response_relevancy
        )
    }
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// How a reply was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Answered by the LLM without retrieval.
    Direct,
    /// Generated from context the grader accepted.
    Retrieved,
    /// Generated from the last context after the rewrite budget ran out.
    RewriteBudgetExhausted,
    /// Produced by the linear pipeline.
    Pipeline,
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Route::Direct => write!(f, "direct"),
            Route::Retrieved => write!(f, "retrieved"),
            Route::RewriteBudgetExhausted => write!(f, "rewrite-budget-exhausted"),
            Route::Pipeline => write!(f, "pipeline"),
        }
    }
}

/// The result of running a question through either workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantReply {
    pub thread_id: Option<String>,
    pub question: String,
    pub answer: String,
    pub scores: Option<ScorePair>,
    pub route: Route,
    pub rewrites: usize,
}

impl AssistantReply {
    /// Render the answer for display, optionally with the score footer.
    pub fn render(&self, with_footer: bool) -> String {
        match (&self.scores, with_footer) {
            (Some(scores), true) => format!("{}\n\n---\n{}", self.answer, scores.footer()),
            _ => self.answer.clone(),
        }
    }
}

/// Token usage statistics from an LLM call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}

/// The result of an LLM completion request.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub message: Message,
    pub usage: TokenUsage,
    pub model: String,
    pub finish_reason: Option<String>,
}

/// A request to the LLM for completion.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    pub model: Option<String>,
}

impl Default for CompletionRequest {
    fn default() -> Self {
        Self {
            messages: Vec::new(),
            temperature: 0.0,
            max_tokens: None,
            model: None,
        }
    }
}
