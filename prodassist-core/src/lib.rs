//! # prodassist Core
//!
//! Core library for the product question-answering assistant.
//! Provides the LLM interface (brain), product retrieval and filtering,
//! answer scoring, the agentic retrieval graph, the linear pipeline,
//! configuration, and fundamental types.

pub mod brain;
pub mod config;
pub mod embeddings;
pub mod error;
pub mod evaluation;
pub mod graph;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod retrieval;
pub mod types;

// Re-export commonly used types at the crate root.
pub use brain::{LlmProvider, MockLlmProvider};
pub use config::{AssistantConfig, load_config};
pub use error::{AssistantError, Result};
pub use evaluation::{Evaluator, LlmEvaluator};
pub use graph::{AgenticRag, MemoryCheckpointer};
pub use pipeline::LinearPipeline;
pub use prompts::PromptLibrary;
pub use types::{
    AssistantReply, CompletionRequest, CompletionResponse, Lookup, Message, Role, Route,
    ScorePair, TokenUsage, ToolDefinition, ToolOutput,
};
