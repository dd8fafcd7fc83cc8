//! Configuration system for prodassist.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> CLI args.
//! Configuration is loaded from `~/.config/prodassist/config.toml` and/or
//! `.prodassist/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level configuration for the assistant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub llm: LlmConfig,
    pub retrieval: RetrievalConfig,
    pub graph: GraphConfig,
    pub evaluation: EvaluationConfig,
    pub web: WebConfig,
    pub server: ToolServerConfig,
}

/// LLM provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name: "openai" or "local".
    pub provider: String,
    /// Model identifier (e.g., "gpt-4o-mini").
    pub model: String,
    /// Environment variable name containing the API key.
    pub api_key_env: String,
    /// Optional base URL override for an OpenAI-compatible endpoint.
    pub base_url: Option<String>,
    /// Maximum tokens to generate in a response.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
    /// Per-request timeout.
    pub request_timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: None,
            max_tokens: 1024,
            temperature: 0.0,
            request_timeout_secs: 60,
        }
    }
}

impl LlmConfig {
    /// Validate this LLM config and return any warnings.
    ///
    /// Returns an empty Vec if the config is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.max_tokens == 0 {
            warnings.push("max_tokens is 0; every completion will be empty".into());
        }
        if self.temperature < 0.0 || self.temperature > 2.0 {
            warnings.push(format!(
                "temperature ({}) is outside the typical range 0.0-2.0",
                self.temperature
            ));
        }
        if self.request_timeout_secs == 0 {
            warnings.push("request_timeout_secs is 0; every request times out".into());
        }
        warnings
    }
}

/// Product index configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// JSON catalog of product records loaded into the in-memory index.
    pub catalog_path: Option<PathBuf>,
    /// Number of documents returned per query.
    pub top_k: usize,
    /// Minimum cosine similarity for a document to be returned.
    pub min_score: f32,
    /// Dimensionality of the hashed term embeddings.
    pub vector_dimensions: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            catalog_path: None,
            top_k: 3,
            min_score: 0.05,
            vector_dimensions: 256,
        }
    }
}

/// Orchestration graph configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// How many times the grader may send a query back for rewriting.
    /// At least one rewrite is always allowed.
    pub max_rewrites: usize,
    /// Case-insensitive keywords that make the assistant consult the retriever.
    pub tool_keywords: Vec<String>,
    /// Previous turns of a thread included in direct answers.
    pub history_turns: usize,
    /// Transcripts kept in memory per thread.
    pub checkpoint_limit: usize,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            max_rewrites: 2,
            tool_keywords: vec!["price".into(), "review".into(), "product".into()],
            history_turns: 4,
            checkpoint_limit: 50,
        }
    }
}

impl GraphConfig {
    /// Effective rewrite budget; never below one.
    pub fn rewrite_budget(&self) -> usize {
        self.max_rewrites.max(1)
    }

    /// Per-thread checkpoint cap; always holds the turns direct answers read.
    pub fn checkpoint_capacity(&self) -> usize {
        self.checkpoint_limit.max(self.history_turns).max(1)
    }
}

/// Answer scoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub enabled: bool,
    /// Append the score footer to rendered answers.
    pub show_footer: bool,
    /// Questions generated from the answer when measuring response relevancy.
    pub questions_per_answer: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            show_footer: true,
            questions_per_answer: 3,
        }
    }
}

/// Web search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    pub base_url: String,
    pub max_results: usize,
    pub region: String,
    pub timeout_secs: u64,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.duckduckgo.com".to_string(),
            max_results: 5,
            region: "wt-wt".to_string(),
            timeout_secs: 15,
        }
    }
}

/// How the client launches the tool server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolServerConfig {
    /// Server executable. `None` means the current executable with `serve`.
    pub command: Option<PathBuf>,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
}

/// Load configuration by merging defaults, config files, environment, and overrides.
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&AssistantConfig>,
) -> Result<AssistantConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(AssistantConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "prodassist", "prodassist") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".prodassist").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (PRODASSIST_LLM__MODEL, PRODASSIST_GRAPH__MAX_REWRITES, etc.)
    figment = figment.merge(Env::prefixed("PRODASSIST_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}

/// Directory for log files and other runtime data.
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("dev", "prodassist", "prodassist")
        .map(|dirs| dirs.data_dir().to_path_buf())
}
