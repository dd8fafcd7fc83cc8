//! Web search fallback: the `web_search` tool and its DuckDuckGo backend.
//!
//! - [`WebSearcher`]: the search backend seam.
//! - [`DuckDuckGoSearcher`]: DuckDuckGo instant answers (no API key required).
//! - [`WebSearchTool`]: formats results as numbered, wrapped blocks.

use crate::registry::{Tool, query_argument, query_schema};
use async_trait::async_trait;
use prodassist_core::config::WebConfig;
use prodassist_core::error::ToolError;
use prodassist_core::types::{NO_WEB_RESULTS, ToolOutput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Snippet column width in formatted results.
const SNIPPET_WIDTH: usize = 90;
const INDENT: &str = "   ";

/// A single web search hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

/// Backend that turns a query into search hits.
#[async_trait]
pub trait WebSearcher: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, ToolError>;
}

// ---------------------------------------------------------------------------
// DuckDuckGoSearcher
// ---------------------------------------------------------------------------

/// Search the web using the DuckDuckGo instant answers API.
pub struct DuckDuckGoSearcher {
    client: reqwest::Client,
    base_url: String,
    region: String,
}

impl DuckDuckGoSearcher {
    pub fn new(config: &WebConfig) -> Result<Self, ToolError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("prodassist/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ToolError::ExecutionFailed {
                name: "web_search".into(),
                message: format!("Failed to create HTTP client: {}", e),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            region: config.region.clone(),
        })
    }
}

#[async_trait]
impl WebSearcher for DuckDuckGoSearcher {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<WebResult>, ToolError> {
        let url = format!(
            "{}/?q={}&format=json&no_html=1&skip_disambig=1&kl={}",
            self.base_url,
            urlencoding::encode(query),
            urlencoding::encode(&self.region)
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                name: "web_search".into(),
                message: format!("Search request failed: {}", e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::ExecutionFailed {
                name: "web_search".into(),
                message: format!("Search returned HTTP {}", status),
            });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                name: "web_search".into(),
                message: format!("Failed to parse search response: {}", e),
            })?;

        let results = parse_instant_answer(&body, max_results);
        debug!(query, count = results.len(), "DuckDuckGo search complete");
        Ok(results)
    }
}

/// Extract up to `max_results` hits from an instant answer response: the
/// abstract first, then `Results`, then `RelatedTopics` (including grouped
/// topics).
pub fn parse_instant_answer(body: &serde_json::Value, max_results: usize) -> Vec<WebResult> {
    let mut results = Vec::new();

    if let Some(abstract_text) = str_field(body, "AbstractText")
        && !abstract_text.is_empty()
    {
        let heading = str_field(body, "Heading").unwrap_or("");
        let url = str_field(body, "AbstractURL").unwrap_or("");
        results.push(WebResult {
            title: heading.to_string(),
            link: url.to_string(),
            snippet: abstract_text.to_string(),
        });
    }

    let mut topics: Vec<&serde_json::Value> = Vec::new();
    if let Some(items) = body.get("Results").and_then(|v| v.as_array()) {
        topics.extend(items);
    }
    if let Some(items) = body.get("RelatedTopics").and_then(|v| v.as_array()) {
        for item in items {
            match item.get("Topics").and_then(|v| v.as_array()) {
                Some(group) => topics.extend(group),
                None => topics.push(item),
            }
        }
    }

    for topic in topics {
        if results.len() >= max_results {
            break;
        }
        let Some(text) = str_field(topic, "Text") else {
            continue;
        };
        let link = str_field(topic, "FirstURL").unwrap_or("");
        let (title, snippet) = match text.split_once(" - ") {
            Some((title, rest)) => (title, rest),
            None => (text, text),
        };
        results.push(WebResult {
            title: title.to_string(),
            link: link.to_string(),
            snippet: snippet.to_string(),
        });
    }

    results.truncate(max_results);
    results
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

/// Render at most `k` hits as numbered blocks separated by blank lines.
pub fn format_web_results(items: &[WebResult], k: usize) -> String {
    if items.is_empty() || k == 0 {
        return NO_WEB_RESULTS.to_string();
    }

    items
        .iter()
        .take(k)
        .enumerate()
        .map(|(i, item)| {
            let title = if item.title.trim().is_empty() {
                "(no title)"
            } else {
                item.title.trim()
            };
            let mut block = format!("{}. {}\n{}{}", i + 1, title, INDENT, item.link);
            let snippet = item.snippet.trim();
            if !snippet.is_empty() {
                // Only the first snippet line carries the indent.
                block.push('\n');
                block.push_str(INDENT);
                block.push_str(&textwrap::fill(snippet, SNIPPET_WIDTH));
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

// ---------------------------------------------------------------------------
// WebSearchTool
// ---------------------------------------------------------------------------

/// The `web_search` tool. Backend failures are reported in-band with the
/// error flag set so the caller still receives text.
pub struct WebSearchTool {
    searcher: Arc<dyn WebSearcher>,
    max_results: usize,
    timeout: Duration,
}

impl WebSearchTool {
    pub fn new(searcher: Arc<dyn WebSearcher>, config: &WebConfig) -> Self {
        Self {
            searcher,
            max_results: config.max_results,
            timeout: Duration::from_secs(config.timeout_secs.saturating_add(5)),
        }
    }
}

#[async_trait]
impl Tool for WebSearchTool {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for product information not available in the local catalog. \
         Returns numbered results with title, link, and snippet."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("The search query")
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = query_argument(self.name(), &args)?;

        match self.searcher.search(query, self.max_results).await {
            Ok(items) => {
                let text = format_web_results(&items, self.max_results);
                Ok(ToolOutput::text(text))
            }
            Err(e) => {
                warn!(error = %e, "Web search failed");
                Ok(ToolOutput::error(format!("Error during web search: {}", e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct CannedSearcher(Vec<WebResult>);

    #[async_trait]
    impl WebSearcher for CannedSearcher {
        async fn search(
            &self,
            _query: &str,
            max_results: usize,
        ) -> Result<Vec<WebResult>, ToolError> {
            Ok(self.0.iter().take(max_results).cloned().collect())
        }
    }

    struct DownSearcher;

    #[async_trait]
    impl WebSearcher for DownSearcher {
        async fn search(
            &self,
            _query: &str,
            _max_results: usize,
        ) -> Result<Vec<WebResult>, ToolError> {
            Err(ToolError::ExecutionFailed {
                name: "web_search".into(),
                message: "connection refused".into(),
            })
        }
    }

    fn hit(title: &str, link: &str, snippet: &str) -> WebResult {
        WebResult {
            title: title.into(),
            link: link.into(),
            snippet: snippet.into(),
        }
    }

    #[test]
    fn test_format_numbered_blocks() {
        let items = vec![
            hit("iPhone 17", "https://example.com/17", "Price is $799."),
            hit("", "https://example.com/x", "Another snippet."),
        ];
        assert_eq!(
            format_web_results(&items, 5),
            "1. iPhone 17\n   https://example.com/17\n   Price is $799.\n\n\
             2. (no title)\n   https://example.com/x\n   Another snippet."
        );
    }

    #[test]
    fn test_format_wraps_long_snippets() {
        let snippet = "word ".repeat(60);
        let text = format_web_results(&[hit("t", "l", &snippet)], 5);
        let snippet_lines: Vec<&str> = text.lines().skip(2).collect();
        assert!(snippet_lines.len() > 1);
        assert!(snippet_lines[0].starts_with(INDENT));
        assert!(snippet_lines[0].len() <= INDENT.len() + SNIPPET_WIDTH);
        for line in &snippet_lines[1..] {
            assert!(line.starts_with("word"));
            assert!(line.len() <= SNIPPET_WIDTH);
        }
    }

    #[test]
    fn test_format_respects_k_and_empty() {
        let items = vec![hit("a", "1", "x"), hit("b", "2", "y"), hit("c", "3", "z")];
        let text = format_web_results(&items, 2);
        assert!(text.contains("2. b"));
        assert!(!text.contains("3. c"));
        assert_eq!(format_web_results(&[], 5), NO_WEB_RESULTS);
    }

    #[test]
    fn test_parse_instant_answer() {
        let body = serde_json::json!({
            "Heading": "iPhone",
            "AbstractText": "The iPhone is a line of smartphones.",
            "AbstractURL": "https://en.wikipedia.org/wiki/IPhone",
            "Results": [],
            "RelatedTopics": [
                {"Text": "iPhone 15 - The 2023 model.", "FirstURL": "https://duckduckgo.com/iPhone_15"},
                {"Name": "Models", "Topics": [
                    {"Text": "iPhone 16 - The 2024 model.", "FirstURL": "https://duckduckgo.com/iPhone_16"}
                ]},
                {"Text": "iPhone 17 - The 2025 model.", "FirstURL": "https://duckduckgo.com/iPhone_17"}
            ]
        });

        let results = parse_instant_answer(&body, 3);
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "iPhone");
        assert_eq!(results[1].title, "iPhone 15");
        assert_eq!(results[1].link, "https://duckduckgo.com/iPhone_15");
        assert_eq!(results[1].snippet, "The 2023 model.");
        assert_eq!(results[2].title, "iPhone 16");
        assert!(parse_instant_answer(&serde_json::json!({}), 5).is_empty());
    }

    #[tokio::test]
    async fn test_tool_formats_results() {
        let searcher = Arc::new(CannedSearcher(vec![hit("A", "https://a", "alpha")]));
        let tool = WebSearchTool::new(searcher, &WebConfig::default());
        let output = tool
            .execute(serde_json::json!({"query": "a"}))
            .await
            .unwrap();
        assert!(!output.is_error());
        assert!(output.content.starts_with("1. A\n   https://a"));
    }

    #[tokio::test]
    async fn test_tool_reports_failure_in_band() {
        let tool = WebSearchTool::new(Arc::new(DownSearcher), &WebConfig::default());
        let output = tool
            .execute(serde_json::json!({"query": "a"}))
            .await
            .unwrap();
        assert!(output.is_error());
        assert!(output.content.starts_with("Error during web search:"));
        assert!(output.content.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_tool_empty_results() {
        let tool = WebSearchTool::new(Arc::new(CannedSearcher(vec![])), &WebConfig::default());
        let output = tool
            .execute(serde_json::json!({"query": "a"}))
            .await
            .unwrap();
        assert_eq!(output.content, NO_WEB_RESULTS);
    }
}
