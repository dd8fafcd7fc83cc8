//! # prodassist Tools
//!
//! Tool implementations served by the prodassist tool server.
//! Provides the local catalog lookup and the web search fallback.

pub mod product_info;
pub mod registry;
pub mod web;

use prodassist_core::config::WebConfig;
use prodassist_core::error::ToolError;
use prodassist_core::retrieval::Retriever;
use registry::{Tool, ToolRegistry};
use std::sync::Arc;

pub use product_info::GetProductInfoTool;
pub use web::{DuckDuckGoSearcher, WebResult, WebSearchTool, WebSearcher, format_web_results};

/// Register `get_product_info` and `web_search` with the given backends.
pub fn register_product_tools(
    registry: &mut ToolRegistry,
    retriever: Arc<dyn Retriever>,
    searcher: Arc<dyn WebSearcher>,
    config: &WebConfig,
) -> Result<(), ToolError> {
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(GetProductInfoTool::new(retriever)),
        Arc::new(WebSearchTool::new(searcher, config)),
    ];

    for tool in tools {
        registry.register(tool)?;
    }
    Ok(())
}
