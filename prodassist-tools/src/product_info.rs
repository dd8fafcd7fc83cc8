//! Local catalog lookup exposed as the `get_product_info` tool.

use crate::registry::{Tool, query_argument, query_schema};
use async_trait::async_trait;
use prodassist_core::error::ToolError;
use prodassist_core::retrieval::{ContextBlock, Retriever, filter_documents};
use prodassist_core::types::{NO_LOCAL_RESULTS, ToolOutput};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Searches the product catalog and returns matching listings as a context block.
///
/// Candidates from the retriever are narrowed with the keyword/number filter
/// before formatting, so a query for one model never returns its neighbours.
pub struct GetProductInfoTool {
    retriever: Arc<dyn Retriever>,
}

impl GetProductInfoTool {
    pub fn new(retriever: Arc<dyn Retriever>) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl Tool for GetProductInfoTool {
    fn name(&self) -> &str {
        "get_product_info"
    }

    fn description(&self) -> &str {
        "Look up products in the local catalog. Returns title, price, rating, and \
         customer reviews for products matching the query."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        query_schema("Product name, model, or question about a product")
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(20)
    }

    async fn execute(&self, args: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let query = query_argument(self.name(), &args)?;

        let docs = match self.retriever.retrieve(query).await {
            Ok(docs) => docs,
            Err(e) => {
                warn!(error = %e, "Product retrieval failed");
                let message = format!("Error retrieving product info {e}");
                return Ok(ToolOutput::error(message));
            }
        };

        let candidates = docs.len();
        let matched = filter_documents(query, docs);
        debug!(candidates, matched = matched.len(), "Filtered candidates");

        if matched.is_empty() {
            return Ok(ToolOutput::text(NO_LOCAL_RESULTS));
        }
        let block = ContextBlock::from_documents(&matched);
        Ok(ToolOutput::text(block.as_str()))
    }
}
