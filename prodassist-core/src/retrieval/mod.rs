//! Product retrieval: documents, the retriever seam, filtering, and context
//! formatting.

pub mod context;
pub mod document;
pub mod filter;
pub mod index;

use crate::error::RetrievalError;
use async_trait::async_trait;

pub use context::{CONTEXT_DELIMITER, ContextBlock, NO_DOCUMENTS, format_document, format_documents};
pub use document::{Document, ProductRecord};
pub use filter::{filter_documents, numbers_match};
pub use index::InMemoryIndex;

/// Source of candidate product documents for a query.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError>;
}

/// A retriever that runs the keyword/number filter over another retriever.
pub struct FilteredRetriever<R> {
    inner: R,
}

impl<R: Retriever> FilteredRetriever<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<R: Retriever> Retriever for FilteredRetriever<R> {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        let docs = self.inner.retrieve(query).await?;
        Ok(filter_documents(query, docs))
    }
}

#[async_trait]
impl<T: Retriever + ?Sized> Retriever for std::sync::Arc<T> {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        (**self).retrieve(query).await
    }
}

/// Source of formatted context for the graph's retrieval step.
#[async_trait]
pub trait ContextSource: Send + Sync {
    async fn fetch_context(&self, query: &str) -> Result<ContextBlock, RetrievalError>;
}

/// Formats the documents of a retriever into a context block.
pub struct DocumentContext<R> {
    retriever: R,
}

impl<R: Retriever> DocumentContext<R> {
    pub fn new(retriever: R) -> Self {
        Self { retriever }
    }
}

#[async_trait]
impl<R: Retriever> ContextSource for DocumentContext<R> {
    async fn fetch_context(&self, query: &str) -> Result<ContextBlock, RetrievalError> {
        let docs = self.retriever.retrieve(query).await?;
        Ok(ContextBlock::from_documents(&docs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use document::TITLE_KEY;

    #[tokio::test]
    async fn test_filtered_retriever_drops_wrong_model() {
        let config = RetrievalConfig {
            min_score: 0.0,
            ..Default::default()
        };
        let docs = vec![
            Document::new("Nice.").with_meta(TITLE_KEY, "Apple iPhone 15"),
            Document::new("Nice.").with_meta(TITLE_KEY, "Apple iPhone 15 Pro"),
        ];
        let index = InMemoryIndex::from_config(&config).with_documents(docs);
        let filtered = FilteredRetriever::new(index);
        let missing = filtered.retrieve("iPhone 17 price").await.unwrap();
        assert!(missing.is_empty());
        let kept = filtered.retrieve("iPhone 15 price").await.unwrap();
        assert_eq!(kept.len(), 2);

        let context = DocumentContext::new(filtered);
        let block = context.fetch_context("iPhone 17 price").await.unwrap();
        assert_eq!(block.as_str(), NO_DOCUMENTS);
        let block = context.fetch_context("iPhone 15 price").await.unwrap();
        assert_eq!(block.split().len(), 2);
    }
}
