//! In-memory vector index over a product catalog.

use super::Retriever;
use super::document::{Document, ProductRecord};
use crate::config::RetrievalConfig;
use crate::embeddings::{Embedder, LocalEmbedder, cosine_similarity};
use crate::error::RetrievalError;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

struct IndexedDocument {
    document: Document,
    vector: Vec<f32>,
}

/// Similarity search over documents held in memory.
///
/// Each document is embedded from its title followed by its body. Built once,
/// read-only afterwards.
pub struct InMemoryIndex {
    embedder: Arc<dyn Embedder>,
    entries: Vec<IndexedDocument>,
    top_k: usize,
    min_score: f32,
}

impl InMemoryIndex {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize, min_score: f32) -> Self {
        Self {
            embedder,
            entries: Vec::new(),
            top_k: top_k.max(1),
            min_score,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::new(
            Arc::new(LocalEmbedder::new(config.vector_dimensions)),
            config.top_k,
            config.min_score,
        )
    }

    /// Build an index from the catalog named in `config`, or an empty index
    /// when no catalog is configured.
    pub fn load(config: &RetrievalConfig) -> Result<Self, RetrievalError> {
        let mut index = Self::from_config(config);
        if let Some(path) = &config.catalog_path {
            let records = load_catalog(path)?;
            index.extend(records.into_iter().map(Document::from));
            info!(path = %path.display(), documents = index.len(), "Product catalog indexed");
        }
        Ok(index)
    }

    pub fn with_documents(mut self, docs: impl IntoIterator<Item = Document>) -> Self {
        self.extend(docs);
        self
    }

    pub fn extend(&mut self, docs: impl IntoIterator<Item = Document>) {
        for document in docs {
            let vector = self.embedder.embed(&embedding_text(&document));
            self.entries.push(IndexedDocument { document, vector });
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k documents by cosine similarity, best first.
    pub fn search(&self, query: &str) -> Vec<(f32, &Document)> {
        let query_vec = self.embedder.embed(query);
        let mut scored: Vec<(f32, &Document)> = self
            .entries
            .iter()
            .map(|e| (cosine_similarity(&query_vec, &e.vector), &e.document))
            .filter(|(score, _)| *score >= self.min_score)
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));
        scored.truncate(self.top_k);
        scored
    }
}

fn embedding_text(doc: &Document) -> String {
    format!("{}\n{}", doc.title(), doc.page_content)
}

#[async_trait]
impl Retriever for InMemoryIndex {
    async fn retrieve(&self, query: &str) -> Result<Vec<Document>, RetrievalError> {
        let hits = self.search(query);
        debug!(query = %query, hits = hits.len(), "Index search");
        Ok(hits.into_iter().map(|(_, doc)| doc.clone()).collect())
    }
}

/// Read a JSON array of product records.
pub fn load_catalog(path: &Path) -> Result<Vec<ProductRecord>, RetrievalError> {
    if !path.exists() {
        return Err(RetrievalError::CatalogNotFound {
            path: path.to_path_buf(),
        });
    }
    let raw = std::fs::read_to_string(path).map_err(|e| RetrievalError::CatalogParse {
        message: format!("{}: {e}", path.display()),
    })?;
    serde_json::from_str(&raw).map_err(|e| RetrievalError::CatalogParse {
        message: format!("{}: {e}", path.display()),
    })
}
