//! Context assembly for generation and scoring.
//!
//! Documents are rendered as `Title/Price/Rating/Reviews` sections joined by a
//! fixed delimiter. Splitting a block on that delimiter recovers exactly the
//! per-document sections, so scorers see the same contexts the generator saw.

use super::document::{Document, PRICE_KEY, RATING_KEY, TITLE_KEY};
use serde::{Deserialize, Serialize};

/// Separator placed between formatted documents.
pub const CONTEXT_DELIMITER: &str = "\n\n---\n\n";

/// Text used as context when retrieval produced nothing.
pub const NO_DOCUMENTS: &str = "No relevant documents found.";

/// A bare `---` line inside a document would read as a delimiter.
const RULE_LINE: &str = "---";
const ESCAPED_RULE_LINE: &str = "- - -";

/// Formatted retrieval context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextBlock {
    text: String,
}

impl ContextBlock {
    /// Format documents into a block; an empty slice yields the
    /// "no documents" sentinel.
    pub fn from_documents(docs: &[Document]) -> Self {
        if docs.is_empty() {
            return Self::empty();
        }
        Self::from_sections(docs.iter().map(format_document).collect())
    }

    /// Join already formatted sections.
    pub fn from_sections(sections: Vec<String>) -> Self {
        Self {
            text: sections.join(CONTEXT_DELIMITER),
        }
    }

    /// Wrap raw text received from elsewhere, e.g. a tool server.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn empty() -> Self {
        Self {
            text: NO_DOCUMENTS.to_string(),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text == NO_DOCUMENTS || self.text.trim().is_empty()
    }

    /// Whether the text looks like formatted product context that can be
    /// split into individual contexts for scoring.
    pub fn is_recognizable(&self) -> bool {
        !self.is_empty()
            && (self.text.contains(CONTEXT_DELIMITER)
                || self.text.contains("Title:")
                || self.text.contains("Reviews:"))
    }

    /// The individual document sections.
    pub fn split(&self) -> Vec<String> {
        if self.is_empty() {
            return Vec::new();
        }
        self.text
            .split(CONTEXT_DELIMITER)
            .map(str::to_string)
            .collect()
    }
}

impl std::fmt::Display for ContextBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Render one document as a context section.
pub fn format_document(doc: &Document) -> String {
    let field = |key: &str| {
        doc.meta(key)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or("N/A")
            .to_string()
    };
    let section = format!(
        "Title: {}\nPrice: {}\nRating: {}\nReviews:\n{}",
        field(TITLE_KEY),
        field(PRICE_KEY),
        field(RATING_KEY),
        doc.page_content.trim()
    );
    escape_rules(&section)
}

/// Format each document separately, in retrieval order.
pub fn format_documents(docs: &[Document]) -> Vec<String> {
    docs.iter().map(format_document).collect()
}

fn escape_rules(section: &str) -> String {
    if !section.lines().any(|l| l.trim() == RULE_LINE) {
        return section.to_string();
    }
    section
        .split('\n')
        .map(|line| {
            if line.trim() == RULE_LINE {
                ESCAPED_RULE_LINE
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
