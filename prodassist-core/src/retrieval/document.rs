//! Product documents and catalog records.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const TITLE_KEY: &str = "product_title";
pub const PRICE_KEY: &str = "price";
pub const RATING_KEY: &str = "rating";

/// A retrieved unit of product knowledge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub page_content: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Document {
    pub fn new(page_content: impl Into<String>) -> Self {
        Self {
            page_content: page_content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_meta(mut self, key: &str, value: impl Into<String>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    /// The product title, or `""` when absent.
    pub fn title(&self) -> &str {
        self.meta(TITLE_KEY).unwrap_or("")
    }

    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }
}

/// One row of the product catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default)]
    pub product_id: Option<String>,
    pub product_title: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub price: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub rating: Option<String>,
    /// Review text; becomes the document body.
    #[serde(default, alias = "summary")]
    pub reviews: String,
}

impl From<ProductRecord> for Document {
    fn from(record: ProductRecord) -> Self {
        let mut doc = Document::new(record.reviews).with_meta(TITLE_KEY, record.product_title);
        if let Some(price) = record.price {
            doc = doc.with_meta(PRICE_KEY, price);
        }
        if let Some(rating) = record.rating {
            doc = doc.with_meta(RATING_KEY, rating);
        }
        if let Some(id) = record.product_id {
            doc = doc.with_meta("product_id", id);
        }
        doc
    }
}

/// Catalogs carry prices and ratings either as strings ("$799") or numbers (4.5).
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}
