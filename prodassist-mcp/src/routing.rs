//! Local-first retrieval with a single web fallback.
//!
//! The local catalog answers when it returned listings and those listings
//! mention every model number of the query. Anything else (no listings, a
//! failed lookup, or listings for a different model) goes to the web once.

use crate::session::ToolLookup;
use async_trait::async_trait;
use prodassist_core::error::RetrievalError;
use prodassist_core::retrieval::{ContextBlock, ContextSource, numbers_match};
use prodassist_core::types::{Lookup, NO_WEB_RESULTS};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub const PRODUCT_TOOL: &str = "get_product_info";
pub const WEB_TOOL: &str = "web_search";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    Local,
    Web,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Local => write!(f, "local"),
            Source::Web => write!(f, "web"),
        }
    }
}

/// Outcome of routing one query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutedAnswer {
    pub source: Source,
    /// Text from the source that answered.
    pub text: String,
    /// What the local catalog returned, kept even when the web answered.
    pub local: Lookup,
    /// The web lookup, when one was made.
    pub web: Option<Lookup>,
}

/// Whether a local lookup may answer `query` without going to the web.
pub fn accepts_local(query: &str, local: &Lookup) -> bool {
    match local.found() {
        Some(text) => numbers_match(query, text),
        None => false,
    }
}

/// Ask the catalog first and fall back to web search at most once.
pub async fn route_query(tools: &dyn ToolLookup, query: &str) -> RoutedAnswer {
    let local = tools.lookup(PRODUCT_TOOL, query).await;

    if accepts_local(query, &local)
        && let Lookup::Found(text) = &local
    {
        info!(source = %Source::Local, "Answered from catalog");
        return RoutedAnswer {
            source: Source::Local,
            text: text.clone(),
            local,
            web: None,
        };
    }

    debug!(local = ?local, "Catalog result rejected, searching the web");
    let web = tools.lookup(WEB_TOOL, query).await;
    let text = match &web {
        Lookup::Found(text) | Lookup::Failed(text) => text.clone(),
        Lookup::Empty => NO_WEB_RESULTS.to_string(),
    };
    info!(source = %Source::Web, found = web.is_found(), "Answered from web search");

    RoutedAnswer {
        source: Source::Web,
        text,
        local,
        web: Some(web),
    }
}

/// Feeds routed tool results into the retrieval graph.
///
/// A web failure surfaces as a retrieval error; an empty web result becomes
/// the empty context block.
pub struct RoutedContext {
    tools: Arc<dyn ToolLookup>,
}

impl RoutedContext {
    pub fn new(tools: Arc<dyn ToolLookup>) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl ContextSource for RoutedContext {
    async fn fetch_context(&self, query: &str) -> Result<ContextBlock, RetrievalError> {
        let routed = route_query(self.tools.as_ref(), query).await;
        match (routed.source, routed.web) {
            (Source::Local, _) | (Source::Web, Some(Lookup::Found(_))) => {
                Ok(ContextBlock::from_text(routed.text))
            }
            (Source::Web, Some(Lookup::Failed(message))) => {
                Err(RetrievalError::Backend { message })
            }
            (Source::Web, _) => Ok(ContextBlock::empty()),
        }
    }
}
