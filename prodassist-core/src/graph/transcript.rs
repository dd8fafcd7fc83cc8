//! Append-only record of one question's trip through the graph.

use super::Node;
use crate::retrieval::ContextBlock;
use crate::types::ScorePair;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What a node produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Signal {
    /// The assistant asked for retrieval on this query.
    ToolRequest { query: String },
    /// The assistant answered without retrieval.
    DirectAnswer { text: String },
    /// Retrieved and formatted context.
    Context { block: ContextBlock },
    /// The grader's judgement of the latest context.
    Verdict {
        relevant: bool,
        budget_exhausted: bool,
    },
    /// The generator's answer and, when scoring succeeded, its scores.
    Answer {
        text: String,
        scores: Option<ScorePair>,
    },
    /// A reformulated query for the next retrieval round.
    RewrittenQuery { query: String },
}

/// One step of the transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub node: Node,
    pub signal: Signal,
    pub at: DateTime<Utc>,
}

/// Ordered, append-only transcript.
///
/// `append` consumes the transcript and hands back the extended one, so each
/// node receives the record by value and no earlier entry is ever altered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    question: String,
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn append(mut self, node: Node, signal: Signal) -> Self {
        self.entries.push(Entry {
            node,
            signal,
            at: Utc::now(),
        });
        self
    }

    /// The question as the user asked it.
    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&Entry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The query retrieval should use: the latest rewrite, else the question.
    pub fn current_query(&self) -> &str {
        self.entries
            .iter()
            .rev()
            .find_map(|e| match &e.signal {
                Signal::RewrittenQuery { query } => Some(query.as_str()),
                _ => None,
            })
            .unwrap_or(&self.question)
    }

    /// The most recently retrieved context.
    pub fn latest_context(&self) -> Option<&ContextBlock> {
        self.entries.iter().rev().find_map(|e| match &e.signal {
            Signal::Context { block } => Some(block),
            _ => None,
        })
    }

    pub fn rewrite_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.signal, Signal::RewrittenQuery { .. }))
            .count()
    }

    /// Whether the grader let an irrelevant context through.
    pub fn budget_exhausted(&self) -> bool {
        self.entries.iter().any(|e| match e.signal {
            Signal::Verdict {
                budget_exhausted, ..
            } => budget_exhausted,
            _ => false,
        })
    }

    /// Visited nodes in order.
    pub fn path(&self) -> Vec<Node> {
        self.entries.iter().map(|e| e.node).collect()
    }

    /// The final answer text, if the run finished with one.
    pub fn final_answer(&self) -> Option<&str> {
        match self.last().map(|e| &e.signal) {
            Some(Signal::DirectAnswer { text }) | Some(Signal::Answer { text, .. }) => {
                Some(text.as_str())
            }
            _ => None,
        }
    }
}
