//! States, outcomes, and the transition table of the question-answering graph.

use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A processing state of the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Assistant,
    Retriever,
    Grader,
    Generator,
    Rewriter,
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Node::Assistant => write!(f, "assistant"),
            Node::Retriever => write!(f, "retriever"),
            Node::Grader => write!(f, "grader"),
            Node::Generator => write!(f, "generator"),
            Node::Rewriter => write!(f, "rewriter"),
        }
    }
}

/// What a node reports after running; the router's only input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    ToolRequested,
    Answered,
    Retrieved,
    Relevant,
    NotRelevant,
    RewriteBudgetExhausted,
    Generated,
    Rewritten,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Outcome::ToolRequested => "tool_requested",
            Outcome::Answered => "answered",
            Outcome::Retrieved => "retrieved",
            Outcome::Relevant => "relevant",
            Outcome::NotRelevant => "not_relevant",
            Outcome::RewriteBudgetExhausted => "rewrite_budget_exhausted",
            Outcome::Generated => "generated",
            Outcome::Rewritten => "rewritten",
        };
        f.write_str(name)
    }
}

/// Where the router sends control next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Next {
    Node(Node),
    End,
}

/// `(state, outcome) -> next` routing.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    routes: HashMap<(Node, Outcome), Next>,
}

impl TransitionTable {
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// The assistant → retrieve → grade → generate/rewrite graph.
    pub fn standard() -> Self {
        use Next::End;
        use Node::{Assistant, Generator, Grader, Retriever, Rewriter};
        use Outcome::*;

        Self::empty()
            .with(Assistant, ToolRequested, Next::Node(Retriever))
            .with(Assistant, Answered, End)
            .with(Retriever, Retrieved, Next::Node(Grader))
            .with(Grader, Relevant, Next::Node(Generator))
            .with(Grader, NotRelevant, Next::Node(Rewriter))
            .with(Grader, RewriteBudgetExhausted, Next::Node(Generator))
            .with(Generator, Generated, End)
            .with(Rewriter, Rewritten, Next::Node(Assistant))
    }

    pub fn with(mut self, from: Node, outcome: Outcome, to: Next) -> Self {
        self.routes.insert((from, outcome), to);
        self
    }

    pub fn next(&self, from: Node, outcome: Outcome) -> Result<Next, GraphError> {
        self.routes
            .get(&(from, outcome))
            .copied()
            .ok_or_else(|| GraphError::MissingTransition {
                node: from.to_string(),
                outcome: outcome.to_string(),
            })
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Default for TransitionTable {
    fn default() -> Self {
        Self::standard()
    }
}
