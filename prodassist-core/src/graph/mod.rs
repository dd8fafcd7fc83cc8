//! Agentic retrieval graph.
//!
//! A question enters at the assistant, which either answers directly or asks
//! for retrieval. Retrieved context is graded; relevant context goes to the
//! generator, irrelevant context sends a rewritten query back around the loop
//! until the rewrite budget is spent, at which point the generator answers
//! from the last context it has.
//!
//! Each node takes the transcript by value, appends exactly one entry, and
//! reports an [`Outcome`]. Routing is a table lookup on `(node, outcome)`.

pub mod checkpoint;
pub mod fsm;
pub mod transcript;

pub use checkpoint::{Checkpointer, MemoryCheckpointer};
pub use fsm::{Next, Node, Outcome, TransitionTable};
pub use transcript::{Entry, Signal, Transcript};

use crate::brain::LlmProvider;
use crate::config::GraphConfig;
use crate::error::{AssistantError, GraphError, Result};
use crate::evaluation::{Evaluator, score_answer};
use crate::prompts::{HistoryTurn, PromptLibrary};
use crate::retrieval::{ContextBlock, ContextSource};
use crate::types::{AssistantReply, Route};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Steps a single rewrite round can take: assistant, retriever, grader, rewriter.
const STEPS_PER_ROUND: usize = 4;

/// The question-answering graph with its injected collaborators.
pub struct AgenticRag {
    llm: Arc<dyn LlmProvider>,
    context: Arc<dyn ContextSource>,
    evaluator: Option<Arc<dyn Evaluator>>,
    checkpointer: Arc<dyn Checkpointer>,
    prompts: Arc<PromptLibrary>,
    transitions: TransitionTable,
    config: GraphConfig,
}

impl AgenticRag {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        context: Arc<dyn ContextSource>,
        prompts: Arc<PromptLibrary>,
        config: GraphConfig,
    ) -> Self {
        if config.max_rewrites == 0 {
            warn!("graph.max_rewrites is 0; allowing one rewrite");
        }
        let checkpoints = MemoryCheckpointer::with_limit(config.checkpoint_capacity());
        Self {
            llm,
            context,
            evaluator: None,
            checkpointer: Arc::new(checkpoints),
            prompts,
            transitions: TransitionTable::standard(),
            config,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub fn with_checkpointer(mut self, checkpointer: Arc<dyn Checkpointer>) -> Self {
        self.checkpointer = checkpointer;
        self
    }

    pub fn with_transitions(mut self, transitions: TransitionTable) -> Self {
        self.transitions = transitions;
        self
    }

    pub fn checkpointer(&self) -> &Arc<dyn Checkpointer> {
        &self.checkpointer
    }

    /// Upper bound on node executions for one question.
    fn step_limit(&self) -> usize {
        (self.config.rewrite_budget() + 1) * STEPS_PER_ROUND + 2
    }

    /// Answer a question, recording the run under `thread_id`.
    pub async fn run(&self, question: &str, thread_id: Option<&str>) -> Result<AssistantReply> {
        let thread_id = thread_id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        info!(thread = %thread_id, question = %question, "Graph run started");

        let transcript = self.execute(question, &thread_id).await?;
        let reply = build_reply(&transcript, &thread_id)?;
        self.checkpointer.save(&thread_id, transcript);

        info!(
            thread = %thread_id,
            route = %reply.route,
            rewrites = reply.rewrites,
            scored = reply.scores.is_some(),
            "Graph run finished"
        );
        Ok(reply)
    }

    /// Drive the state machine to the end state and return the transcript.
    pub async fn execute(&self, question: &str, thread_id: &str) -> Result<Transcript> {
        let mut transcript = Transcript::new(question);
        let mut node = Node::Assistant;
        let limit = self.step_limit();

        for _ in 0..limit {
            let (outcome, next_transcript) = self.step(node, transcript, thread_id).await?;
            transcript = next_transcript;
            let next = self.transitions.next(node, outcome)?;
            debug!(node = %node, outcome = %outcome, ?next, "Graph transition");
            match next {
                Next::Node(n) => node = n,
                Next::End => return Ok(transcript),
            }
        }

        Err(GraphError::StepLimitReached { max: limit }.into())
    }

    async fn step(
        &self,
        node: Node,
        transcript: Transcript,
        thread_id: &str,
    ) -> Result<(Outcome, Transcript)> {
        match node {
            Node::Assistant => self.assistant(transcript, thread_id).await,
            Node::Retriever => self.retriever(transcript).await,
            Node::Grader => self.grader(transcript).await,
            Node::Generator => self.generator(transcript).await,
            Node::Rewriter => self.rewriter(transcript).await,
        }
    }

    fn wants_tool(&self, query: &str) -> bool {
        let lowered = query.to_lowercase();
        self.config
            .tool_keywords
            .iter()
            .any(|k| lowered.contains(&k.to_lowercase()))
    }

    async fn assistant(
        &self,
        transcript: Transcript,
        thread_id: &str,
    ) -> Result<(Outcome, Transcript)> {
        let query = transcript.current_query().to_string();
        if self.wants_tool(&query) {
            debug!(query = %query, "Assistant requested retrieval");
            let transcript = transcript.append(Node::Assistant, Signal::ToolRequest { query });
            return Ok((Outcome::ToolRequested, transcript));
        }

        let history = self.history(thread_id);
        let prompt = self.prompts.direct_answer(&query, &history)?;
        let text = self.llm.complete_text(&prompt).await?;
        let transcript = transcript.append(Node::Assistant, Signal::DirectAnswer { text });
        Ok((Outcome::Answered, transcript))
    }

    async fn retriever(&self, transcript: Transcript) -> Result<(Outcome, Transcript)> {
        let query = transcript.current_query().to_string();
        let block = match self.context.fetch_context(&query).await {
            Ok(block) => block,
            Err(e) => {
                warn!(error = %e, query = %query, "Retrieval failed; continuing without context");
                ContextBlock::empty()
            }
        };
        let transcript = transcript.append(Node::Retriever, Signal::Context { block });
        Ok((Outcome::Retrieved, transcript))
    }

    async fn grader(&self, transcript: Transcript) -> Result<(Outcome, Transcript)> {
        let block = latest_context(&transcript, Node::Grader)?;
        let prompt = self.prompts.grader(transcript.question(), block.as_str())?;
        let verdict = self.llm.complete_text(&prompt).await?;
        let relevant = verdict.to_lowercase().contains("yes");
        let budget = self.config.rewrite_budget();
        let budget_exhausted = !relevant && transcript.rewrite_count() >= budget;

        let outcome = if relevant {
            Outcome::Relevant
        } else if budget_exhausted {
            warn!(
                max_rewrites = budget,
                "Rewrite budget exhausted; generating from last context"
            );
            Outcome::RewriteBudgetExhausted
        } else {
            Outcome::NotRelevant
        };
        debug!(relevant, budget_exhausted, "Grader verdict");

        let transcript = transcript.append(
            Node::Grader,
            Signal::Verdict {
                relevant,
                budget_exhausted,
            },
        );
        Ok((outcome, transcript))
    }

    async fn generator(&self, transcript: Transcript) -> Result<(Outcome, Transcript)> {
        let block = latest_context(&transcript, Node::Generator)?.clone();
        let question = transcript.question().to_string();
        let prompt = self.prompts.product_bot(block.as_str(), &question)?;
        let text = self.llm.complete_text(&prompt).await?;

        let scores = match &self.evaluator {
            Some(evaluator) if block.is_recognizable() => {
                score_answer(evaluator.as_ref(), &question, &text, &block.split()).await
            }
            _ => None,
        };

        let transcript = transcript.append(Node::Generator, Signal::Answer { text, scores });
        Ok((Outcome::Generated, transcript))
    }

    async fn rewriter(&self, transcript: Transcript) -> Result<(Outcome, Transcript)> {
        let prompt = self.prompts.rewrite(transcript.question())?;
        let rewritten = self.llm.complete_text(&prompt).await?;
        let query = rewritten.trim().to_string();
        info!(query = %query, "Query rewritten");
        let transcript = transcript.append(Node::Rewriter, Signal::RewrittenQuery { query });
        Ok((Outcome::Rewritten, transcript))
    }

    /// Earlier question/answer turns of the thread, newest last.
    fn history(&self, thread_id: &str) -> Vec<HistoryTurn> {
        if self.config.history_turns == 0 {
            return Vec::new();
        }
        let turns: Vec<HistoryTurn> = self
            .checkpointer
            .history(thread_id)
            .iter()
            .filter_map(|t| {
                t.final_answer()
                    .map(|a| (t.question().to_string(), a.to_string()))
            })
            .flat_map(|(q, a)| {
                [
                    HistoryTurn {
                        role: "user".into(),
                        content: q,
                    },
                    HistoryTurn {
                        role: "assistant".into(),
                        content: a,
                    },
                ]
            })
            .collect();
        let keep = self.config.history_turns * 2;
        turns[turns.len().saturating_sub(keep)..].to_vec()
    }
}

fn latest_context(transcript: &Transcript, node: Node) -> Result<&ContextBlock> {
    transcript.latest_context().ok_or_else(|| {
        AssistantError::from(GraphError::MissingSignal {
            node: node.to_string(),
            expected: "context".into(),
        })
    })
}

fn build_reply(transcript: &Transcript, thread_id: &str) -> Result<AssistantReply> {
    let (answer, scores, route) = match transcript.last().map(|e| &e.signal) {
        Some(Signal::DirectAnswer { text }) => (text.clone(), None, Route::Direct),
        Some(Signal::Answer { text, scores }) => {
            let route = if transcript.budget_exhausted() {
                Route::RewriteBudgetExhausted
            } else {
                Route::Retrieved
            };
            (text.clone(), *scores, route)
        }
        _ => {
            return Err(GraphError::MissingSignal {
                node: "end".into(),
                expected: "answer".into(),
            }
            .into());
        }
    };

    Ok(AssistantReply {
        thread_id: Some(thread_id.to_string()),
        question: transcript.question().to_string(),
        answer,
        scores,
        route,
        rewrites: transcript.rewrite_count(),
    })
}
