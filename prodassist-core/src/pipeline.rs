//! Linear retrieve → format → prompt → generate → score pipeline.
//!
//! The single-pass counterpart of the graph. It shares formatting, prompts,
//! and scoring with the graph and returns the same [`AssistantReply`].

use crate::brain::LlmProvider;
use crate::error::Result;
use crate::evaluation::{Evaluator, score_answer};
use crate::prompts::PromptLibrary;
use crate::retrieval::{ContextBlock, Retriever, format_documents};
use crate::types::{AssistantReply, Route};
use std::sync::Arc;
use tracing::info;

pub struct LinearPipeline {
    llm: Arc<dyn LlmProvider>,
    retriever: Arc<dyn Retriever>,
    evaluator: Option<Arc<dyn Evaluator>>,
    prompts: Arc<PromptLibrary>,
}

impl LinearPipeline {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        retriever: Arc<dyn Retriever>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self {
            llm,
            retriever,
            evaluator: None,
            prompts,
        }
    }

    pub fn with_evaluator(mut self, evaluator: Arc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    pub async fn run(&self, question: &str) -> Result<AssistantReply> {
        let docs = self.retriever.retrieve(question).await?;
        let contexts = format_documents(&docs);
        let block = ContextBlock::from_documents(&docs);
        info!(documents = docs.len(), "Pipeline retrieved context");

        let prompt = self.prompts.product_bot(block.as_str(), question)?;
        let answer = self.llm.complete_text(&prompt).await?;

        let scores = match &self.evaluator {
            Some(evaluator) => score_answer(evaluator.as_ref(), question, &answer, &contexts).await,
            None => None,
        };

        Ok(AssistantReply {
            thread_id: None,
            question: question.to_string(),
            answer,
            scores,
            route: Route::Pipeline,
            rewrites: 0,
        })
    }
}
