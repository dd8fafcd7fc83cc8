//! Answer scoring: context precision and response relevancy.
//!
//! Both metrics follow the usual RAG evaluation definitions and are computed
//! with an LLM judge plus an embedder. Scoring is advisory: `score_answer`
//! turns every failure into a logged warning and an unscored answer.

use crate::brain::LlmProvider;
use crate::embeddings::{Embedder, cosine_similarity};
use crate::error::EvaluationError;
use crate::prompts::PromptLibrary;
use crate::types::ScorePair;
use async_trait::async_trait;
use futures::future::try_join_all;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Scores an answer against the contexts it was generated from.
#[async_trait]
pub trait Evaluator: Send + Sync {
    async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        contexts: &[String],
    ) -> Result<ScorePair, EvaluationError>;
}

/// Evaluator backed by an LLM judge and an embedder.
pub struct LlmEvaluator {
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn Embedder>,
    prompts: Arc<PromptLibrary>,
    questions_per_answer: usize,
}

impl LlmEvaluator {
    pub fn new(
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn Embedder>,
        prompts: Arc<PromptLibrary>,
    ) -> Self {
        Self {
            llm,
            embedder,
            prompts,
            questions_per_answer: 3,
        }
    }

    pub fn with_questions_per_answer(mut self, count: usize) -> Self {
        self.questions_per_answer = count.max(1);
        self
    }

    /// Average precision over per-context usefulness verdicts.
    pub async fn context_precision(
        &self,
        question: &str,
        answer: &str,
        contexts: &[String],
    ) -> Result<f64, EvaluationError> {
        let judgements = contexts.iter().map(|context| async move {
            let prompt = self.prompts.context_usefulness(question, answer, context)?;
            let reply = self.llm.complete_text(&prompt).await?;
            parse_verdict(&reply)
        });
        let verdicts = try_join_all(judgements).await?;
        debug!(?verdicts, "Context usefulness verdicts");
        Ok(average_precision(&verdicts))
    }

    /// Mean similarity between the question and questions the answer implies.
    pub async fn response_relevancy(
        &self,
        question: &str,
        answer: &str,
    ) -> Result<f64, EvaluationError> {
        let prompt = self
            .prompts
            .question_generation(answer, self.questions_per_answer)?;
        let reply = self.llm.complete_text(&prompt).await?;
        let generated = parse_generated_questions(&reply)?;
        if generated.noncommittal {
            return Ok(0.0);
        }

        let target = self.embedder.embed(question);
        let total: f64 = generated
            .questions
            .iter()
            .map(|q| cosine_similarity(&target, &self.embedder.embed(q)))
            .map(f64::from)
            .sum();
        Ok(total / generated.questions.len() as f64)
    }
}

#[async_trait]
impl Evaluator for LlmEvaluator {
    async fn evaluate(
        &self,
        question: &str,
        answer: &str,
        contexts: &[String],
    ) -> Result<ScorePair, EvaluationError> {
        if contexts.is_empty() {
            return Err(EvaluationError::NoContexts);
        }
        let precision = self.context_precision(question, answer, contexts).await?;
        let relevancy = self.response_relevancy(question, answer).await?;
        Ok(ScorePair::new(precision, relevancy))
    }
}

/// Score an answer, logging instead of failing.
///
/// Returns `None` when there is nothing to score against or scoring failed.
pub async fn score_answer(
    evaluator: &dyn Evaluator,
    question: &str,
    answer: &str,
    contexts: &[String],
) -> Option<ScorePair> {
    if contexts.is_empty() {
        debug!("No retrieved context; skipping answer scoring");
        return None;
    }
    match evaluator.evaluate(question, answer, contexts).await {
        Ok(scores) => {
            info!(
                context_precision = scores.context_precision,
                response_relevancy = scores.response_relevancy,
                "Answer scored"
            );
            Some(scores)
        }
        Err(e) => {
            warn!(error = %e, "Answer scoring failed; returning unscored answer");
            None
        }
    }
}

/// RAGAS-style average precision: mean of precision@k over useful positions.
pub fn average_precision(verdicts: &[bool]) -> f64 {
    let mut hits = 0usize;
    let mut sum = 0.0;
    for (i, useful) in verdicts.iter().enumerate() {
        if *useful {
            hits += 1;
            sum += hits as f64 / (i + 1) as f64;
        }
    }
    if hits == 0 { 0.0 } else { sum / hits as f64 }
}

fn parse_verdict(reply: &str) -> Result<bool, EvaluationError> {
    let lowered = reply.trim().to_lowercase();
    let first = lowered
        .split(|c: char| !c.is_alphanumeric())
        .find(|w| !w.is_empty())
        .unwrap_or("");
    match first {
        "yes" | "true" | "1" => Ok(true),
        "no" | "false" | "0" => Ok(false),
        _ => Err(EvaluationError::BadVerdict {
            message: format!("expected yes/no, got '{}'", reply.trim()),
        }),
    }
}

#[derive(Debug, Deserialize)]
struct GeneratedQuestions {
    #[serde(default)]
    questions: Vec<String>,
    #[serde(default)]
    noncommittal: bool,
}

fn parse_generated_questions(reply: &str) -> Result<GeneratedQuestions, EvaluationError> {
    let start = reply.find('{');
    let end = reply.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &reply[s..=e],
        _ => {
            return Err(EvaluationError::BadVerdict {
                message: "question generation reply had no JSON object".into(),
            });
        }
    };
    let parsed: GeneratedQuestions =
        serde_json::from_str(json).map_err(|e| EvaluationError::BadVerdict {
            message: format!("question generation JSON: {e}"),
        })?;
    if parsed.questions.is_empty() && !parsed.noncommittal {
        return Err(EvaluationError::BadVerdict {
            message: "no questions generated".into(),
        });
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brain::MockLlmProvider;
    use crate::embeddings::LocalEmbedder;

    fn evaluator(llm: MockLlmProvider) -> LlmEvaluator {
        LlmEvaluator::new(
            Arc::new(llm),
            Arc::new(LocalEmbedder::default()),
            Arc::new(PromptLibrary::new().unwrap()),
        )
    }

    #[test]
    fn test_average_precision() {
        assert_eq!(average_precision(&[]), 0.0);
        assert_eq!(average_precision(&[false, false]), 0.0);
        assert_eq!(average_precision(&[true, true]), 1.0);
        // (1/1 + 2/3) / 2
        let ap = average_precision(&[true, false, true]);
        assert!((ap - 0.8333).abs() < 1e-3);
        // 1/2
        assert_eq!(average_precision(&[false, true]), 0.5);
    }

    #[test]
    fn test_parse_verdict() {
        assert!(parse_verdict("Yes.").unwrap());
        assert!(!parse_verdict(" no, it was not").unwrap());
        assert!(parse_verdict("maybe").is_err());
    }

    #[test]
    fn test_parse_generated_questions_with_prose() {
        let parsed = parse_generated_questions(
            "Sure! {\"questions\": [\"How much is it?\"], \"noncommittal\": false} hope that helps",
        )
        .unwrap();
        assert_eq!(parsed.questions, vec!["How much is it?"]);
        assert!(parse_generated_questions("no json here").is_err());
        assert!(parse_generated_questions("{\"questions\": []}").is_err());
    }

    #[tokio::test]
    async fn test_evaluate_scores_in_range() {
        let llm = MockLlmProvider::new()
            .with_rule("context was useful", "yes")
            .with_rule(
                "Generate 3 questions",
                r#"{"questions": ["What is the price of the iPhone 15?", "How much does the iPhone 15 cost?"], "noncommittal": false}"#,
            );
        let scores = evaluator(llm)
            .evaluate(
                "What is the price of the iPhone 15?",
                "The iPhone 15 costs $799.",
                &["Title: iPhone 15\nPrice: $799".into()],
            )
            .await
            .unwrap();
        assert_eq!(scores.context_precision, 1.0);
        assert!(scores.response_relevancy > 0.5);
        assert!(scores.response_relevancy <= 1.0);
    }

    #[tokio::test]
    async fn test_noncommittal_answer_scores_zero() {
        let llm = MockLlmProvider::new()
            .with_rule("context was useful", "no")
            .with_rule("Generate", r#"{"questions": ["?"], "noncommittal": true}"#);
        let scores = evaluator(llm)
            .evaluate("q", "I don't know.", &["ctx".into()])
            .await
            .unwrap();
        assert_eq!(scores.context_precision, 0.0);
        assert_eq!(scores.response_relevancy, 0.0);
    }

    #[tokio::test]
    async fn test_evaluate_without_contexts() {
        let err = evaluator(MockLlmProvider::new())
            .evaluate("q", "a", &[])
            .await
            .unwrap_err();
        assert!(matches!(err, EvaluationError::NoContexts));
    }

    #[tokio::test]
    async fn test_score_answer_swallows_failures() {
        let llm = MockLlmProvider::new().with_failure("context was useful", "judge offline");
        let evaluator = evaluator(llm);
        let scores = score_answer(&evaluator, "q", "a", &["ctx".into()]).await;
        assert!(scores.is_none());
        assert!(score_answer(&evaluator, "q", "a", &[]).await.is_none());
    }
}
