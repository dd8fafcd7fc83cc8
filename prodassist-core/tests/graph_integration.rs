//! End-to-end runs of the retrieval graph over an in-memory catalog.

use std::sync::Arc;

use pretty_assertions::assert_eq;
use prodassist_core::config::{GraphConfig, RetrievalConfig};
use prodassist_core::embeddings::LocalEmbedder;
use prodassist_core::graph::{AgenticRag, Node};
use prodassist_core::retrieval::document::{PRICE_KEY, RATING_KEY, TITLE_KEY};
use prodassist_core::retrieval::{Document, DocumentContext, FilteredRetriever, InMemoryIndex};
use prodassist_core::{LlmEvaluator, MockLlmProvider, PromptLibrary, Route};

const GRADER: &str = "You are a grader";
const REWRITE: &str = "Rewrite the query";
const GENERATE: &str = "expert e-commerce assistant";
const USEFUL: &str = "context was useful";
const QUESTIONS: &str = "Generate 3 questions";

fn catalog() -> InMemoryIndex {
    let docs = vec![
        Document::new("Great camera and battery. A bit pricey.")
            .with_meta(TITLE_KEY, "Apple iPhone 15")
            .with_meta(PRICE_KEY, "$799")
            .with_meta(RATING_KEY, "4.6"),
        Document::new("The bigger screen is worth it.")
            .with_meta(TITLE_KEY, "Apple iPhone 15 Plus")
            .with_meta(PRICE_KEY, "$899")
            .with_meta(RATING_KEY, "4.5"),
        Document::new("Comfortable, best-in-class noise cancelling.")
            .with_meta(TITLE_KEY, "Sony WH-1000XM5")
            .with_meta(PRICE_KEY, "$349")
            .with_meta(RATING_KEY, "4.7"),
    ];
    InMemoryIndex::from_config(&RetrievalConfig::default())
        .with_documents(docs)
}

fn build(llm: Arc<MockLlmProvider>, with_scoring: bool) -> AgenticRag {
    let prompts = Arc::new(PromptLibrary::new().unwrap());
    let context = Arc::new(DocumentContext::new(FilteredRetriever::new(catalog())));
    let rag = AgenticRag::new(
        llm.clone(),
        context,
        prompts.clone(),
        GraphConfig::default(),
    );
    if with_scoring {
        let embedder = Arc::new(LocalEmbedder::default());
        let evaluator = LlmEvaluator::new(llm, embedder, prompts);
        rag.with_evaluator(Arc::new(evaluator))
    } else {
        rag
    }
}

#[tokio::test]
async fn relevant_product_question_is_answered_and_scored() {
    let llm = Arc::new(
        MockLlmProvider::new()
            .with_rule(GRADER, "yes")
            .with_rule(USEFUL, "yes")
            .with_rule(
                QUESTIONS,
                r#"{"questions": ["What is the price of the iPhone 15?"], "noncommittal": false}"#,
            )
            .with_rule(GENERATE, "The Apple iPhone 15 costs $799."),
    );
    let rag = build(llm.clone(), true);

    let reply = rag
        .run("What is the price of the iPhone 15?", Some("shop-1"))
        .await
        .unwrap();

    assert_eq!(reply.route, Route::Retrieved);
    assert_eq!(reply.rewrites, 0);
    assert_eq!(reply.thread_id.as_deref(), Some("shop-1"));
    let scores = reply.scores.expect("retrieved answers are scored");
    assert_eq!(scores.context_precision, 1.0);
    assert!(scores.response_relevancy > 0.99);
    assert!(
        reply
            .render(true)
            .ends_with("[Eval] Context Precision: 1.00 | Response Relevancy: 1.00")
    );

    // The generator saw both iPhone 15 listings but not the headphones.
    let generation = llm
        .prompts()
        .into_iter()
        .find(|p| p.contains(GENERATE))
        .unwrap();
    assert!(generation.contains("Title: Apple iPhone 15\nPrice: $799"));
    assert!(generation.contains("Title: Apple iPhone 15 Plus"));
    assert!(!generation.contains("Sony"));
}

#[tokio::test]
async fn irrelevant_context_triggers_rewrite() {
    let llm = Arc::new(
        MockLlmProvider::new()
            .with_rule("Docs: No relevant documents found.", "no")
            .with_rule(GRADER, "yes")
            .with_rule(REWRITE, "Sony WH-1000XM5 headphones review")
            .with_rule(GENERATE, "Reviewers love the noise cancelling."),
    );
    let rag = build(llm.clone(), false);

    let transcript = rag
        .execute("review of the sony 2000 headphones", "t")
        .await
        .unwrap();

    assert_eq!(
        transcript.path(),
        vec![
            Node::Assistant,
            Node::Retriever,
            Node::Grader,
            Node::Rewriter,
            Node::Assistant,
            Node::Retriever,
            Node::Grader,
            Node::Generator,
        ]
    );
    assert_eq!(transcript.rewrite_count(), 1);
    assert_eq!(
        transcript.final_answer(),
        Some("Reviewers love the noise cancelling.")
    );
}

#[tokio::test]
async fn scoring_failure_still_returns_answer() {
    let llm = Arc::new(
        MockLlmProvider::new()
            .with_rule(GRADER, "yes")
            .with_failure(USEFUL, "judge unavailable")
            .with_rule(GENERATE, "The Sony WH-1000XM5 costs $349."),
    );
    let rag = build(llm, true);

    let reply = rag.run("Sony headphones price", None).await.unwrap();

    assert_eq!(reply.answer, "The Sony WH-1000XM5 costs $349.");
    assert!(reply.scores.is_none());
    assert_eq!(reply.render(true), "The Sony WH-1000XM5 costs $349.");
}

#[tokio::test]
async fn model_number_mismatch_reaches_budget_with_empty_context() {
    let llm = Arc::new(
        MockLlmProvider::new()
            .with_rule(GRADER, "no")
            .with_rule(REWRITE, "Apple iPhone 17 price")
            .with_rule(GENERATE, "I don't have details on the iPhone 17."),
    );
    let rag = build(llm.clone(), true);

    let reply = rag.run("iPhone 17 price?", None).await.unwrap();

    assert_eq!(reply.route, Route::RewriteBudgetExhausted);
    assert_eq!(reply.rewrites, 2);
    // The empty-context sentinel is never scored.
    assert!(reply.scores.is_none());
    assert_eq!(llm.calls_containing(USEFUL), 0);
}
