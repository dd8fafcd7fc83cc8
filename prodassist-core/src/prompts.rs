//! Prompt templates used by the workflows and the answer scorer.
//!
//! Templates are Handlebars strings registered once with HTML escaping turned
//! off, since retrieved reviews routinely contain `&`, `<` and quotes.

use crate::error::LlmError;
use handlebars::Handlebars;
use serde::Serialize;

pub const PRODUCT_BOT: &str = "product_bot";
pub const DIRECT_ANSWER: &str = "direct_answer";
pub const GRADER: &str = "grader";
pub const REWRITE: &str = "rewrite";
pub const CONTEXT_USEFULNESS: &str = "context_usefulness";
pub const QUESTION_GENERATION: &str = "question_generation";

const PRODUCT_BOT_TEMPLATE: &str = "You are an expert e-commerce assistant who answers \
questions about products using their listings and customer reviews.
Stay relevant to the context and keep the answer concise and informative. If the context does not \
contain the answer, say so instead of guessing.

CONTEXT:
{{context}}

QUESTION: {{question}}

YOUR ANSWER:";

const DIRECT_ANSWER_TEMPLATE: &str = "You are a helpful assistant. Answer the user directly.
{{#if history}}
Conversation so far:
{{#each history}}
{{this.role}}: {{this.content}}
{{/each}}
{{/if}}
Question: {{question}}
Answer:";

const GRADER_TEMPLATE: &str = "You are a grader. Question: {{question}}
Docs: {{docs}}
Are docs relevant to the question? Answer yes or no.";

const REWRITE_TEMPLATE: &str = "Rewrite the query to be clearer: {{question}}";

const CONTEXT_USEFULNESS_TEMPLATE: &str = "Given a question, an answer, and a context, verify \
whether the context was useful in arriving at the answer.
Reply with a single word: yes or no.

Question: {{question}}
Answer: {{answer}}
Context:
{{context}}

Useful:";

const QUESTION_GENERATION_TEMPLATE: &str = "Generate {{count}} questions that the following \
answer would answer. Also decide whether the answer is noncommittal (evasive, vague, or \"I don't know\").
Respond with JSON only, in the form {\"questions\": [\"...\"], \"noncommittal\": false}.

Answer: {{answer}}";

/// A turn of earlier conversation shown to the direct-answer prompt.
#[derive(Debug, Clone, Serialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

/// Registry of the assistant's prompt templates.
pub struct PromptLibrary {
    registry: Handlebars<'static>,
}

impl PromptLibrary {
    pub fn new() -> Result<Self, LlmError> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);
        for (name, template) in [
            (PRODUCT_BOT, PRODUCT_BOT_TEMPLATE),
            (DIRECT_ANSWER, DIRECT_ANSWER_TEMPLATE),
            (GRADER, GRADER_TEMPLATE),
            (REWRITE, REWRITE_TEMPLATE),
            (CONTEXT_USEFULNESS, CONTEXT_USEFULNESS_TEMPLATE),
            (QUESTION_GENERATION, QUESTION_GENERATION_TEMPLATE),
        ] {
            registry
                .register_template_string(name, template)
                .map_err(|e| LlmError::Template {
                    message: format!("{name}: {e}"),
                })?;
        }
        Ok(Self { registry })
    }

    /// Render a registered template with the given variables.
    pub fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, LlmError> {
        self.registry
            .render(name, data)
            .map_err(|e| LlmError::Template {
                message: format!("{name}: {e}"),
            })
    }

    pub fn product_bot(&self, context: &str, question: &str) -> Result<String, LlmError> {
        self.render(
            PRODUCT_BOT,
            &serde_json::json!({ "context": context, "question": question }),
        )
    }

    pub fn direct_answer(
        &self,
        question: &str,
        history: &[HistoryTurn],
    ) -> Result<String, LlmError> {
        self.render(
            DIRECT_ANSWER,
            &serde_json::json!({ "question": question, "history": history }),
        )
    }

    pub fn grader(&self, question: &str, docs: &str) -> Result<String, LlmError> {
        self.render(
            GRADER,
            &serde_json::json!({ "question": question, "docs": docs }),
        )
    }

    pub fn rewrite(&self, question: &str) -> Result<String, LlmError> {
        self.render(REWRITE, &serde_json::json!({ "question": question }))
    }

    pub fn context_usefulness(
        &self,
        question: &str,
        answer: &str,
        context: &str,
    ) -> Result<String, LlmError> {
        self.render(
            CONTEXT_USEFULNESS,
            &serde_json::json!({ "question": question, "answer": answer, "context": context }),
        )
    }

    pub fn question_generation(&self, answer: &str, count: usize) -> Result<String, LlmError> {
        self.render(
            QUESTION_GENERATION,
            &serde_json::json!({ "answer": answer, "count": count }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_templates_register() {
        assert!(PromptLibrary::new().is_ok());
    }

    #[test]
    fn test_grader_prompt() {
        let prompts = PromptLibrary::new().unwrap();
        let text = prompts
            .grader("iPhone 15 price?", "Title: iPhone 15")
            .unwrap();
        assert_eq!(
            text,
            "You are a grader. Question: iPhone 15 price?\nDocs: Title: iPhone 15\n\
             Are docs relevant to the question? Answer yes or no."
        );
    }

    #[test]
    fn test_no_html_escaping() {
        let prompts = PromptLibrary::new().unwrap();
        let text = prompts
            .product_bot("Reviews:\n\"Great\" & <cheap>", "Is it good?")
            .unwrap();
        assert!(text.contains("\"Great\" & <cheap>"));
        assert!(text.contains("QUESTION: Is it good?"));
    }

    #[test]
    fn test_direct_answer_with_and_without_history() {
        let prompts = PromptLibrary::new().unwrap();
        let bare = prompts.direct_answer("hi", &[]).unwrap();
        assert!(!bare.contains("Conversation so far"));
        assert!(bare.ends_with("Question: hi\nAnswer:"));

        let history = vec![HistoryTurn {
            role: "user".into(),
            content: "I like Sony".into(),
        }];
        let with = prompts.direct_answer("why?", &history).unwrap();
        assert!(with.contains("user: I like Sony"));
    }

    #[test]
    fn test_question_generation_mentions_count() {
        let prompts = PromptLibrary::new().unwrap();
        let text = prompts.question_generation("It costs $5.", 3).unwrap();
        assert!(text.starts_with("Generate 3 questions"));
        assert!(text.contains("{\"questions\""));
    }

    #[test]
    fn test_unknown_template() {
        let prompts = PromptLibrary::new().unwrap();
        let err = prompts
            .render("missing", &serde_json::json!({}))
            .unwrap_err();
        assert!(matches!(err, LlmError::Template { .. }));
    }
}
