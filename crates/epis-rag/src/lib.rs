//! EPIS RAG - Intent routing and answer composition
//!
//! This crate turns a user question into an [`Answer`]:
//! - Rule-based intent classification ([`IntentClassifier`])
//! - Retrieval-augmented answers for general questions and problem reports
//!   ([`ResponseComposer`])
//! - Ticket creation and the single failure boundary ([`RequestHandler`])
//!
//! Author: hephaex@gmail.com

use epis_core::{
    Answer, AnswerGenerator, EpisError, Fragment, Intent, KnowledgeRetriever, Messages, Result,
};
use std::sync::Arc;
use std::time::Duration;

pub mod handler;
pub mod intent;
pub mod llm;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use handler::{Handled, RequestHandler, Route};
pub use intent::IntentClassifier;
pub use llm::{create_answer_generator, OllamaClient, OpenAiClient};

/// Fragments retrieved per question unless configured otherwise
pub const DEFAULT_TOP_K: usize = 2;

/// Upper bound on a single generator call unless configured otherwise
pub const DEFAULT_GENERATION_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Response Composer
// ============================================================================

/// Builds the reply for a classified question
pub struct ResponseComposer {
    retriever: Arc<dyn KnowledgeRetriever>,
    generator: Arc<dyn AnswerGenerator>,
    messages: &'static Messages,
    top_k: usize,
    generation_timeout: Duration,
}

impl ResponseComposer {
    /// Create a new composer
    pub fn new(
        retriever: Arc<dyn KnowledgeRetriever>,
        generator: Arc<dyn AnswerGenerator>,
        messages: &'static Messages,
    ) -> Self {
        Self {
            retriever,
            generator,
            messages,
            top_k: DEFAULT_TOP_K,
            generation_timeout: DEFAULT_GENERATION_TIMEOUT,
        }
    }

    /// Set the number of fragments retrieved per question
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    /// Set the bound on a single generator call
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    /// Knowledge retriever used for RAG answers
    pub fn retriever(&self) -> &Arc<dyn KnowledgeRetriever> {
        &self.retriever
    }

    /// Compose the answer for a classified question
    pub async fn compose(&self, intent: Intent, question: &str) -> Result<Answer> {
        match intent {
            Intent::GeneralQuestion => {
                let answer = self.answer_from_documents(question).await?;
                Ok(Answer::final_answer(
                    answer.unwrap_or_else(|| self.messages.no_answer.to_string()),
                ))
            }
            Intent::ProblemReport => {
                let solution = self
                    .answer_from_documents(question)
                    .await?
                    .unwrap_or_else(|| self.messages.no_solution.to_string());
                Ok(Answer::with_follow_up(format!(
                    "{solution}\n\n{}",
                    self.messages.follow_up_question
                )))
            }
            Intent::Farewell => Ok(Answer::final_answer(self.messages.farewell)),
        }
    }

    /// Retrieve context and generate; `None` when the model returned nothing
    async fn answer_from_documents(&self, question: &str) -> Result<Option<String>> {
        let fragments = self.retriever.retrieve(question, self.top_k).await?;
        tracing::debug!(
            retriever = self.retriever.name(),
            fragments = fragments.len(),
            "Context retrieved"
        );

        let prompt = self.build_prompt(question, &fragments);
        tracing::debug!(
            model = self.generator.model(),
            prompt_chars = prompt.len(),
            "Calling answer generator"
        );

        let generation = self.generator.generate(&prompt);
        let generated = tokio::time::timeout(self.generation_timeout, generation)
            .await
            .map_err(|_| EpisError::Timeout {
                operation: "answer generation".to_string(),
                seconds: self.generation_timeout.as_secs(),
            })??;

        let generated = generated.trim();
        tracing::debug!(answer_chars = generated.len(), "Answer generated");

        Ok((!generated.is_empty()).then(|| generated.to_string()))
    }

    /// Build the constrained RAG prompt
    pub fn build_prompt(&self, question: &str, fragments: &[Fragment]) -> String {
        fragments
            .iter()
            .fold(PromptBuilder::new(self.messages), |builder, fragment| {
                builder.add_context(&fragment.content)
            })
            .question(question)
            .build()
    }
}

// ============================================================================
// Prompt Builder
// ============================================================================

/// Builder for constructing RAG prompts
///
/// Layout:
///
/// ```text
/// <role>
/// <rule 1>
/// ...
///
/// Context:
/// <fragment 1>
///
/// <fragment 2>
///
/// Question: <question>
/// Answer:
/// ```
pub struct PromptBuilder {
    messages: &'static Messages,
    context_sections: Vec<String>,
    question: String,
}

impl PromptBuilder {
    /// Create a new prompt builder for a locale's messages
    pub fn new(messages: &'static Messages) -> Self {
        Self {
            messages,
            context_sections: Vec::new(),
            question: String::new(),
        }
    }

    /// Add a context section
    pub fn add_context(mut self, context: impl Into<String>) -> Self {
        self.context_sections.push(context.into());
        self
    }

    /// Set the question
    pub fn question(mut self, q: impl Into<String>) -> Self {
        self.question = q.into();
        self
    }

    /// Build the final prompt
    pub fn build(self) -> String {
        let mut prompt = String::new();

        prompt.push_str(self.messages.prompt_role);
        prompt.push('\n');
        for rule in self.messages.prompt_rules {
            prompt.push_str(rule);
            prompt.push('\n');
        }

        prompt.push('\n');
        prompt.push_str(self.messages.prompt_context_label);
        prompt.push('\n');
        prompt.push_str(&self.context_sections.join("\n\n"));
        prompt.push_str("\n\n");

        prompt.push_str(self.messages.prompt_question_label);
        prompt.push(' ');
        prompt.push_str(self.question.trim());
        prompt.push('\n');
        prompt.push_str(self.messages.prompt_answer_label);

        prompt
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        FailingGenerator, FailingRetriever, ScriptedGenerator, SlowGenerator, StaticRetriever,
    };
    use epis_core::Locale;

    fn english() -> &'static Messages {
        Messages::for_locale(Locale::En)
    }

    fn composer(
        retriever: Arc<StaticRetriever>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> ResponseComposer {
        ResponseComposer::new(retriever, generator, english())
    }

    #[test]
    fn test_prompt_builder() {
        let prompt = PromptBuilder::new(english())
            .add_context("Printers are on floor 2.")
            .add_context("Toner is in the supply room.")
            .question("  Where is the printer?  ")
            .build();

        assert!(prompt.starts_with(english().prompt_role));
        assert!(prompt.contains("Use ONLY the following context"));
        assert!(prompt.contains("2 sentences maximum"));
        assert!(prompt.contains(
            "Context:\nPrinters are on floor 2.\n\nToner is in the supply room.\n\n"
        ));
        assert!(prompt.ends_with("Question: Where is the printer?\nAnswer:"));
    }

    #[test]
    fn test_prompt_builder_spanish() {
        let prompt = PromptBuilder::new(Messages::for_locale(Locale::Es))
            .add_context("La impresora está en la planta 2.")
            .question("¿Dónde está la impresora?")
            .build();

        assert!(prompt.contains("Responde SIEMPRE en Español."));
        assert!(prompt.contains("Contexto:\nLa impresora está en la planta 2."));
        assert!(prompt.ends_with("Pregunta: ¿Dónde está la impresora?\nRespuesta:"));
    }

    #[tokio::test]
    async fn test_general_question_uses_generated_text() {
        let retriever = Arc::new(StaticRetriever::with_texts(&[
            "VPN guide",
            "Wi-Fi guide",
            "extra",
        ]));
        let generator = Arc::new(ScriptedGenerator::new("  Use the VPN client.  "));
        let composer = composer(retriever.clone(), generator.clone());

        let answer = composer
            .compose(Intent::GeneralQuestion, "How do I connect remotely?")
            .await
            .unwrap();

        assert_eq!(answer, Answer::final_answer("Use the VPN client."));
        assert_eq!(retriever.calls(), 1);
        assert_eq!(retriever.last_k(), Some(DEFAULT_TOP_K));
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("VPN guide"));
        assert!(prompt.contains("Wi-Fi guide"));
        assert!(!prompt.contains("extra"));
    }

    #[tokio::test]
    async fn test_problem_report_appends_follow_up() {
        let retriever = Arc::new(StaticRetriever::with_texts(&["Check the cable."]));
        let generator = Arc::new(ScriptedGenerator::new("Check that the cable is plugged in."));
        let composer = composer(retriever, generator);

        let answer = composer
            .compose(Intent::ProblemReport, "the network is down")
            .await
            .unwrap();

        assert!(answer.follow_up_required);
        assert_eq!(
            answer.answer,
            "Check that the cable is plugged in.\n\nDoes this information solve your problem?"
        );
    }

    #[tokio::test]
    async fn test_blank_generation_falls_back() {
        let retriever = Arc::new(StaticRetriever::with_texts(&["irrelevant"]));
        let generator = Arc::new(ScriptedGenerator::new("   "));
        let composer = composer(retriever, generator);

        let general = composer.compose(Intent::GeneralQuestion, "q").await.unwrap();
        assert_eq!(general.answer, english().no_answer);

        let problem = composer.compose(Intent::ProblemReport, "error").await.unwrap();
        assert!(problem.answer.starts_with(english().no_solution));
        assert!(problem.answer.ends_with(english().follow_up_question));
    }

    #[tokio::test]
    async fn test_farewell_skips_collaborators() {
        let retriever = Arc::new(StaticRetriever::with_texts(&["unused"]));
        let generator = Arc::new(ScriptedGenerator::new("unused"));
        let composer = composer(retriever.clone(), generator.clone());

        let answer = composer.compose(Intent::Farewell, "thanks!").await.unwrap();

        assert_eq!(answer, Answer::final_answer(english().farewell));
        assert_eq!(retriever.calls(), 0);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_propagates() {
        let retriever = Arc::new(StaticRetriever::with_texts(&["ctx"]));
        let composer = composer(retriever, Arc::new(FailingGenerator));

        let err = composer
            .compose(Intent::GeneralQuestion, "what is the wifi password?")
            .await
            .unwrap_err();
        assert!(matches!(err, EpisError::Generation(_)));
    }

    #[tokio::test]
    async fn test_retrieval_failure_propagates() {
        let composer = ResponseComposer::new(
            Arc::new(FailingRetriever),
            Arc::new(ScriptedGenerator::new("unused")),
            english(),
        );

        let err = composer.compose(Intent::ProblemReport, "error").await.unwrap_err();
        assert!(matches!(err, EpisError::Retrieval(_)));
    }

    #[tokio::test]
    async fn test_generation_timeout() {
        let retriever = Arc::new(StaticRetriever::with_texts(&["ctx"]));
        let composer = composer(retriever, Arc::new(SlowGenerator::new(Duration::from_secs(5))))
            .with_generation_timeout(Duration::from_millis(20));

        let err = composer.compose(Intent::GeneralQuestion, "q").await.unwrap_err();
        assert!(matches!(err, EpisError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_top_k_is_configurable() {
        let retriever = Arc::new(StaticRetriever::with_texts(&["a", "b", "c", "d"]));
        let generator = Arc::new(ScriptedGenerator::new("ok"));
        let composer = composer(retriever.clone(), generator.clone()).with_top_k(3);

        composer.compose(Intent::GeneralQuestion, "q").await.unwrap();
        assert_eq!(retriever.last_k(), Some(3));
        let prompt = generator.last_prompt().unwrap();
        assert!(prompt.contains("\nc\n"));
        assert!(!prompt.contains("\nd\n"));
    }
}
