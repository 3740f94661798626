//! Request handling
//!
//! The single entry point for a user question. Detects the ticket
//! command, otherwise classifies and composes, and turns every failure into
//! the generic apology so the caller always gets a well-formed [`Answer`].
//!
//! Author: hephaex@gmail.com

use crate::{IntentClassifier, ResponseComposer};
use epis_core::{
    normalize_description, Answer, AnswerGenerator, AppConfig, EpisError, Intent,
    KnowledgeRetriever, Messages, Result, TicketRepository, TicketStatus, TICKET_SENTINEL,
};
use std::sync::Arc;
use std::time::Duration;

/// Path a question takes through the handler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Ticket-creation command
    Ticket,
    /// Natural-language question with its classified intent
    Intent(Intent),
}

impl Route {
    /// Label used in logs and metrics
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ticket => "create_ticket",
            Self::Intent(intent) => intent.as_str(),
        }
    }
}

/// Outcome of handling one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handled {
    pub route: Route,
    pub answer: Answer,
    /// Whether the answer is the generic failure apology
    pub failed: bool,
}

/// Upper bound on handling one question unless configured otherwise
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(300);

/// Routes questions to ticket creation, RAG answers or canned replies
pub struct RequestHandler {
    classifier: IntentClassifier,
    composer: ResponseComposer,
    tickets: Arc<dyn TicketRepository>,
    messages: &'static Messages,
    request_timeout: Duration,
}

impl RequestHandler {
    /// Create a new handler
    pub fn new(
        classifier: IntentClassifier,
        composer: ResponseComposer,
        tickets: Arc<dyn TicketRepository>,
        messages: &'static Messages,
    ) -> Self {
        Self {
            classifier,
            composer,
            tickets,
            messages,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Set the bound on handling one question; expiry yields the apology
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Wire a handler from configuration and already-built collaborators
    pub fn from_config(
        config: &AppConfig,
        retriever: Arc<dyn KnowledgeRetriever>,
        generator: Arc<dyn AnswerGenerator>,
        tickets: Arc<dyn TicketRepository>,
    ) -> Self {
        let messages = Messages::for_locale(config.locale);
        let composer = ResponseComposer::new(retriever, generator, messages)
            .with_top_k(config.rag.top_k)
            .with_generation_timeout(Duration::from_secs(config.llm.timeout_secs));

        Self::new(
            IntentClassifier::from_config(&config.router),
            composer,
            tickets,
            messages,
        )
        .with_request_timeout(Duration::from_secs(config.server.request_timeout_secs))
    }

    /// Ticket store
    pub fn tickets(&self) -> &Arc<dyn TicketRepository> {
        &self.tickets
    }

    /// Knowledge retriever
    pub fn retriever(&self) -> &Arc<dyn KnowledgeRetriever> {
        self.composer.retriever()
    }

    /// Answer a question; never fails
    pub async fn handle(&self, question: &str) -> Answer {
        self.process(question).await.answer
    }

    /// Answer a question, reporting the route taken
    pub async fn process(&self, question: &str) -> Handled {
        let route = self.route(question);
        tracing::info!(route = route.label(), "Question routed");

        let outcome = tokio::time::timeout(self.request_timeout, self.execute(route, question))
            .await
            .unwrap_or_else(|_| {
                Err(EpisError::Timeout {
                    operation: "request".to_string(),
                    seconds: self.request_timeout.as_secs(),
                })
            });

        match outcome {
            Ok(answer) => Handled {
                route,
                answer,
                failed: false,
            },
            Err(e) => {
                tracing::error!(route = route.label(), error = %e, "Failed to answer question");
                Handled {
                    route,
                    answer: Answer::final_answer(self.messages.internal_error),
                    failed: true,
                }
            }
        }
    }

    /// Decide how a question is handled
    pub fn route(&self, question: &str) -> Route {
        if question.starts_with(TICKET_SENTINEL) {
            Route::Ticket
        } else {
            Route::Intent(self.classifier.classify(question))
        }
    }

    async fn execute(&self, route: Route, question: &str) -> Result<Answer> {
        match route {
            Route::Ticket => {
                let description = question
                    .split_once(':')
                    .map(|(_, rest)| rest)
                    .unwrap_or_default();
                let confirmation = self.create_ticket(description).await?;
                Ok(Answer::final_answer(confirmation))
            }
            Route::Intent(intent) => self.composer.compose(intent, question).await,
        }
    }

    /// Store a ticket and return the confirmation shown to the user
    pub async fn create_ticket(&self, raw_description: &str) -> Result<String> {
        let description = normalize_description(raw_description, self.messages.ticket_placeholder);
        let ticket = self.tickets.create(&description, TicketStatus::Open).await?;
        Ok(self.messages.ticket_created(ticket.id, &ticket.description))
    }
}
