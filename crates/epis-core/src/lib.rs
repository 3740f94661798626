//! EPIS Core - Domain models, traits, and shared types
//!
//! This crate defines the core abstractions used throughout the EPIS
//! support assistant:
//! - Intent and answer models
//! - Support ticket records and the SQLite ticket store
//! - Common error types
//! - Traits for the external collaborators (retriever, generator)
//! - Configuration management and localized messages

pub mod config;
pub mod messages;
pub mod tickets;

pub use config::{
    AppConfig, ConfigError, DatabaseConfig, LlmConfig, LlmProvider, LoggingConfig, RagConfig,
    RouterConfig, ServerConfig,
};
pub use messages::{Locale, Messages};
pub use tickets::{normalize_description, SqliteTicketStore, TicketRepository, TICKET_SENTINEL};

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for EPIS operations
#[derive(Error, Debug)]
pub enum EpisError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("{operation} timed out after {seconds}s")]
    Timeout { operation: String, seconds: u64 },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for EpisError {
    fn from(err: sqlx::Error) -> Self {
        EpisError::Database(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EpisError>;

// ============================================================================
// Intent and Answer Models
// ============================================================================

/// Classified purpose of a user question
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Asking for information held in the document corpus
    GeneralQuestion,
    /// Describing something that is broken or not working
    ProblemReport,
    /// Thanking or saying goodbye
    Farewell,
}

impl Intent {
    /// Stable snake_case name, used for logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GeneralQuestion => "general_question",
            Self::ProblemReport => "problem_report",
            Self::Farewell => "farewell",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply returned to the caller for every question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// Text shown to the user
    pub answer: String,

    /// Whether the user is expected to confirm the answer solved their issue
    pub follow_up_required: bool,
}

impl Answer {
    /// Answer that closes the exchange
    pub fn final_answer(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            follow_up_required: false,
        }
    }

    /// Answer that expects a confirmation from the user
    pub fn with_follow_up(answer: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            follow_up_required: true,
        }
    }
}

// ============================================================================
// Ticket Models
// ============================================================================

/// Lifecycle status of a support ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketStatus {
    Open,
}

impl TicketStatus {
    /// Value stored in the `status` column
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Open => "Open",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted support ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    /// Store-assigned, strictly increasing identifier
    pub id: i64,

    /// Problem description supplied by the user
    pub description: String,

    /// Status text as stored
    pub status: String,
}

// ============================================================================
// Retrieval Types
// ============================================================================

/// A document fragment returned by the knowledge retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fragment {
    /// Text content
    pub content: String,

    /// Relevance score (higher is better)
    pub score: f32,

    /// Originating document, when the index records one
    pub source: Option<String>,
}

impl Fragment {
    /// Create a fragment without source information
    pub fn new(content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            score,
            source: None,
        }
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Returns the document fragments most relevant to a query
#[async_trait::async_trait]
pub trait KnowledgeRetriever: Send + Sync {
    /// Retrieve up to `k` fragments, best first
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Fragment>>;

    /// Whether the backing index is reachable and populated
    async fn is_ready(&self) -> bool {
        true
    }

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Produces natural-language text from a prompt
#[async_trait::async_trait]
pub trait AnswerGenerator: Send + Sync {
    /// Generate a response
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier for logging
    fn model(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================
