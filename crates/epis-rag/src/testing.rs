//! Deterministic stand-ins for the external collaborators
//!
//! Enabled for this crate's unit tests and, through the `test-utils`
//! feature, for integration tests of dependent crates.

use async_trait::async_trait;
use epis_core::{
    AnswerGenerator, EpisError, Fragment, KnowledgeRetriever, Result, Ticket, TicketRepository,
    TicketStatus,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Retriever returning a fixed fragment list, truncated to `k`
#[derive(Default)]
pub struct StaticRetriever {
    fragments: Vec<Fragment>,
    calls: AtomicUsize,
    last_k: Mutex<Option<usize>>,
}

impl StaticRetriever {
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self {
            fragments,
            ..Default::default()
        }
    }

    pub fn with_texts(texts: &[&str]) -> Self {
        let count = texts.len().max(1) as f32;
        Self::new(
            texts
                .iter()
                .enumerate()
                .map(|(i, text)| Fragment::new(*text, 1.0 - i as f32 / count))
                .collect(),
        )
    }

    /// Number of `retrieve` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `k` passed to the most recent call
    pub fn last_k(&self) -> Option<usize> {
        *self.last_k.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl KnowledgeRetriever for StaticRetriever {
    async fn retrieve(&self, _query: &str, k: usize) -> Result<Vec<Fragment>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_k.lock().unwrap_or_else(|e| e.into_inner()) = Some(k);
        Ok(self.fragments.iter().take(k).cloned().collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}

/// Retriever whose index is unreachable
pub struct FailingRetriever;

#[async_trait]
impl KnowledgeRetriever for FailingRetriever {
    async fn retrieve(&self, _query: &str, _k: usize) -> Result<Vec<Fragment>> {
        Err(EpisError::Retrieval("vector store unreachable".to_string()))
    }

    async fn is_ready(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "failing"
    }
}

/// Generator replying with a fixed text and recording prompts
pub struct ScriptedGenerator {
    reply: String,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl ScriptedGenerator {
    pub fn new(reply: impl Into<String>) -> Self {
        Self {
            reply: reply.into(),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    /// Number of `generate` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompt of the most recent call
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl AnswerGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().unwrap_or_else(|e| e.into_inner()) = Some(prompt.to_string());
        Ok(self.reply.clone())
    }

    fn model(&self) -> &str {
        "scripted"
    }
}

/// Generator that always fails
pub struct FailingGenerator;

#[async_trait]
impl AnswerGenerator for FailingGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(EpisError::Generation("model runtime unavailable".to_string()))
    }

    fn model(&self) -> &str {
        "failing"
    }
}

/// Generator that answers only after a delay
pub struct SlowGenerator {
    delay: Duration,
}

impl SlowGenerator {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl AnswerGenerator for SlowGenerator {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(self.delay).await;
        Ok("too late".to_string())
    }

    fn model(&self) -> &str {
        "slow"
    }
}

/// Ticket store whose database is unreachable
pub struct FailingTicketStore;

#[async_trait]
impl TicketRepository for FailingTicketStore {
    async fn create(&self, _description: &str, _status: TicketStatus) -> Result<Ticket> {
        Err(EpisError::Database("database is locked".to_string()))
    }

    async fn get(&self, _id: i64) -> Result<Option<Ticket>> {
        Err(EpisError::Database("database is locked".to_string()))
    }

    async fn count(&self) -> Result<i64> {
        Err(EpisError::Database("database is locked".to_string()))
    }

    async fn ping(&self) -> bool {
        false
    }
}
