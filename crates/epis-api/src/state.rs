//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::middleware::Metrics;
use epis_core::{
    AnswerGenerator, AppConfig, KnowledgeRetriever, SqliteTicketStore, TicketRepository,
};
use epis_rag::{create_answer_generator, RequestHandler};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Question router and answer composer
    pub handler: RequestHandler,
    /// Prometheus collectors
    pub metrics: Metrics,
}

impl AppState {
    /// Create state from a ready request handler
    pub fn new(config: AppConfig, handler: RequestHandler) -> anyhow::Result<Self> {
        Ok(Self {
            config,
            start_time: Instant::now(),
            handler,
            metrics: Metrics::new()?,
        })
    }

    /// Create state with explicit collaborators
    pub fn with_collaborators(
        config: AppConfig,
        retriever: Arc<dyn KnowledgeRetriever>,
        generator: Arc<dyn AnswerGenerator>,
        tickets: Arc<dyn TicketRepository>,
    ) -> anyhow::Result<Self> {
        let handler = RequestHandler::from_config(&config, retriever, generator, tickets);
        Self::new(config, handler)
    }

    /// Connect every collaborator named in the configuration
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let tickets = SqliteTicketStore::connect(
            &config.database.sqlite_url,
            config.database.sqlite_pool_size,
        )
        .await?;

        let retriever = epis_vector::create_retriever(&config)?;
        tracing::info!(
            retriever = retriever.name(),
            collection = %config.database.qdrant_collection,
            "Knowledge retriever configured"
        );

        let generator: Arc<dyn AnswerGenerator> =
            Arc::from(create_answer_generator(&config.llm)?);
        tracing::info!(
            provider = ?config.llm.provider,
            model = generator.model(),
            "Answer generator configured"
        );

        Self::with_collaborators(config, retriever, generator, Arc::new(tickets))
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
