//! EPIS Vector - Knowledge retrieval over a vector database
//!
//! Provides the embedding clients and the Qdrant-backed
//! [`KnowledgeRetriever`] used to fetch document fragments for RAG.

pub mod embedding;
pub mod qdrant_store;

pub use embedding::{create_embedding_client, EmbeddingClient, OllamaEmbedding, OpenAiEmbedding};
pub use qdrant_store::QdrantRetriever;

use epis_core::{AppConfig, KnowledgeRetriever, Result};
use std::sync::Arc;

/// Build the configured knowledge retriever
pub fn create_retriever(config: &AppConfig) -> Result<Arc<dyn KnowledgeRetriever>> {
    let embedder: Arc<dyn EmbeddingClient> = Arc::from(create_embedding_client(&config.llm)?);
    let retriever = QdrantRetriever::new(&config.database, embedder)?
        .with_query_prefix(config.llm.query_prefix().map(str::to_string));
    Ok(Arc::new(retriever))
}
