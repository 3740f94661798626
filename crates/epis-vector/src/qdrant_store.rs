//! Qdrant implementation of the knowledge retriever
//!
//! Embeds the question and runs a similarity search over the document
//! fragment collection. The collection is built and maintained outside
//! this service; only reads happen here.
//!
//! Author: hephaex@gmail.com

use crate::embedding::EmbeddingClient;
use async_trait::async_trait;
use epis_core::{DatabaseConfig, EpisError, Fragment, KnowledgeRetriever, Result};
use qdrant_client::qdrant::{SearchPointsBuilder, Value};
use qdrant_client::Qdrant;
use std::collections::HashMap;
use std::sync::Arc;

/// Qdrant-backed knowledge retriever
pub struct QdrantRetriever {
    client: Qdrant,
    collection: String,
    content_field: String,
    source_field: String,
    embedder: Arc<dyn EmbeddingClient>,
    query_prefix: Option<String>,
}

impl QdrantRetriever {
    /// Create a new Qdrant connection
    pub fn new(config: &DatabaseConfig, embedder: Arc<dyn EmbeddingClient>) -> Result<Self> {
        let client = Qdrant::from_url(&config.qdrant_url)
            .build()
            .map_err(|e| EpisError::Retrieval(format!("Qdrant connection failed: {e}")))?;

        if embedder.dimension() != config.vector_dimension {
            tracing::warn!(
                embedder = embedder.dimension(),
                configured = config.vector_dimension,
                "Embedding dimension differs from configured vector dimension"
            );
        }

        Ok(Self {
            client,
            collection: config.qdrant_collection.clone(),
            content_field: config.content_field.clone(),
            source_field: config.source_field.clone(),
            embedder,
            query_prefix: None,
        })
    }

    /// Prefix prepended to every query before embedding
    pub fn with_query_prefix(mut self, prefix: Option<String>) -> Self {
        self.query_prefix = prefix.filter(|p| !p.is_empty());
        self
    }
}

/// Apply the embedding model's query prefix
fn prefixed_query(prefix: Option<&str>, query: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{query}"),
        None => query.to_string(),
    }
}

/// Build a fragment from a point payload; points without text are skipped
fn fragment_from_payload(
    payload: &HashMap<String, Value>,
    score: f32,
    content_field: &str,
    source_field: &str,
) -> Option<Fragment> {
    let content = payload
        .get(content_field)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())?;

    let source = payload
        .get(source_field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Some(Fragment {
        content,
        score,
        source,
    })
}

#[async_trait]
impl KnowledgeRetriever for QdrantRetriever {
    async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<Fragment>> {
        let text = prefixed_query(self.query_prefix.as_deref(), query);
        let vector = self.embedder.embed(&text).await?;

        let results = self
            .client
            .search_points(
                SearchPointsBuilder::new(&self.collection, vector, k as u64).with_payload(true),
            )
            .await
            .map_err(|e| EpisError::Retrieval(format!("Vector search failed: {e}")))?;

        let fragments: Vec<Fragment> = results
            .result
            .into_iter()
            .filter_map(|point| {
                fragment_from_payload(
                    &point.payload,
                    point.score,
                    &self.content_field,
                    &self.source_field,
                )
            })
            .collect();

        tracing::debug!(
            collection = %self.collection,
            requested = k,
            returned = fragments.len(),
            "Vector search completed"
        );

        Ok(fragments)
    }

    async fn is_ready(&self) -> bool {
        match self.client.collection_exists(&self.collection).await {
            Ok(exists) => exists,
            Err(e) => {
                tracing::warn!(error = %e, "Qdrant readiness check failed");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}
