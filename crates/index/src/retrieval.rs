//! Embedding-driven k-NN retrieval.

use crate::backend::SearchBackend;
use crate::embeddings::EmbeddingProvider;
use crate::schema::VECTOR_FIELD;
use crate::types::{IndexTarget, SearchHit};
use osindex_core::{AppError, AppResult};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Result count used when the caller does not pick one.
pub const DEFAULT_NUM_RESULTS: usize = 5;

#[derive(Debug, Clone)]
pub struct RetrievalService {
    backend: Arc<dyn SearchBackend>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl RetrievalService {
    pub fn new(backend: Arc<dyn SearchBackend>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self { backend, embedder }
    }

    /// k-NN body: `k` neighbours, `size` capped at the same count.
    pub fn knn_query(vector: &[f32], num_results: usize) -> Value {
        json!({
            "size": num_results,
            "query": {
                "knn": {
                    VECTOR_FIELD: {
                        "vector": vector,
                        "k": num_results
                    }
                }
            }
        })
    }

    /// Embed `query` and return the nearest documents across `target`.
    ///
    /// Hits come back in backend rank order, neither re-ranked nor
    /// deduplicated across indices. `num_results` is passed through as is.
    #[instrument(skip(self, query), fields(query_len = query.len(), target = %target))]
    pub async fn search(
        &self,
        query: &str,
        target: &IndexTarget,
        num_results: usize,
    ) -> AppResult<Vec<SearchHit>> {
        if target.is_empty() {
            return Err(AppError::Validation(
                "Search needs at least one index".to_string(),
            ));
        }

        let vector = self.embedder.embed(query).await?;
        debug!(
            "Embedded query with {} ({} dims)",
            self.embedder.model_name(),
            vector.len()
        );

        let response = self
            .backend
            .search(target, &Self::knn_query(&vector, num_results))
            .await?;
        debug!("Search returned {} hits", response.hits.len());
        Ok(response.hits)
    }
}
