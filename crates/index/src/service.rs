//! Facade exposing the public index operations over one shared backend.

use crate::backend::{OpenSearchBackend, SearchBackend};
use crate::deletion::{DeletionReport, DeletionService};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::ingest::IngestionService;
use crate::manager::IndexManager;
use crate::retrieval::RetrievalService;
use crate::schema::IndexSchema;
use crate::types::{BulkPayload, BulkResponse, IndexSummary, IndexTarget, SearchHit};
use osindex_core::{AppConfig, AppError, AppResult};
use std::sync::Arc;

/// Index lifecycle, ingestion, metadata deletion and retrieval behind one
/// handle. Cheap to clone; all clones share the same backend.
///
/// Retrieval is only available once an embedding provider is attached.
#[derive(Debug, Clone)]
pub struct IndexService {
    backend: Arc<dyn SearchBackend>,
    manager: IndexManager,
    ingestion: IngestionService,
    deletion: DeletionService,
    retrieval: Option<RetrievalService>,
}

impl IndexService {
    /// Wire the index services over an existing backend.
    pub fn new(backend: Arc<dyn SearchBackend>, config: &AppConfig) -> Self {
        Self {
            manager: IndexManager::new(backend.clone(), IndexSchema::new(config.dimension)),
            ingestion: IngestionService::new(backend.clone(), config.dimension),
            deletion: DeletionService::new(backend.clone(), config.deletion.clone()),
            retrieval: None,
            backend,
        }
    }

    /// Attach the embedding provider used by [`IndexService::search`].
    pub fn with_embedder(mut self, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        self.retrieval = Some(RetrievalService::new(self.backend.clone(), embedder));
        self
    }

    /// Build the REST backend from configuration and verify it is reachable.
    pub async fn connect_backend(config: &AppConfig) -> AppResult<Self> {
        let backend = OpenSearchBackend::new(config)?;
        backend.verify().await?;
        Ok(Self::new(Arc::new(backend), config))
    }

    /// [`IndexService::connect_backend`] plus the configured embedding
    /// provider.
    pub async fn connect(config: &AppConfig) -> AppResult<Self> {
        let embedder = create_provider(
            &config.embedding,
            config.dimension,
            config.request_timeout_secs,
        )?;
        Ok(Self::connect_backend(config).await?.with_embedder(embedder))
    }

    pub fn backend(&self) -> &Arc<dyn SearchBackend> {
        &self.backend
    }

    pub async fn list_indices(&self) -> AppResult<Vec<IndexSummary>> {
        self.manager.list_indices().await
    }

    pub async fn drop(&self, name: &str) -> AppResult<()> {
        self.manager.drop_index(name).await
    }

    pub async fn create_index(&self, name: &str) -> AppResult<()> {
        self.manager.create_index(name).await
    }

    pub async fn ensure_index(&self, name: &str) -> AppResult<bool> {
        self.manager.ensure_index(name).await
    }

    /// `false` both when the index is absent and when the check failed.
    pub async fn index_exists(&self, name: &str) -> bool {
        self.manager.index_exists(name).await
    }

    pub async fn insert(&self, payload: &BulkPayload) -> AppResult<BulkResponse> {
        self.ingestion.insert(payload).await
    }

    pub async fn delete_by_file_name(
        &self,
        index: &str,
        file_name: &str,
    ) -> AppResult<DeletionReport> {
        self.deletion.delete_by_file_name(index, file_name).await
    }

    pub async fn search(
        &self,
        query: &str,
        target: &IndexTarget,
        num_results: usize,
    ) -> AppResult<Vec<SearchHit>> {
        let retrieval = self.retrieval.as_ref().ok_or_else(|| {
            AppError::Config("No embedding provider configured for search".to_string())
        })?;
        retrieval.search(query, target, num_results).await
    }

    /// Make recent writes to `target` visible to search.
    pub async fn refresh(&self, target: &IndexTarget) -> AppResult<()> {
        self.backend.refresh(target).await
    }

    pub fn manager(&self) -> &IndexManager {
        &self.manager
    }

    pub fn deletion(&self) -> &DeletionService {
        &self.deletion
    }
}
