//! Index lifecycle: existence checks, creation with the fixed schema, drop
//! and enumeration.

use crate::backend::SearchBackend;
use crate::schema::IndexSchema;
use crate::types::IndexSummary;
use osindex_core::AppResult;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct IndexManager {
    backend: Arc<dyn SearchBackend>,
    schema: IndexSchema,
}

impl IndexManager {
    pub fn new(backend: Arc<dyn SearchBackend>, schema: IndexSchema) -> Self {
        Self { backend, schema }
    }

    pub fn schema(&self) -> IndexSchema {
        self.schema
    }

    /// Existence check that reports backend failures.
    pub async fn try_index_exists(&self, name: &str) -> AppResult<bool> {
        self.backend.index_exists(name).await
    }

    /// Whether `name` exists.
    ///
    /// An indeterminate answer (transport or backend failure) is reported as
    /// `false`, so callers fall through to creation. Use
    /// [`IndexManager::try_index_exists`] to see the error.
    #[instrument(skip(self))]
    pub async fn index_exists(&self, name: &str) -> bool {
        match self.try_index_exists(name).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Existence check for index '{}' failed, treating as absent: {}", name, e);
                false
            }
        }
    }

    /// Create `name` with the fixed schema. Not idempotent: fails if the
    /// index already exists.
    #[instrument(skip(self), fields(dimension = self.schema.dimension))]
    pub async fn create_index(&self, name: &str) -> AppResult<()> {
        self.backend.create_index(name, &self.schema.to_body()).await?;
        info!("Created index '{}'", name);
        Ok(())
    }

    /// Create `name` unless it already exists. Returns whether it was created.
    pub async fn ensure_index(&self, name: &str) -> AppResult<bool> {
        if self.index_exists(name).await {
            debug!("Index '{}' already exists", name);
            return Ok(false);
        }
        self.create_index(name).await?;
        Ok(true)
    }

    /// Delete `name` and its documents.
    #[instrument(skip(self))]
    pub async fn drop_index(&self, name: &str) -> AppResult<()> {
        self.backend.delete_index(name).await?;
        info!("Deleted index '{}'", name);
        Ok(())
    }

    /// All indices currently present.
    pub async fn list_indices(&self) -> AppResult<Vec<IndexSummary>> {
        let indices = self.backend.list_indices().await?;
        debug!("Backend reports {} indices", indices.len());
        Ok(indices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;

    fn manager() -> (Arc<MemoryBackend>, IndexManager) {
        let backend = Arc::new(MemoryBackend::new());
        let manager = IndexManager::new(backend.clone(), IndexSchema::new(8));
        (backend, manager)
    }

    #[tokio::test]
    async fn test_exists_swallows_backend_failure() {
        let (backend, manager) = manager();
        manager.create_index("docs").await.unwrap();
        backend.set_unavailable(true);

        assert!(!manager.index_exists("docs").await);
        assert!(manager.try_index_exists("docs").await.is_err());
    }

    #[tokio::test]
    async fn test_ensure_index_creates_once() {
        let (_, manager) = manager();
        assert!(manager.ensure_index("docs").await.unwrap());
        assert!(!manager.ensure_index("docs").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_after_create_and_drop() {
        let (_, manager) = manager();
        manager.create_index("alpha").await.unwrap();
        manager.create_index("beta").await.unwrap();
        manager.drop_index("alpha").await.unwrap();

        let names: Vec<String> = manager
            .list_indices()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["beta"]);
    }

    #[tokio::test]
    async fn test_list_fails_when_backend_down() {
        let (backend, manager) = manager();
        backend.set_unavailable(true);
        assert!(manager.list_indices().await.unwrap_err().is_backend());
    }
}
