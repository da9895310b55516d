//! Search backend abstraction.
//!
//! The services never talk HTTP directly; they go through [`SearchBackend`],
//! which wraps the connection and authentication to the engine. Requests are
//! stateless, so one `Arc<dyn SearchBackend>` is shared by every service.

pub mod memory;
pub mod opensearch;

pub use memory::MemoryBackend;
pub use opensearch::OpenSearchBackend;

use crate::types::{BulkPayload, BulkResponse, IndexSummary, IndexTarget, SearchResponse};
use osindex_core::AppResult;
use serde_json::Value;

/// Capability surface of the search backend.
///
/// Every failure is reported as `AppError::Backend`, carrying the backend's
/// own payload.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync + std::fmt::Debug {
    /// Backend name for logs (e.g., "opensearch", "memory")
    fn backend_name(&self) -> &str;

    /// Connectivity probe.
    async fn ping(&self) -> AppResult<()>;

    /// Whether the named index exists.
    async fn index_exists(&self, name: &str) -> AppResult<bool>;

    /// Create an index with the given settings/mappings body.
    async fn create_index(&self, name: &str, body: &Value) -> AppResult<()>;

    /// Delete an index and all its documents.
    async fn delete_index(&self, name: &str) -> AppResult<()>;

    /// Enumerate all indices.
    async fn list_indices(&self) -> AppResult<Vec<IndexSummary>>;

    /// Write a batch of documents in one request.
    async fn bulk(&self, payload: &BulkPayload) -> AppResult<BulkResponse>;

    /// Run a query body against one or more indices.
    async fn search(&self, target: &IndexTarget, body: &Value) -> AppResult<SearchResponse>;

    /// Delete a single document.
    async fn delete_by_id(&self, index: &str, id: &str) -> AppResult<()>;

    /// Make recent writes visible to search.
    async fn refresh(&self, target: &IndexTarget) -> AppResult<()> {
        let _ = target;
        Ok(())
    }
}
