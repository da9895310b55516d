//! Vector index lifecycle and retrieval for retrieval-augmented search.
//!
//! Creates and drops k-NN indices with a fixed schema, ingests bulk
//! payloads, purges documents by originating file name across every index,
//! and answers free-text queries with embedding-driven nearest-neighbour
//! search.
//!
//! # Example
//! ```no_run
//! use osindex::{IndexService, IndexTarget};
//! use osindex_core::AppConfig;
//!
//! # async fn example() -> osindex_core::AppResult<()> {
//! let config = AppConfig::load()?;
//! let service = IndexService::connect(&config).await?;
//!
//! service.ensure_index("docs").await?;
//! let hits = service.search("quarterly revenue", &IndexTarget::one("docs"), 5).await?;
//! for hit in hits {
//!     println!("{} {:?}", hit.id, hit.score);
//! }
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod deletion;
pub mod embeddings;
pub mod ingest;
pub mod manager;
pub mod retrieval;
pub mod schema;
pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use backend::{MemoryBackend, OpenSearchBackend, SearchBackend};
pub use deletion::{DeletionReport, DeletionService, FailedDeletion};
pub use embeddings::{create_provider, EmbeddingProvider, MockProvider, OpenAiProvider};
pub use ingest::IngestionService;
pub use manager::IndexManager;
pub use retrieval::{RetrievalService, DEFAULT_NUM_RESULTS};
pub use schema::IndexSchema;
pub use service::IndexService;
pub use types::{
    BulkAction, BulkOperation, BulkPayload, BulkResponse, Document, IndexSummary, IndexTarget,
    SearchHit, SearchResponse,
};
