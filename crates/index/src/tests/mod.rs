//! End-to-end scenarios over the in-memory backend.


use crate::backend::MemoryBackend;
use crate::embeddings::MockProvider;
use crate::service::IndexService;
use osindex_core::{AppConfig, DeleteTarget, EmbeddingSettings};
use std::sync::Arc;

/// Service over a fresh in-memory backend with mock embeddings.
fn service_with(dimension: usize, target: DeleteTarget) -> (Arc<MemoryBackend>, IndexService) {
    let mut config = AppConfig {
        dimension,
        embedding: EmbeddingSettings {
            provider: "mock".to_string(),
            ..Default::default()
        },
        ..Default::default()
    };
    config.deletion.target = target;

    let backend = Arc::new(MemoryBackend::new());
    let embedder = Arc::new(MockProvider::new(dimension));
    let service = IndexService::new(backend.clone(), &config).with_embedder(embedder);
    (backend, service)
}
