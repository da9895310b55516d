//! Embedding provider trait and factory.

use super::providers::{MockProvider, OpenAiProvider};
use osindex_core::{AppError, AppResult, EmbeddingSettings};
use std::sync::Arc;

/// Trait for embedding providers.
#[async_trait::async_trait]
pub trait EmbeddingProvider: Send + Sync + std::fmt::Debug {
    /// Get provider name (e.g., "mock", "openai")
    fn provider_name(&self) -> &str;

    /// Get model identifier
    fn model_name(&self) -> &str;

    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Generate embeddings for multiple texts in one call.
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>>;

    /// Generate embedding for a single text.
    async fn embed(&self, text: &str) -> AppResult<Vec<f32>> {
        let mut results = self.embed_batch(&[text.to_string()]).await?;
        results
            .pop()
            .ok_or_else(|| AppError::Embedding("No embedding returned".to_string()))
    }
}

/// Create an embedding provider producing vectors of `dimensions` floats.
pub fn create_provider(
    settings: &EmbeddingSettings,
    dimensions: usize,
    timeout_secs: u64,
) -> AppResult<Arc<dyn EmbeddingProvider>> {
    match settings.provider.as_str() {
        "mock" => Ok(Arc::new(MockProvider::new(dimensions))),

        "openai" => {
            let api_key = settings.resolve_api_key().ok_or_else(|| {
                AppError::Config(format!(
                    "API key not found in environment variable: {}",
                    settings.api_key_env
                ))
            })?;
            let provider = OpenAiProvider::new(
                &settings.endpoint,
                &settings.model,
                api_key,
                dimensions,
                timeout_secs,
            )?;
            Ok(Arc::new(provider))
        }

        other => Err(AppError::Config(format!(
            "Unknown embedding provider: '{}'. Supported providers: mock, openai",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(provider: &str) -> EmbeddingSettings {
        EmbeddingSettings {
            provider: provider.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_create_mock_provider() {
        let provider = create_provider(&settings("mock"), 64, 5).unwrap();
        assert_eq!(provider.provider_name(), "mock");
        assert_eq!(provider.dimensions(), 64);
    }

    #[test]
    fn test_create_unknown_provider() {
        let err = create_provider(&settings("gguf"), 64, 5).unwrap_err();
        assert!(err.to_string().contains("Unknown embedding provider"));
    }

    #[test]
    fn test_openai_without_key_is_config_error() {
        let mut s = settings("openai");
        s.api_key_env = "OSINDEX_TEST_UNSET_EMBEDDING_KEY".to_string();
        let err = create_provider(&s, 1536, 5).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[tokio::test]
    async fn test_default_embed_uses_batch() {
        let provider = create_provider(&settings("mock"), 32, 5).unwrap();
        let embedding = provider.embed("quarterly report").await.unwrap();
        assert_eq!(embedding.len(), 32);
    }
}
