//! OpenAI-compatible embedding provider.
//!
//! Calls `POST {endpoint}/embeddings` with `{"model", "input"}` and reads
//! `data[].embedding`. Works with any server exposing the same API shape.
//! Failures are reported once as `AppError::Embedding`; there is no retry.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use osindex_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tracing::{debug, instrument};

const EMBEDDINGS_PATH: &str = "/embeddings";

/// Embedding provider for OpenAI-style `/embeddings` APIs.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
    dimensions: usize,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl OpenAiProvider {
    /// Build the provider. No request is sent.
    pub fn new(
        endpoint: &str,
        model: &str,
        api_key: String,
        dimensions: usize,
        timeout_secs: u64,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Config(format!("Failed to create HTTP client for embeddings: {}", e))
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}{}", self.endpoint, EMBEDDINGS_PATH);
        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| AppError::Embedding(format!("Failed to reach embedding API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Embedding(format!(
                "Embedding API error ({}): {}",
                status, body
            )));
        }

        let mut body: EmbeddingResponse = response.json().await.map_err(|e| {
            AppError::Embedding(format!("Failed to parse embedding response: {}", e))
        })?;

        if body.data.len() != texts.len() {
            return Err(AppError::Embedding(format!(
                "Embedding API returned {} vectors for {} inputs",
                body.data.len(),
                texts.len()
            )));
        }

        body.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = body.data.into_iter().map(|d| d.embedding).collect();

        if let Some(bad) = embeddings.iter().find(|e| e.len() != self.dimensions) {
            return Err(AppError::Embedding(format!(
                "Unexpected embedding dimensions: got {}, expected {}",
                bad.len(),
                self.dimensions
            )));
        }

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer, dimensions: usize) -> OpenAiProvider {
        OpenAiProvider::new(
            &format!("{}/v1/", server.uri()),
            "text-embedding-3-small",
            "sk-test".to_string(),
            dimensions,
            5,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_embed_single() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/embeddings"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_json(json!({
                "model": "text-embedding-3-small",
                "input": ["hello"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "object": "list",
                "data": [{"object": "embedding", "index": 0, "embedding": [0.5, 0.25, 0.125]}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let embedding = provider(&server, 3).embed("hello").await.unwrap();
        assert_eq!(embedding, vec![0.5, 0.25, 0.125]);
    }

    #[tokio::test]
    async fn test_batch_is_reordered_by_index() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [
                    {"index": 1, "embedding": [2.0]},
                    {"index": 0, "embedding": [1.0]}
                ]
            })))
            .mount(&server)
            .await;

        let texts = vec!["a".to_string(), "b".to_string()];
        let embeddings = provider(&server, 1).embed_batch(&texts).await.unwrap();
        assert_eq!(embeddings, vec![vec![1.0], vec![2.0]]);
    }

    #[tokio::test]
    async fn test_api_error_is_embedding_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429).set_body_string(r#"{"error":{"message":"rate limited"}}"#),
            )
            .expect(1)
            .mount(&server)
            .await;

        let err = provider(&server, 3).embed("hello").await.unwrap_err();
        match err {
            AppError::Embedding(message) => assert!(message.contains("rate limited")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_dimension_mismatch_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"index": 0, "embedding": [1.0, 2.0]}]
            })))
            .mount(&server)
            .await;

        let err = provider(&server, 1536).embed("hello").await.unwrap_err();
        assert!(err.to_string().contains("expected 1536"));
    }

    #[test]
    fn test_debug_hides_api_key() {
        let provider =
            OpenAiProvider::new("https://api.openai.com/v1", "m", "sk-secret".to_string(), 8, 5)
                .unwrap();
        assert!(!format!("{:?}", provider).contains("sk-secret"));
    }
}
