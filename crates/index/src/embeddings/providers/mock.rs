//! Deterministic offline embedding provider.

use crate::embeddings::provider::EmbeddingProvider;
use osindex_core::{AppError, AppResult};

/// Feature-hashing provider for tests and dry runs.
///
/// Each lowercase word is hashed to a bucket with a hashed sign, then the
/// vector is normalized. Texts sharing words land close together, so k-NN
/// ordering is meaningful without a network call.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
    failure: Option<String>,
}

impl MockProvider {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            failure: None,
        }
    }

    /// Provider whose every call fails with `message`.
    pub fn failing(dimensions: usize, message: impl Into<String>) -> Self {
        Self {
            dimensions,
            failure: Some(message.into()),
        }
    }

    fn hash(word: &str, seed: u64) -> u64 {
        // FNV-1a
        word.bytes().fold(0xcbf2_9ce4_8422_2325 ^ seed, |acc, b| {
            (acc ^ b as u64).wrapping_mul(0x0000_0100_0000_01b3)
        })
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        let lower = text.to_lowercase();
        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            let bucket = (Self::hash(word, 0) % self.dimensions as u64) as usize;
            let sign = if Self::hash(word, 1) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        vector
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "hashing-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if let Some(message) = &self.failure {
            return Err(AppError::Embedding(message.clone()));
        }
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn test_unit_length_and_deterministic() {
        let provider = MockProvider::new(128);
        let first = provider.embed("Annual revenue report").await.unwrap();
        let second = provider.embed("annual revenue report").await.unwrap();

        assert_eq!(first.len(), 128);
        assert_eq!(first, second);
        let norm = dot(&first, &first).sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let provider = MockProvider::new(256);
        let query = provider.embed("revenue report").await.unwrap();
        let related = provider.embed("the revenue report for march").await.unwrap();
        let unrelated = provider.embed("hiking boots").await.unwrap();

        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = MockProvider::new(16);
        let embedding = provider.embed("").await.unwrap();
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_failing_provider() {
        let provider = MockProvider::failing(16, "quota exceeded");
        let err = provider.embed("anything").await.unwrap_err();
        assert!(matches!(err, AppError::Embedding(ref m) if m == "quota exceeded"));
    }
}
