//! Bulk document ingestion.

use crate::backend::SearchBackend;
use crate::types::{BulkPayload, BulkResponse};
use osindex_core::{AppError, AppResult};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone)]
pub struct IngestionService {
    backend: Arc<dyn SearchBackend>,
    dimension: usize,
}

impl IngestionService {
    pub fn new(backend: Arc<dyn SearchBackend>, dimension: usize) -> Self {
        Self { backend, dimension }
    }

    /// Check every supplied vector against the configured dimension.
    pub fn validate(&self, payload: &BulkPayload) -> AppResult<()> {
        for (position, op) in payload.operations.iter().enumerate() {
            if let Some(vector) = &op.document.vector {
                if vector.len() != self.dimension {
                    return Err(AppError::Validation(format!(
                        "Operation {} for index '{}' has a {}-dimensional vector, expected {}",
                        position,
                        op.index,
                        vector.len(),
                        self.dimension
                    )));
                }
            }
        }
        Ok(())
    }

    /// Write the payload in a single bulk request.
    ///
    /// The payload is validated locally first. A backend report with its
    /// `errors` flag set fails the whole call with `AppError::Ingestion`;
    /// items are not retried individually.
    #[instrument(skip(self, payload), fields(operations = payload.len()))]
    pub async fn insert(&self, payload: &BulkPayload) -> AppResult<BulkResponse> {
        self.validate(payload)?;

        if payload.is_empty() {
            debug!("Empty bulk payload, nothing to write");
            return Ok(BulkResponse::default());
        }

        let response = self
            .backend
            .bulk(payload)
            .await
            .map_err(|e| AppError::Ingestion(e.to_string()))?;

        if response.errors {
            let item_errors = response.item_errors();
            for error in &item_errors {
                warn!("Bulk item failed: {}", error);
            }
            return Err(AppError::Ingestion(format!(
                "Backend reported {} failed item(s) out of {}{}",
                item_errors.len(),
                payload.len(),
                item_errors
                    .first()
                    .map(|e| format!("; first: {}", e))
                    .unwrap_or_default()
            )));
        }

        info!("Inserted {} documents", payload.len());
        Ok(response)
    }
}
