//! Metadata-driven deletion: remove every document that came from a given
//! source file.
//!
//! One invocation runs three strictly ordered phases:
//! 1. enumerate all indices,
//! 2. search the union of them for an exact file-name match,
//! 3. delete the matched ids.
//!
//! Deletes run concurrently up to the configured bound and are all attempted;
//! the returned [`DeletionReport`] says which succeeded. Nothing is rolled
//! back, and concurrent invocations are not coordinated.

use crate::backend::SearchBackend;
use crate::schema::IndexSchema;
use crate::types::{IndexTarget, SearchHit};
use futures::stream::{self, StreamExt};
use osindex_core::{AppError, AppResult, DeleteTarget, DeletionSettings};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// A delete-by-id that the backend refused.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedDeletion {
    pub index: String,
    pub id: String,
    pub error: String,
}

/// Outcome of one metadata deletion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeletionReport {
    pub file_name: String,
    /// Indices covered by the locate search
    pub searched_indices: Vec<String>,
    /// Documents returned by the locate search
    pub matched: usize,
    /// Total matches counted by the backend, possibly more than `matched`
    pub total_matches: Option<u64>,
    pub deleted: usize,
    pub failed: Vec<FailedDeletion>,
}

impl DeletionReport {
    /// The locate search returned fewer documents than the backend matched.
    pub fn is_truncated(&self) -> bool {
        self.total_matches
            .is_some_and(|total| total > self.matched as u64)
    }

    /// Every matching document was found and deleted.
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty() && self.deleted == self.matched && !self.is_truncated()
    }
}

#[derive(Debug, Clone)]
pub struct DeletionService {
    backend: Arc<dyn SearchBackend>,
    settings: DeletionSettings,
}

impl DeletionService {
    pub fn new(backend: Arc<dyn SearchBackend>, settings: DeletionSettings) -> Self {
        Self { backend, settings }
    }

    /// Locate-search body for an exact file-name match.
    pub fn locate_query(&self, file_name: &str) -> Value {
        let field = IndexSchema::file_name_exact_field();
        json!({
            "size": self.settings.search_cap,
            "_source": false,
            "query": {
                "term": {
                    field: {
                        "value": file_name
                    }
                }
            }
        })
    }

    /// Delete documents whose file name is `file_name`, using the configured
    /// [`DeleteTarget`]. `index` only matters for [`DeleteTarget::CallerIndex`].
    pub async fn delete_by_file_name(
        &self,
        index: &str,
        file_name: &str,
    ) -> AppResult<DeletionReport> {
        self.delete_by_file_name_with(index, file_name, self.settings.target)
            .await
    }

    #[instrument(skip(self), fields(cap = self.settings.search_cap))]
    pub async fn delete_by_file_name_with(
        &self,
        index: &str,
        file_name: &str,
        target: DeleteTarget,
    ) -> AppResult<DeletionReport> {
        if file_name.is_empty() {
            return Err(AppError::Validation(
                "Refusing to delete by an empty file name".to_string(),
            ));
        }

        let mut report = DeletionReport {
            file_name: file_name.to_string(),
            ..Default::default()
        };

        // Enumerate
        report.searched_indices = self
            .backend
            .list_indices()
            .await?
            .into_iter()
            .map(|summary| summary.name)
            .collect();
        if report.searched_indices.is_empty() {
            debug!("No indices present, nothing to delete");
            return Ok(report);
        }

        // Locate
        let response = self
            .backend
            .search(
                &IndexTarget::many(report.searched_indices.iter().cloned()),
                &self.locate_query(file_name),
            )
            .await?;
        let hits = response.hits;
        report.matched = hits.len();
        report.total_matches = response.total;
        if report.is_truncated() {
            warn!(
                "Locate search returned {} of {} matches (cap {}); run the deletion again to remove the rest",
                report.matched,
                response.total.unwrap_or_default(),
                self.settings.search_cap
            );
        }

        // Delete
        let plan = plan_deletes(index, &hits, target);
        let concurrency = self.settings.concurrency.max(1);
        let results: Vec<(String, String, AppResult<()>)> = stream::iter(plan)
            .map(|(index, id)| {
                let backend = Arc::clone(&self.backend);
                async move {
                    let result = backend.delete_by_id(&index, &id).await;
                    (index, id, result)
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        for (index, id, result) in results {
            match result {
                Ok(()) => report.deleted += 1,
                Err(e) => {
                    warn!("Failed to delete document '{}' from '{}': {}", id, index, e);
                    report.failed.push(FailedDeletion {
                        index,
                        id,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.failed.sort_by(|a, b| (&a.index, &a.id).cmp(&(&b.index, &b.id)));

        info!(
            "Deleted {}/{} documents for '{}' ({} failed)",
            report.deleted,
            report.matched,
            file_name,
            report.failed.len()
        );
        Ok(report)
    }
}

/// Pair each matched id with the index it will be deleted from.
fn plan_deletes(
    caller_index: &str,
    hits: &[SearchHit],
    target: DeleteTarget,
) -> Vec<(String, String)> {
    let mut per_index: BTreeMap<&str, usize> = BTreeMap::new();
    for hit in hits {
        *per_index.entry(hit.index.as_str()).or_default() += 1;
    }
    debug!("Matches per owning index: {:?}", per_index);

    match target {
        DeleteTarget::OwningIndex => hits
            .iter()
            .map(|hit| (hit.index.clone(), hit.id.clone()))
            .collect(),
        DeleteTarget::CallerIndex => {
            let elsewhere: usize = per_index
                .iter()
                .filter(|(name, _)| **name != caller_index)
                .map(|(_, count)| count)
                .sum();
            if elsewhere > 0 {
                warn!(
                    "{} matches live outside '{}' and will not be removed from their own index",
                    elsewhere, caller_index
                );
            }
            hits.iter()
                .map(|hit| (caller_index.to_string(), hit.id.clone()))
                .collect()
        }
    }
}
