//! In-process backend.
//!
//! Honors the same contracts as the REST backend for the subset of the
//! query language the services emit: `term` on a keyword sub-field, `knn`
//! on the vector field, and `match_all`. Error payloads mimic the engine's
//! JSON error bodies.

use super::SearchBackend;
use crate::schema::{
    IndexSchema, EXACT_SUBFIELD, FILE_NAME_FIELD, FILE_NAME_KEYWORD_CAP, SOURCE_FIELD,
    SOURCE_KEYWORD_CAP, TEXT_FIELD, TEXT_KEYWORD_CAP, VECTOR_FIELD,
};
use crate::types::{
    BulkAction, BulkPayload, BulkResponse, IndexSummary, IndexTarget, SearchHit, SearchResponse,
};
use async_trait::async_trait;
use osindex_core::{AppError, AppResult};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

const DEFAULT_SEARCH_SIZE: usize = 10;

#[derive(Debug, Default)]
struct MemoryIndex {
    dimension: Option<usize>,
    /// Documents in insertion order
    docs: Vec<(String, Value)>,
}

impl MemoryIndex {
    fn position(&self, id: &str) -> Option<usize> {
        self.docs.iter().position(|(doc_id, _)| doc_id == id)
    }
}

/// Backend keeping every index in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    indices: RwLock<BTreeMap<String, MemoryIndex>>,
    unavailable: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an outage: every call fails with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of documents stored in `index` (0 when it does not exist).
    pub fn document_count(&self, index: &str) -> usize {
        self.indices
            .read()
            .map(|indices| indices.get(index).map_or(0, |i| i.docs.len()))
            .unwrap_or(0)
    }

    /// Ids of documents in `index` whose file name equals `file_name`.
    pub fn ids_with_file_name(&self, index: &str, file_name: &str) -> Vec<String> {
        self.indices
            .read()
            .map(|indices| {
                indices
                    .get(index)
                    .map(|i| {
                        i.docs
                            .iter()
                            .filter(|(_, src)| {
                                src.get(FILE_NAME_FIELD).and_then(Value::as_str) == Some(file_name)
                            })
                            .map(|(id, _)| id.clone())
                            .collect()
                    })
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    fn check_available(&self) -> AppResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::transport("connection refused"));
        }
        Ok(())
    }

    fn read(&self) -> AppResult<std::sync::RwLockReadGuard<'_, BTreeMap<String, MemoryIndex>>> {
        self.indices
            .read()
            .map_err(|_| AppError::Other("Memory backend lock poisoned".to_string()))
    }

    fn write(&self) -> AppResult<std::sync::RwLockWriteGuard<'_, BTreeMap<String, MemoryIndex>>> {
        self.indices
            .write()
            .map_err(|_| AppError::Other("Memory backend lock poisoned".to_string()))
    }
}

fn error_body(kind: &str, reason: String, status: u16) -> AppError {
    AppError::backend(
        status,
        json!({
            "error": {"type": kind, "reason": reason},
            "status": status
        })
        .to_string(),
    )
}

fn index_not_found(name: &str) -> AppError {
    error_body("index_not_found_exception", format!("no such index [{}]", name), 404)
}

fn validate_index_name(name: &str) -> AppResult<()> {
    let invalid = name.is_empty()
        || name.starts_with(['_', '-', '+'])
        || name
            .chars()
            .any(|c| c.is_uppercase() || c.is_whitespace() || ",*?\"<>|/\\#:".contains(c));
    if invalid {
        return Err(error_body(
            "invalid_index_name_exception",
            format!("Invalid index name [{}]", name),
            400,
        ));
    }
    Ok(())
}

/// `ignore_above` cap for a `<field>.keyword` path, if it is one of ours.
fn keyword_cap(field: &str) -> Option<(&'static str, usize)> {
    let (base, sub) = field.rsplit_once('.')?;
    if sub != EXACT_SUBFIELD {
        return None;
    }
    match base {
        TEXT_FIELD => Some((TEXT_FIELD, TEXT_KEYWORD_CAP)),
        SOURCE_FIELD => Some((SOURCE_FIELD, SOURCE_KEYWORD_CAP)),
        FILE_NAME_FIELD => Some((FILE_NAME_FIELD, FILE_NAME_KEYWORD_CAP)),
        _ => None,
    }
}

/// Cosine similarity mapped to the engine's `cosinesimil` score range [0, 1].
fn cosine_score(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (1.0 + dot / (norm_a * norm_b)) / 2.0
}

fn as_vector(value: &Value) -> Option<Vec<f32>> {
    value
        .as_array()?
        .iter()
        .map(|v| v.as_f64().map(|f| f as f32))
        .collect()
}

enum Query {
    MatchAll,
    Term { field: &'static str, cap: usize, value: String },
    Knn { vector: Vec<f32>, k: usize },
}

fn parsing_error(reason: impl Into<String>) -> AppError {
    error_body("parsing_exception", reason.into(), 400)
}

fn parse_query(body: &Value) -> AppResult<Query> {
    let query = match body.get("query") {
        None => return Ok(Query::MatchAll),
        Some(q) => q,
    };

    if query.get("match_all").is_some() {
        return Ok(Query::MatchAll);
    }

    if let Some(term) = query.get("term").and_then(Value::as_object) {
        let (field, clause) = term
            .iter()
            .next()
            .ok_or_else(|| parsing_error("[term] query is empty"))?;
        let (base, cap) = keyword_cap(field).ok_or_else(|| {
            parsing_error(format!("[term] on unsupported field [{}]", field))
        })?;
        let value = clause
            .get("value")
            .unwrap_or(clause)
            .as_str()
            .ok_or_else(|| parsing_error("[term] value must be a string"))?;
        return Ok(Query::Term {
            field: base,
            cap,
            value: value.to_string(),
        });
    }

    if let Some(knn) = query.get("knn").and_then(Value::as_object) {
        let clause = knn
            .get(VECTOR_FIELD)
            .ok_or_else(|| parsing_error(format!("[knn] requires field [{}]", VECTOR_FIELD)))?;
        let vector = clause
            .get("vector")
            .and_then(as_vector)
            .ok_or_else(|| parsing_error("[knn] vector must be an array of numbers"))?;
        let k = clause
            .get("k")
            .and_then(Value::as_u64)
            .ok_or_else(|| parsing_error("[knn] requires a positive k"))?;
        if k == 0 {
            return Err(error_body(
                "illegal_argument_exception",
                "[k] must be greater than 0".to_string(),
                400,
            ));
        }
        return Ok(Query::Knn {
            vector,
            k: k as usize,
        });
    }

    Err(parsing_error(format!("unsupported query: {}", query)))
}

#[async_trait]
impl SearchBackend for MemoryBackend {
    fn backend_name(&self) -> &str {
        "memory"
    }

    async fn ping(&self) -> AppResult<()> {
        self.check_available()
    }

    async fn index_exists(&self, name: &str) -> AppResult<bool> {
        self.check_available()?;
        Ok(self.read()?.contains_key(name))
    }

    async fn create_index(&self, name: &str, body: &Value) -> AppResult<()> {
        self.check_available()?;
        validate_index_name(name)?;
        let mut indices = self.write()?;
        if indices.contains_key(name) {
            return Err(error_body(
                "resource_already_exists_exception",
                format!("index [{}] already exists", name),
                400,
            ));
        }
        indices.insert(
            name.to_string(),
            MemoryIndex {
                dimension: IndexSchema::dimension_of(body),
                docs: Vec::new(),
            },
        );
        Ok(())
    }

    async fn delete_index(&self, name: &str) -> AppResult<()> {
        self.check_available()?;
        match self.write()?.remove(name) {
            Some(_) => Ok(()),
            None => Err(index_not_found(name)),
        }
    }

    async fn list_indices(&self) -> AppResult<Vec<IndexSummary>> {
        self.check_available()?;
        Ok(self
            .read()?
            .iter()
            .map(|(name, index)| IndexSummary {
                name: name.clone(),
                health: Some("green".to_string()),
                status: Some("open".to_string()),
                docs_count: Some(index.docs.len().to_string()),
                store_size: None,
            })
            .collect())
    }

    async fn bulk(&self, payload: &BulkPayload) -> AppResult<BulkResponse> {
        self.check_available()?;
        let mut indices = self.write()?;
        let mut items = Vec::with_capacity(payload.len());
        let mut errors = false;

        for op in &payload.operations {
            let verb = op.action.as_str();
            let id = op
                .id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().simple().to_string());

            let Some(index) = indices.get_mut(&op.index) else {
                errors = true;
                items.push(json!({verb: {
                    "_index": op.index, "_id": id, "status": 404,
                    "error": {"type": "index_not_found_exception",
                              "reason": format!("no such index [{}]", op.index)}
                }}));
                continue;
            };

            if let (Some(dim), Some(vector)) = (index.dimension, &op.document.vector) {
                if vector.len() != dim {
                    errors = true;
                    items.push(json!({verb: {
                        "_index": op.index, "_id": id, "status": 400,
                        "error": {"type": "mapper_parsing_exception",
                                  "reason": format!("Vector dimension mismatch. Expected: {}, Given: {}", dim, vector.len())}
                    }}));
                    continue;
                }
            }

            let source = serde_json::to_value(&op.document)?;
            match (index.position(&id), op.action) {
                (Some(_), BulkAction::Create) => {
                    errors = true;
                    items.push(json!({verb: {
                        "_index": op.index, "_id": id, "status": 409,
                        "error": {"type": "version_conflict_engine_exception",
                                  "reason": format!("[{}]: document already exists", id)}
                    }}));
                }
                (Some(pos), BulkAction::Index) => {
                    index.docs[pos].1 = source;
                    items.push(json!({verb: {
                        "_index": op.index, "_id": id, "status": 200, "result": "updated"
                    }}));
                }
                (None, _) => {
                    index.docs.push((id.clone(), source));
                    items.push(json!({verb: {
                        "_index": op.index, "_id": id, "status": 201, "result": "created"
                    }}));
                }
            }
        }

        Ok(BulkResponse {
            took: 0,
            errors,
            items,
        })
    }

    async fn search(&self, target: &IndexTarget, body: &Value) -> AppResult<SearchResponse> {
        self.check_available()?;
        let query = parse_query(body)?;
        let size = body
            .get("size")
            .and_then(Value::as_u64)
            .map_or(DEFAULT_SEARCH_SIZE, |s| s as usize);

        let indices = self.read()?;
        let mut candidates: Vec<SearchHit> = Vec::new();
        for name in target.names() {
            let index = indices.get(name).ok_or_else(|| index_not_found(name))?;
            for (id, source) in &index.docs {
                let score = match &query {
                    Query::MatchAll => Some(1.0),
                    Query::Term { field, cap, value } => {
                        let stored = source.get(*field).and_then(Value::as_str);
                        match stored {
                            Some(s) if s.chars().count() <= *cap && s == value.as_str() => Some(1.0),
                            _ => None,
                        }
                    }
                    Query::Knn { vector, .. } => source
                        .get(VECTOR_FIELD)
                        .and_then(as_vector)
                        .map(|stored| cosine_score(vector, &stored)),
                };
                if let Some(score) = score {
                    candidates.push(SearchHit {
                        index: name.clone(),
                        id: id.clone(),
                        score: Some(score),
                        source: source.clone(),
                    });
                }
            }
        }

        if let Query::Knn { k, .. } = query {
            candidates.sort_by(|a, b| {
                b.score
                    .partial_cmp(&a.score)
                    .unwrap_or(std::cmp::Ordering::Equal)
            });
            candidates.truncate(k);
        }

        let total = candidates.len() as u64;
        candidates.truncate(size);

        Ok(SearchResponse {
            took: 0,
            total: Some(total),
            hits: candidates,
        })
    }

    async fn delete_by_id(&self, index: &str, id: &str) -> AppResult<()> {
        self.check_available()?;
        let mut indices = self.write()?;
        let stored = indices.get_mut(index).ok_or_else(|| index_not_found(index))?;
        match stored.position(id) {
            Some(pos) => {
                stored.docs.remove(pos);
                Ok(())
            }
            None => Err(AppError::backend(
                404,
                json!({"_index": index, "_id": id, "result": "not_found"}).to_string(),
            )),
        }
    }

    async fn refresh(&self, target: &IndexTarget) -> AppResult<()> {
        self.check_available()?;
        let indices = self.read()?;
        match target.names().iter().find(|n| !indices.contains_key(n.as_str())) {
            Some(missing) => Err(index_not_found(missing)),
            None => Ok(()),
        }
    }
}
