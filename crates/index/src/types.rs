//! Data model shared by the services and the backend implementations.

use osindex_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A unit of ingested content.
///
/// Field names match the index schema (see [`crate::schema`]). Any extra
/// keys are carried through untouched in `metadata`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Dense embedding; absent vectors are left to the backend default
    #[serde(
        rename = "langchain_vector",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub vector: Option<Vec<f32>>,

    /// Primary text content
    #[serde(rename = "langchain_text", default)]
    pub text: String,

    /// Source reference (URL, path, page...)
    #[serde(rename = "langchain_source", default)]
    pub source: String,

    /// Originating file name, the metadata deletion key
    #[serde(rename = "langchain_file_name", default)]
    pub file_name: String,

    /// Additional stored fields
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

impl Document {
    pub fn new(
        vector: Vec<f32>,
        text: impl Into<String>,
        source: impl Into<String>,
        file_name: impl Into<String>,
    ) -> Self {
        Self {
            vector: Some(vector),
            text: text.into(),
            source: source.into(),
            file_name: file_name.into(),
            metadata: Map::new(),
        }
    }
}

/// Bulk action verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BulkAction {
    /// Create or replace
    Index,
    /// Create, failing if the id already exists
    Create,
}

impl BulkAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            BulkAction::Index => "index",
            BulkAction::Create => "create",
        }
    }
}

/// One (action, document) pair of a bulk write.
#[derive(Debug, Clone, PartialEq)]
pub struct BulkOperation {
    pub action: BulkAction,
    pub index: String,
    /// Explicit id; the backend assigns one when absent
    pub id: Option<String>,
    pub document: Document,
}

impl BulkOperation {
    /// `index` action with a backend-assigned id.
    pub fn index(index: impl Into<String>, document: Document) -> Self {
        Self {
            action: BulkAction::Index,
            index: index.into(),
            id: None,
            document,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    fn action_line(&self) -> Value {
        let mut meta = Map::new();
        meta.insert("_index".to_string(), Value::String(self.index.clone()));
        if let Some(id) = &self.id {
            meta.insert("_id".to_string(), Value::String(id.clone()));
        }
        let mut line = Map::new();
        line.insert(self.action.as_str().to_string(), Value::Object(meta));
        Value::Object(line)
    }
}

/// Ordered sequence of bulk operations, sent in a single request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkPayload {
    pub operations: Vec<BulkOperation>,
}

impl BulkPayload {
    pub fn new(operations: Vec<BulkOperation>) -> Self {
        Self { operations }
    }

    pub fn push(&mut self, operation: BulkOperation) {
        self.operations.push(operation);
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Render the newline-delimited body expected by `_bulk`.
    pub fn to_ndjson(&self) -> AppResult<String> {
        let mut body = String::new();
        for op in &self.operations {
            body.push_str(&serde_json::to_string(&op.action_line())?);
            body.push('\n');
            body.push_str(&serde_json::to_string(&op.document)?);
            body.push('\n');
        }
        Ok(body)
    }

    /// Parse a newline-delimited bulk body (action line, document line, ...).
    ///
    /// Blank lines are ignored. Every action must name its `_index`.
    pub fn from_ndjson(input: &str) -> AppResult<Self> {
        let mut lines = input.lines().map(str::trim).filter(|l| !l.is_empty());
        let mut operations = Vec::new();
        let mut line_no = 0usize;

        while let Some(action_line) = lines.next() {
            line_no += 1;
            let action_value: Value = serde_json::from_str(action_line).map_err(|e| {
                AppError::Validation(format!("Bulk line {}: invalid JSON: {}", line_no, e))
            })?;

            let (action, meta) = match action_value.as_object() {
                Some(obj) if obj.len() == 1 => {
                    let (verb, meta) = obj.iter().next().ok_or_else(|| {
                        AppError::Validation(format!("Bulk line {}: empty action", line_no))
                    })?;
                    let action = match verb.as_str() {
                        "index" => BulkAction::Index,
                        "create" => BulkAction::Create,
                        other => {
                            return Err(AppError::Validation(format!(
                                "Bulk line {}: unsupported action '{}'",
                                line_no, other
                            )))
                        }
                    };
                    (action, meta.clone())
                }
                _ => {
                    return Err(AppError::Validation(format!(
                        "Bulk line {}: expected a single-key action object",
                        line_no
                    )))
                }
            };

            let index = meta
                .get("_index")
                .and_then(Value::as_str)
                .ok_or_else(|| {
                    AppError::Validation(format!("Bulk line {}: action has no _index", line_no))
                })?
                .to_string();
            let id = meta.get("_id").and_then(Value::as_str).map(str::to_string);

            line_no += 1;
            let doc_line = lines.next().ok_or_else(|| {
                AppError::Validation(format!(
                    "Bulk line {}: action without a document line",
                    line_no
                ))
            })?;
            let document: Document = serde_json::from_str(doc_line).map_err(|e| {
                AppError::Validation(format!("Bulk line {}: invalid document: {}", line_no, e))
            })?;

            operations.push(BulkOperation {
                action,
                index,
                id,
                document,
            });
        }

        Ok(Self { operations })
    }
}

/// Backend answer to a bulk write.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BulkResponse {
    #[serde(default)]
    pub took: u64,
    /// Set by the backend when at least one item failed
    #[serde(default)]
    pub errors: bool,
    #[serde(default)]
    pub items: Vec<Value>,
}

impl BulkResponse {
    /// Ids assigned to the written documents, in request order.
    pub fn ids(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| item.as_object()?.values().next()?.get("_id")?.as_str())
            .map(str::to_string)
            .collect()
    }

    /// Error payloads of the items that failed.
    pub fn item_errors(&self) -> Vec<String> {
        self.items
            .iter()
            .filter_map(|item| item.as_object()?.values().next()?.get("error"))
            .map(Value::to_string)
            .collect()
    }
}

/// One search hit: owning index, id, similarity score and stored fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_score", default)]
    pub score: Option<f32>,
    #[serde(rename = "_source", default)]
    pub source: Value,
}

impl SearchHit {
    /// Stored originating file name, when present.
    pub fn file_name(&self) -> Option<&str> {
        self.source
            .get(crate::schema::FILE_NAME_FIELD)
            .and_then(Value::as_str)
    }

    /// Stored primary text, when present.
    pub fn text(&self) -> Option<&str> {
        self.source.get(crate::schema::TEXT_FIELD).and_then(Value::as_str)
    }
}

/// Result set of a search, in backend rank order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchResponse {
    pub took: u64,
    pub total: Option<u64>,
    pub hits: Vec<SearchHit>,
}

impl SearchResponse {
    /// Parse the backend's `_search` response body.
    pub fn from_value(value: &Value) -> AppResult<Self> {
        let took = value.get("took").and_then(Value::as_u64).unwrap_or(0);
        let hits_obj = value.get("hits");
        let total = hits_obj.and_then(|h| h.get("total")).and_then(|t| {
            t.as_u64()
                .or_else(|| t.get("value").and_then(Value::as_u64))
        });
        let hits = match hits_obj.and_then(|h| h.get("hits")) {
            Some(raw) => serde_json::from_value(raw.clone())?,
            None => Vec::new(),
        };
        Ok(Self { took, total, hits })
    }
}

/// One row of the index enumeration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexSummary {
    #[serde(rename = "index")]
    pub name: String,
    #[serde(default)]
    pub health: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "docs.count", default)]
    pub docs_count: Option<String>,
    #[serde(rename = "store.size", default)]
    pub store_size: Option<String>,
}

impl IndexSummary {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            health: None,
            status: None,
            docs_count: None,
            store_size: None,
        }
    }
}

/// One index or a set of indices addressed by a single request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexTarget(Vec<String>);

impl IndexTarget {
    pub fn one(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    pub fn many<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Comma-joined form used in request paths.
    pub fn joined(&self) -> String {
        self.0.join(",")
    }
}

impl From<&str> for IndexTarget {
    /// Accepts a single name or a comma-separated list.
    fn from(value: &str) -> Self {
        Self::many(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty()),
        )
    }
}

impl fmt::Display for IndexTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_document_wire_names() {
        let doc = Document::new(vec![0.5, 0.25], "hello", "s3://bucket/report.pdf", "report.pdf");
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["langchain_vector"], json!([0.5, 0.25]));
        assert_eq!(value["langchain_text"], "hello");
        assert_eq!(value["langchain_source"], "s3://bucket/report.pdf");
        assert_eq!(value["langchain_file_name"], "report.pdf");
    }

    #[test]
    fn test_document_keeps_extra_metadata() {
        let raw = json!({
            "langchain_text": "t",
            "langchain_file_name": "a.txt",
            "langchain_metadata": {"page": 3}
        });
        let doc: Document = serde_json::from_value(raw).unwrap();
        assert!(doc.vector.is_none());
        assert_eq!(doc.metadata["langchain_metadata"]["page"], 3);

        let back = serde_json::to_value(&doc).unwrap();
        assert!(back.get("langchain_vector").is_none());
        assert_eq!(back["langchain_metadata"]["page"], 3);
    }

    #[test]
    fn test_bulk_ndjson_layout() {
        let payload = BulkPayload::new(vec![
            BulkOperation::index("docs", Document::new(vec![1.0], "a", "s", "f.pdf")),
            BulkOperation::index("docs", Document::new(vec![2.0], "b", "s", "f.pdf"))
                .with_id("doc-2"),
        ]);

        let body = payload.to_ndjson().unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(body.ends_with('\n'));

        let first: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, json!({"index": {"_index": "docs"}}));
        let third: Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(third, json!({"index": {"_index": "docs", "_id": "doc-2"}}));
    }

    #[test]
    fn test_bulk_from_ndjson() {
        let input = r#"
{"index": {"_index": "docs"}}
{"langchain_vector": [0.1, 0.2], "langchain_text": "a", "langchain_file_name": "x.pdf"}

{"create": {"_index": "other", "_id": "7"}}
{"langchain_text": "b"}
"#;
        let payload = BulkPayload::from_ndjson(input).unwrap();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.operations[0].action, BulkAction::Index);
        assert_eq!(payload.operations[0].document.file_name, "x.pdf");
        assert_eq!(payload.operations[1].action, BulkAction::Create);
        assert_eq!(payload.operations[1].index, "other");
        assert_eq!(payload.operations[1].id.as_deref(), Some("7"));
    }

    #[test]
    fn test_bulk_from_ndjson_rejects_dangling_action() {
        let err = BulkPayload::from_ndjson(r#"{"index": {"_index": "docs"}}"#).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn test_bulk_from_ndjson_requires_index() {
        let input = "{\"index\": {}}\n{\"langchain_text\": \"a\"}\n";
        let err = BulkPayload::from_ndjson(input).unwrap_err();
        assert!(err.to_string().contains("_index"));
    }

    #[test]
    fn test_bulk_response_ids_and_errors() {
        let response: BulkResponse = serde_json::from_value(json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_index": "docs", "_id": "a1", "status": 201}},
                {"index": {"_index": "gone", "_id": "a2", "status": 404,
                           "error": {"type": "index_not_found_exception"}}}
            ]
        }))
        .unwrap();

        assert_eq!(response.ids(), vec!["a1", "a2"]);
        let errors = response.item_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("index_not_found_exception"));
    }

    #[test]
    fn test_search_response_parsing() {
        let body = json!({
            "took": 4,
            "hits": {
                "total": {"value": 2, "relation": "eq"},
                "hits": [
                    {"_index": "docs", "_id": "1", "_score": 0.9,
                     "_source": {"langchain_file_name": "a.pdf", "langchain_text": "alpha"}},
                    {"_index": "notes", "_id": "2", "_score": null, "_source": {}}
                ]
            }
        });
        let response = SearchResponse::from_value(&body).unwrap();
        assert_eq!(response.took, 4);
        assert_eq!(response.total, Some(2));
        assert_eq!(response.hits.len(), 2);
        assert_eq!(response.hits[0].file_name(), Some("a.pdf"));
        assert_eq!(response.hits[0].text(), Some("alpha"));
        assert_eq!(response.hits[1].index, "notes");
        assert_eq!(response.hits[1].score, None);
    }

    #[test]
    fn test_index_summary_from_cat() {
        let rows: Vec<IndexSummary> = serde_json::from_value(json!([
            {"health": "green", "status": "open", "index": "docs",
             "uuid": "abc", "docs.count": "12", "store.size": "1kb"}
        ]))
        .unwrap();
        assert_eq!(rows[0].name, "docs");
        assert_eq!(rows[0].docs_count.as_deref(), Some("12"));
    }

    #[test]
    fn test_index_target_parsing() {
        let target = IndexTarget::from(" docs, notes ,,archive");
        assert_eq!(target.names(), ["docs", "notes", "archive"]);
        assert_eq!(target.joined(), "docs,notes,archive");
        assert!(IndexTarget::from("").is_empty());
    }
}
