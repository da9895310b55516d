//! Fixed index schema: one k-NN vector field plus three text fields, each
//! with a length-capped `keyword` sub-field for exact matching.

use serde_json::{json, Value};

pub const VECTOR_FIELD: &str = "langchain_vector";
pub const TEXT_FIELD: &str = "langchain_text";
pub const SOURCE_FIELD: &str = "langchain_source";
pub const FILE_NAME_FIELD: &str = "langchain_file_name";

/// Exact-match sub-field name under each text field.
pub const EXACT_SUBFIELD: &str = "keyword";

/// Keyword caps (`ignore_above`). Longer values are indexed as text only.
pub const TEXT_KEYWORD_CAP: usize = 1800;
pub const SOURCE_KEYWORD_CAP: usize = 20000;
pub const FILE_NAME_KEYWORD_CAP: usize = 250;

/// Create-index body for a given vector dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexSchema {
    pub dimension: usize,
}

impl IndexSchema {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    /// Path of the exact-match sub-field used as the deletion key.
    pub fn file_name_exact_field() -> String {
        format!("{}.{}", FILE_NAME_FIELD, EXACT_SUBFIELD)
    }

    /// Settings and mappings sent with the create-index request.
    pub fn to_body(&self) -> Value {
        json!({
            "settings": {
                "index": {
                    "knn": true
                }
            },
            "mappings": {
                "properties": {
                    VECTOR_FIELD: {
                        "type": "knn_vector",
                        "dimension": self.dimension
                    },
                    TEXT_FIELD: capped_text(TEXT_KEYWORD_CAP),
                    SOURCE_FIELD: capped_text(SOURCE_KEYWORD_CAP),
                    FILE_NAME_FIELD: capped_text(FILE_NAME_KEYWORD_CAP)
                }
            }
        })
    }

    /// Dimension declared by a create-index body, if it carries one.
    pub fn dimension_of(body: &Value) -> Option<usize> {
        body.pointer(&format!("/mappings/properties/{}/dimension", VECTOR_FIELD))
            .and_then(Value::as_u64)
            .map(|d| d as usize)
    }
}

fn capped_text(cap: usize) -> Value {
    json!({
        "type": "text",
        "fields": {
            EXACT_SUBFIELD: {
                "type": "keyword",
                "ignore_above": cap
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_body() {
        let body = IndexSchema::new(1536).to_body();

        assert_eq!(body["settings"]["index"]["knn"], true);
        let props = &body["mappings"]["properties"];
        assert_eq!(props[VECTOR_FIELD]["type"], "knn_vector");
        assert_eq!(props[VECTOR_FIELD]["dimension"], 1536);
        assert_eq!(props[TEXT_FIELD]["fields"]["keyword"]["ignore_above"], 1800);
        assert_eq!(props[SOURCE_FIELD]["fields"]["keyword"]["ignore_above"], 20000);
        assert_eq!(props[FILE_NAME_FIELD]["fields"]["keyword"]["ignore_above"], 250);
        assert_eq!(props[FILE_NAME_FIELD]["type"], "text");
    }

    #[test]
    fn test_dimension_round_trips_through_body() {
        let body = IndexSchema::new(768).to_body();
        assert_eq!(IndexSchema::dimension_of(&body), Some(768));
        assert_eq!(IndexSchema::dimension_of(&serde_json::json!({})), None);
    }

    #[test]
    fn test_file_name_exact_field() {
        assert_eq!(IndexSchema::file_name_exact_field(), "langchain_file_name.keyword");
    }
}
