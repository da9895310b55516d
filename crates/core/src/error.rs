//! Error types for osindex.
//!
//! A single error enum covers every failure category: the search backend,
//! bulk ingestion, the embedding provider, configuration and local
//! validation.

use thiserror::Error;

/// Unified error type for osindex.
///
/// All fallible operations return `Result<T, AppError>`.
/// Backend failures carry the backend's original payload untouched.
#[derive(Error, Debug)]
pub enum AppError {
    /// Any failure reported by the search backend: connectivity, schema
    /// rejection, missing index or document.
    #[error("Backend error{}: {message}", .status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Backend {
        /// HTTP status when the backend answered, `None` on transport failure
        status: Option<u16>,
        /// Original error payload or transport message
        message: String,
    },

    /// Bulk write rejected or partially failed
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// Embedding provider failures
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local invariant checks that fail before anything is sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Backend error for a response the backend actually sent.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        AppError::Backend {
            status: Some(status),
            message: message.into(),
        }
    }

    /// Backend error for a request that never got an answer.
    pub fn transport(message: impl Into<String>) -> Self {
        AppError::Backend {
            status: None,
            message: message.into(),
        }
    }

    /// True when the backend reported the index or document as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::Backend { status: Some(404), .. })
    }

    /// True for any backend-originated failure.
    pub fn is_backend(&self) -> bool {
        matches!(self, AppError::Backend { .. })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_display_includes_status() {
        let err = AppError::backend(404, r#"{"error":"index_not_found_exception"}"#);
        let text = err.to_string();
        assert!(text.contains("(404)"));
        assert!(text.contains("index_not_found_exception"));
        assert!(err.is_not_found());
        assert!(err.is_backend());
    }

    #[test]
    fn test_transport_display_has_no_status() {
        let err = AppError::transport("connection refused");
        assert_eq!(err.to_string(), "Backend error: connection refused");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_json_error_converts_to_serialization() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: AppError = parse.unwrap_err().into();
        assert!(matches!(err, AppError::Serialization(_)));
    }
}
