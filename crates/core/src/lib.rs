//! osindex core library.
//!
//! Foundational utilities shared by the index library and the CLI:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, DeleteTarget, DeletionSettings, EmbeddingSettings};
pub use error::{AppError, AppResult};
