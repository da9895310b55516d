//! Embedding providers.
//!
//! Turns query text into a vector whose length matches the index schema.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{MockProvider, OpenAiProvider};
