//! Embedding client for fragments and questions.
//!
//! Provider-agnostic embedding generation behind the [`EmbeddingProvider`]
//! trait, with an OpenAI implementation and an offline mock.

pub mod config;
pub mod provider;
pub mod providers;

pub use config::EmbeddingConfig;
pub use provider::{create_provider, sanitize, EmbeddingProvider};
pub use providers::{MockProvider, OpenAiProvider};
