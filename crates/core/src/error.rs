//! Error types for repo-explain.
//!
//! One enum covers configuration, ingestion, usage and query failures as well
//! as the provider, prompt and I/O errors they wrap.

use thiserror::Error;

/// Unified error type for repo-explain.
///
/// Ingestion and query failures are kept apart so callers can treat a failed
/// load as fatal to that attempt while a failed question stays recoverable.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid or missing configuration, including absent credentials
    #[error("Configuration error: {0}")]
    Config(String),

    /// Fetch, read, embedding or index build failure during a repository load
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// Operation attempted in a state that does not allow it
    #[error("Usage error: {0}")]
    Usage(String),

    /// Embedding or completion failure while answering a question
    #[error("Query error: {0}")]
    Query(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM and embedding provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Prompt template errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl AppError {
    /// Whether the error leaves an already-built index usable.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, AppError::Query(_) | AppError::Usage(_))
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
