//! Retrieval-augmented question answering over a source repository.
//!
//! The pipeline fetches a working copy, splits matching files into
//! fixed-width fragments, embeds them into an in-memory vector index and
//! answers questions from the most similar fragments.

pub mod embeddings;
pub mod explainer;
pub mod fetcher;
pub mod fragmenter;
pub mod synthesizer;
pub mod types;
pub mod vector_index;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
pub use explainer::{Explainer, SessionState};
pub use fetcher::{Checkout, FetchPolicy, SourceFetcher};
pub use fragmenter::{FragmentBatch, Fragmenter};
pub use synthesizer::Synthesizer;
pub use types::{
    Answer, FileFilter, Fragment, IndexEntry, LoadStats, QaConfig, RepoSource,
    RepositoryReference, ScoredFragment, SourceRef, DEFAULT_BRANCH, DEFAULT_FILE_FILTER,
};
pub use vector_index::{MemoryIndex, VectorIndex};
