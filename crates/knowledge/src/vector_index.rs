//! Vector index abstraction for fragment embeddings.
//!
//! Defines a trait for nearest-neighbour retrieval by cosine similarity and
//! an in-memory implementation. The index lives for one loaded repository
//! and is rebuilt wholesale on every load.

use crate::types::{IndexEntry, ScoredFragment};
use explain_core::{AppError, AppResult};

/// Trait for vector index backends.
///
/// Implementations must support:
/// - Building from a full set of entries, replacing prior content
/// - Top-k search by cosine similarity, ties broken by insertion order
/// - Resetting to the never-built state
pub trait VectorIndex: Send + Sync {
    /// Replace all content with `entries`.
    fn build(&mut self, entries: Vec<IndexEntry>) -> AppResult<()>;

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Fails with a usage error if the index was never built.
    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<ScoredFragment>>;

    /// Number of stored entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `build` has succeeded since creation or the last reset.
    fn is_built(&self) -> bool;

    /// Drop all content and return to the never-built state.
    fn reset(&mut self);
}

/// Cosine similarity; zero when either vector has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// In-memory index with exhaustive search.
#[derive(Debug, Default)]
pub struct MemoryIndex {
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
    built: bool,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl VectorIndex for MemoryIndex {
    fn build(&mut self, entries: Vec<IndexEntry>) -> AppResult<()> {
        self.reset();

        let dimension = entries.first().map(|entry| entry.vector.len());
        if let Some(dim) = dimension {
            if dim == 0 {
                return Err(AppError::Ingestion(
                    "Cannot index empty embedding vectors".to_string(),
                ));
            }
            if let Some(bad) = entries.iter().find(|entry| entry.vector.len() != dim) {
                return Err(AppError::Ingestion(format!(
                    "Inconsistent embedding dimensions: {:?} has {}, expected {}",
                    bad.fragment.source_path,
                    bad.vector.len(),
                    dim
                )));
            }
        }

        tracing::debug!(
            "Built memory index with {} entries (dimension: {:?})",
            entries.len(),
            dimension
        );

        self.entries = entries;
        self.dimension = dimension;
        self.built = true;
        Ok(())
    }

    fn search(&self, query: &[f32], k: usize) -> AppResult<Vec<ScoredFragment>> {
        if !self.built {
            return Err(AppError::Usage(
                "Vector index has not been built; load a repository first".to_string(),
            ));
        }

        if let Some(dim) = self.dimension {
            if query.len() != dim {
                return Err(AppError::Query(format!(
                    "Query vector has dimension {}, index has {}",
                    query.len(),
                    dim
                )));
            }
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (i, cosine_similarity(query, &entry.vector)))
            .collect();

        // Stable sort keeps insertion order among equal scores
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, score)| ScoredFragment {
                fragment: self.entries[i].fragment.clone(),
                score,
            })
            .collect())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn is_built(&self) -> bool {
        self.built
    }

    fn reset(&mut self) {
        self.entries.clear();
        self.dimension = None;
        self.built = false;
    }
}
