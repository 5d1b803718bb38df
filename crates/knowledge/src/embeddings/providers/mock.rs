//! Mock embedding provider using trigram-based content-aware embeddings.

use crate::embeddings::provider::{sanitize, EmbeddingProvider};
use explain_core::{AppError, AppResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

const STOP_WORDS: &[&str] = &[
    "the", "is", "at", "which", "on", "a", "an", "as", "are", "was", "were", "for", "to", "of",
    "in", "and", "or", "but", "with", "by", "from", "this", "that", "be", "have", "has", "had",
    "it", "its", "their", "they", "them",
];

/// Mock provider for tests and offline runs.
///
/// Generates deterministic embeddings from word trigrams and whole-word
/// hashes, normalised to unit length. Not semantically accurate, but
/// texts sharing words land close together. A failing mock errors once
/// its successful calls are used up; every call is counted either way.
#[derive(Debug)]
pub struct MockProvider {
    dimensions: usize,
    fail_with: Option<String>,
    succeed_first: usize,
    calls: AtomicUsize,
}

impl MockProvider {
    /// Create a new mock provider with specified dimensions.
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
            fail_with: None,
            succeed_first: 0,
            calls: AtomicUsize::new(0),
        }
    }

    /// Create a mock that fails every call with `message`.
    pub fn failing(dimensions: usize, message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            ..Self::new(dimensions)
        }
    }

    /// Create a mock that answers the first `calls` requests, then fails.
    pub fn failing_after(dimensions: usize, calls: usize, message: impl Into<String>) -> Self {
        Self {
            succeed_first: calls,
            ..Self::failing(dimensions, message)
        }
    }

    /// Number of `embed_batch` calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn trigram_embedding(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0f32; self.dimensions];
        let lower = text.to_lowercase();

        let mut word_freq: HashMap<&str, u32> = HashMap::new();
        for word in lower
            .split(|c: char| !c.is_alphanumeric() && c != '_')
            .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        {
            *word_freq.entry(word).or_insert(0) += 1;
        }

        for (word, freq) in &word_freq {
            let chars: Vec<char> = word.chars().collect();
            for window in chars.windows(3) {
                let trigram: String = window.iter().collect();
                let slot = hash_with(&trigram, 37) % self.dimensions;
                embedding[slot] += (*freq as f32).sqrt();
            }

            let slot = hash_with(word, 31) % self.dimensions;
            embedding[slot] += *freq as f32;
        }

        let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut embedding {
                *v /= norm;
            }
        }

        embedding
    }
}

fn hash_with(text: &str, multiplier: u64) -> usize {
    text.bytes().fold(0u64, |acc, b| {
        acc.wrapping_mul(multiplier).wrapping_add(b as u64)
    }) as usize
}

#[async_trait::async_trait]
impl EmbeddingProvider for MockProvider {
    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "trigram-v1"
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ref message) = self.fail_with {
            if call >= self.succeed_first {
                return Err(AppError::Llm(message.clone()));
            }
        }

        Ok(texts
            .iter()
            .map(|text| self.trigram_embedding(&sanitize(text)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(v: &[f32]) -> f32 {
        v.iter().map(|x| x * x).sum::<f32>().sqrt()
    }

    #[tokio::test]
    async fn test_mock_provider_embed_batch() {
        let provider = MockProvider::new(384);
        let texts = vec![
            "hello world".to_string(),
            "def parse_args(argv):".to_string(),
        ];

        let embeddings = provider.embed_batch(&texts).await.unwrap();

        assert_eq!(embeddings.len(), 2);
        for embedding in &embeddings {
            assert_eq!(embedding.len(), 384);
            assert!((norm(embedding) - 1.0).abs() < 0.001);
        }
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_provider_deterministic() {
        let provider = MockProvider::new(384);

        let first = provider.embed("deterministic test").await.unwrap();
        let second = provider.embed("deterministic test").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_shared_words_score_higher() {
        let provider = MockProvider::new(384);
        let query = provider.embed("hello there").await.unwrap();
        let hello = provider.embed("hello world").await.unwrap();
        let goodbye = provider.embed("goodbye world").await.unwrap();

        let dot = |a: &[f32], b: &[f32]| a.iter().zip(b).map(|(x, y)| x * y).sum::<f32>();
        assert!(dot(&query, &hello) > dot(&query, &goodbye));
    }

    #[tokio::test]
    async fn test_empty_text_is_zero_vector() {
        let provider = MockProvider::new(384);
        let embedding = provider.embed("").await.unwrap();

        assert_eq!(embedding.len(), 384);
        assert!(embedding.iter().all(|&x| x == 0.0));
    }

    #[tokio::test]
    async fn test_utf8_safety() {
        let provider = MockProvider::new(384);
        let embedding = provider
            .embed("Gamedex é um aplicativo 🎮 brasileiro para gerenciar jogos!")
            .await
            .unwrap();

        assert!((norm(&embedding) - 1.0).abs() < 0.001);
    }

    #[tokio::test]
    async fn test_failing_mock_counts_calls() {
        let provider = MockProvider::failing(8, "quota exceeded");
        let result = provider.embed("hello").await;

        assert!(matches!(result, Err(AppError::Llm(ref msg)) if msg == "quota exceeded"));
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_failing_after_serves_first_calls() {
        let provider = MockProvider::failing_after(8, 1, "quota exceeded");

        assert_eq!(provider.embed("hello").await.unwrap().len(), 8);
        assert!(matches!(provider.embed("hello").await, Err(AppError::Llm(_))));
        assert_eq!(provider.call_count(), 2);
    }
}
