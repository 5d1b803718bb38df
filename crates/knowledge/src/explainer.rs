//! Retrieval-QA orchestrator.
//!
//! Drives the two phases of the pipeline: indexing (fetch, fragment, embed,
//! build) once per repository load, and querying (embed, retrieve,
//! synthesize) any number of times against the built index.

use crate::embeddings::{create_provider, EmbeddingConfig, EmbeddingProvider};
use crate::fetcher::{FetchPolicy, SourceFetcher};
use crate::fragmenter::Fragmenter;
use crate::synthesizer::{source_refs, Synthesizer};
use crate::types::{Answer, IndexEntry, LoadStats, QaConfig, RepositoryReference, ScoredFragment};
use crate::vector_index::{MemoryIndex, VectorIndex};
use explain_core::{AppConfig, AppError, AppResult};
use explain_llm::{create_client, LlmClient};
use explain_prompt::{load_prompt, PromptDefinition, QA_PROMPT_ID};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Lifecycle of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionState {
    Unloaded,
    Indexing,
    Ready,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unloaded => "unloaded",
            SessionState::Indexing => "indexing",
            SessionState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Answers questions about one loaded repository at a time.
///
/// `load` takes `&mut self` and `ask` takes `&self`, so a query can never
/// overlap an indexing pass on the same instance.
pub struct Explainer {
    config: QaConfig,
    fetcher: SourceFetcher,
    fragmenter: Fragmenter,
    embedder: Arc<dyn EmbeddingProvider>,
    synthesizer: Synthesizer,
    index: Box<dyn VectorIndex>,
    state: SessionState,
    loaded: Option<RepositoryReference>,
}

impl Explainer {
    /// Assemble an orchestrator from explicit collaborators.
    pub fn new(
        config: QaConfig,
        fetcher: SourceFetcher,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmClient>,
        prompt: PromptDefinition,
    ) -> AppResult<Self> {
        config.validate()?;
        let fragmenter = Fragmenter::new(config.chunk_size, config.chunk_overlap)?;
        let synthesizer = Synthesizer::new(llm, config.chat_model.clone(), prompt);

        Ok(Self {
            config,
            fetcher,
            fragmenter,
            embedder,
            synthesizer,
            index: Box::new(MemoryIndex::new()),
            state: SessionState::Unloaded,
            loaded: None,
        })
    }

    /// Build providers, prompt and fetcher from the application config.
    ///
    /// The config is expected to have passed `AppConfig::validate`.
    pub fn from_app_config(app: &AppConfig, policy: FetchPolicy) -> AppResult<Self> {
        let api_key = app.resolve_api_key();
        if app.requires_api_key() && api_key.is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                app.api_key_env
            )));
        }

        let llm = create_client(&app.provider, Some(app.endpoint.as_str()), api_key.as_deref())
            .map_err(|e| AppError::Config(format!("Failed to create LLM client: {}", e)))?;
        let embedder = create_provider(&EmbeddingConfig::from_app_config(app), api_key.as_deref())?;
        let prompt = load_prompt(&app.workspace, QA_PROMPT_ID)?;
        let fetcher = SourceFetcher::new(app.checkouts_dir(), policy);

        Self::new(QaConfig::from_app_config(app), fetcher, embedder, llm, prompt)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// Number of indexed fragments.
    pub fn index_len(&self) -> usize {
        self.index.len()
    }

    /// The repository behind the current index, once `Ready`.
    pub fn loaded_repository(&self) -> Option<&RepositoryReference> {
        self.loaded.as_ref()
    }

    /// Index a repository, discarding any previous one.
    ///
    /// On failure the session returns to `Unloaded` and the error is an
    /// ingestion error carrying the cause.
    pub async fn load(&mut self, reference: RepositoryReference) -> AppResult<LoadStats> {
        tracing::info!("Loading repository {}", reference);

        self.state = SessionState::Indexing;
        self.index.reset();
        self.loaded = None;

        let outcome = self.run_indexing(&reference).await;
        match outcome {
            Ok(stats) => {
                self.state = SessionState::Ready;
                self.loaded = Some(reference);
                tracing::info!(
                    "Indexed {} fragments from {} files ({} skipped, {} bytes) in {:.2}s",
                    stats.fragments_indexed,
                    stats.files_indexed,
                    stats.files_skipped,
                    stats.bytes_read,
                    stats.duration_secs
                );
                Ok(stats)
            }
            Err(e) => {
                self.index.reset();
                self.state = SessionState::Unloaded;
                tracing::error!("Repository load failed: {}", e);
                Err(into_ingestion(e))
            }
        }
    }

    async fn run_indexing(&mut self, reference: &RepositoryReference) -> AppResult<LoadStats> {
        let start = Instant::now();

        let checkout = self.fetcher.fetch(reference).await?;
        let batch = self
            .fragmenter
            .fragment_tree(&checkout.path, &reference.file_filter)?;

        if batch.fragments.is_empty() {
            return Err(AppError::Ingestion(format!(
                "No fragments produced: no readable, non-empty files match '{}' in {}",
                reference.file_filter.suffix(),
                checkout.path.display()
            )));
        }

        tracing::info!(
            "Embedding {} fragments with '{}' (model: {})",
            batch.fragments.len(),
            self.embedder.provider_name(),
            self.embedder.model_name()
        );

        let texts: Vec<String> = batch.fragments.iter().map(|f| f.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(AppError::Ingestion(format!(
                "Embedding provider returned {} vectors for {} fragments",
                vectors.len(),
                texts.len()
            )));
        }

        let fragments_indexed = batch.fragments.len();
        let entries: Vec<IndexEntry> = batch
            .fragments
            .into_iter()
            .zip(vectors)
            .map(|(fragment, vector)| IndexEntry { fragment, vector })
            .collect();
        self.index.build(entries)?;

        Ok(LoadStats {
            files_indexed: batch.files_indexed,
            files_skipped: batch.files_skipped,
            fragments_indexed,
            bytes_read: batch.bytes_read,
            checkout_path: checkout.path,
            reused_checkout: checkout.reused,
            duration_secs: start.elapsed().as_secs_f64(),
        })
    }

    /// Retrieve the fragments most relevant to `question`.
    pub async fn retrieve(&self, question: &str) -> AppResult<Vec<ScoredFragment>> {
        self.ensure_queryable(question)?;

        let query = self
            .embedder
            .embed(question)
            .await
            .map_err(|e| AppError::Query(format!("Failed to embed question: {}", e)))?;

        let results = self.index.search(&query, self.config.top_k)?;

        if let Some(best) = results.first() {
            tracing::debug!(
                "Retrieved {} fragments (top score: {:.3}, {:?})",
                results.len(),
                best.score,
                best.fragment.source_path
            );
        }

        Ok(results)
    }

    /// Answer one question against the loaded repository.
    ///
    /// Usage errors (not `Ready`, blank question) are returned as `Err`. Any
    /// failure while answering is logged and yields `Ok(None)`; the index and
    /// state are left untouched.
    pub async fn ask(&self, question: &str) -> AppResult<Option<Answer>> {
        self.ensure_queryable(question)?;

        match self.answer(question).await {
            Ok(answer) => {
                tracing::info!("Usage: {}", answer.usage);
                Ok(Some(answer))
            }
            Err(e) => {
                tracing::warn!("Failed to answer question: {}", e);
                Ok(None)
            }
        }
    }

    async fn answer(&self, question: &str) -> AppResult<Answer> {
        let fragments = self.retrieve(question).await?;
        let (text, usage) = self.synthesizer.synthesize(question, &fragments).await?;

        Ok(Answer {
            text,
            usage,
            sources: source_refs(&fragments),
        })
    }

    fn ensure_queryable(&self, question: &str) -> AppResult<()> {
        if self.state != SessionState::Ready {
            return Err(AppError::Usage(format!(
                "No repository is loaded (session is {}); call load first",
                self.state
            )));
        }
        if question.trim().is_empty() {
            return Err(AppError::Usage("Question cannot be empty".to_string()));
        }
        Ok(())
    }
}

fn into_ingestion(err: AppError) -> AppError {
    match err {
        AppError::Ingestion(_) => err,
        other => AppError::Ingestion(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::MockProvider;
    use explain_llm::MockLlmClient;
    use explain_prompt::default_qa_prompt;

    fn explainer() -> Explainer {
        Explainer::new(
            QaConfig::default(),
            SourceFetcher::new("/tmp/unused", FetchPolicy::default()),
            Arc::new(MockProvider::new(64)),
            Arc::new(MockLlmClient::new()),
            default_qa_prompt(),
        )
        .unwrap()
    }

    #[test]
    fn test_starts_unloaded() {
        let explainer = explainer();
        assert_eq!(explainer.state(), SessionState::Unloaded);
        assert_eq!(explainer.index_len(), 0);
        assert!(explainer.loaded_repository().is_none());
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = Explainer::new(
            QaConfig {
                chunk_overlap: 2000,
                ..QaConfig::default()
            },
            SourceFetcher::new("/tmp/unused", FetchPolicy::default()),
            Arc::new(MockProvider::new(64)),
            Arc::new(MockLlmClient::new()),
            default_qa_prompt(),
        );
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_into_ingestion_keeps_cause() {
        let err = into_ingestion(AppError::Llm("quota".to_string()));
        assert!(matches!(err, AppError::Ingestion(ref msg) if msg.contains("quota")));

        let already = into_ingestion(AppError::Ingestion("clone".to_string()));
        assert_eq!(already.to_string(), "Ingestion error: clone");
    }

    #[test]
    fn test_from_app_config_mock() {
        let temp = tempfile::TempDir::new().unwrap();
        let mut app = AppConfig::default();
        app.workspace = temp.path().to_path_buf();
        app.provider = "mock".to_string();

        let explainer = Explainer::from_app_config(&app, FetchPolicy::AlwaysRefetch).unwrap();
        assert_eq!(explainer.state(), SessionState::Unloaded);
        assert_eq!(explainer.config().top_k, 4);
    }

    #[tokio::test]
    async fn test_ask_before_load_is_usage_error() {
        let explainer = explainer();
        let result = explainer.ask("what is this?").await;
        assert!(matches!(result, Err(AppError::Usage(_))));
    }
}
