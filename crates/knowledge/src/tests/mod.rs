//! Cross-module scenarios for the knowledge pipeline.

mod rag_ranking;

use crate::embeddings::MockProvider;
use crate::explainer::Explainer;
use crate::fetcher::{FetchPolicy, SourceFetcher};
use crate::types::{FileFilter, QaConfig, RepoSource, RepositoryReference};
use explain_llm::MockLlmClient;
use explain_prompt::default_qa_prompt;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

/// An explainer wired to counting mocks, plus the scratch repository it reads.
pub(crate) struct Harness {
    pub explainer: Explainer,
    pub embedder: Arc<MockProvider>,
    pub llm: Arc<MockLlmClient>,
    pub repo: TempDir,
    _checkouts: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_mocks(MockProvider::new(128), MockLlmClient::new())
    }

    pub fn with_mocks(embedder: MockProvider, llm: MockLlmClient) -> Self {
        let repo = TempDir::new().unwrap();
        let checkouts = TempDir::new().unwrap();
        let embedder = Arc::new(embedder);
        let llm = Arc::new(llm);

        let explainer = Explainer::new(
            QaConfig::default(),
            SourceFetcher::new(checkouts.path(), FetchPolicy::default()),
            embedder.clone(),
            llm.clone(),
            default_qa_prompt(),
        )
        .unwrap();

        Self {
            explainer,
            embedder,
            llm,
            repo,
            _checkouts: checkouts,
        }
    }

    pub fn write(&self, relative: &str, content: &str) {
        let path = self.repo.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    pub fn reference(&self, filter: &str) -> RepositoryReference {
        local_reference(self.repo.path(), filter)
    }
}

pub(crate) fn local_reference(path: &Path, filter: &str) -> RepositoryReference {
    RepositoryReference::new(RepoSource::Local(path.to_path_buf()))
        .with_filter(FileFilter::new(filter))
}

/// Scale a vector to unit length.
pub(crate) fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}
