//! Knowledge pipeline type definitions.

use explain_core::{AppConfig, AppError, AppResult};
use explain_llm::UsageReport;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Branch used when a caller does not name one.
pub const DEFAULT_BRANCH: &str = "master";

/// File suffix indexed when a caller does not name one.
pub const DEFAULT_FILE_FILTER: &str = ".py";

/// Where the repository content comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RepoSource {
    /// Clone URL of a remote repository
    Remote(String),

    /// Existing directory used in place
    Local(PathBuf),
}

impl RepoSource {
    /// Interpret a user-supplied string; an existing directory is a local source.
    pub fn parse(input: &str) -> Self {
        let path = Path::new(input);
        if path.is_dir() {
            RepoSource::Local(path.to_path_buf())
        } else {
            RepoSource::Remote(input.to_string())
        }
    }
}

impl fmt::Display for RepoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepoSource::Remote(url) => write!(f, "{}", url),
            RepoSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Path-suffix filter selecting which files are indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileFilter {
    suffix: String,
}

impl FileFilter {
    pub fn new(suffix: impl Into<String>) -> Self {
        Self {
            suffix: suffix.into(),
        }
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    /// An empty suffix matches every file.
    pub fn matches(&self, path: &Path) -> bool {
        path.to_string_lossy().ends_with(self.suffix.as_str())
    }
}

impl Default for FileFilter {
    fn default() -> Self {
        Self::new(DEFAULT_FILE_FILTER)
    }
}

/// Identifies exactly one ingestion target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryReference {
    pub source: RepoSource,
    pub branch: String,
    pub file_filter: FileFilter,
}

impl RepositoryReference {
    /// Reference with the default branch and filter.
    pub fn new(source: RepoSource) -> Self {
        Self {
            source,
            branch: DEFAULT_BRANCH.to_string(),
            file_filter: FileFilter::default(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = branch.into();
        self
    }

    pub fn with_filter(mut self, filter: FileFilter) -> Self {
        self.file_filter = filter;
        self
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({})",
            self.source,
            self.branch,
            self.file_filter.suffix()
        )
    }
}

/// A bounded piece of one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fragment {
    /// Path relative to the working-copy root
    pub source_path: PathBuf,

    /// Ordinal position within the file, starting at 0
    pub position: u32,

    /// Fragment text
    pub text: String,

    /// Character offset (inclusive) of the fragment start
    pub char_start: usize,

    /// Character offset (exclusive) of the fragment end
    pub char_end: usize,
}

impl Fragment {
    /// Number of characters in the fragment.
    pub fn char_len(&self) -> usize {
        self.char_end - self.char_start
    }
}

/// A fragment together with its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub fragment: Fragment,
    pub vector: Vec<f32>,
}

/// A retrieved fragment and its cosine similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredFragment {
    pub fragment: Fragment,
    pub score: f32,
}

/// Human-readable pointer to a fragment used for an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Relative file path
    pub path: String,

    /// Fragment position within the file
    pub position: u32,

    /// Short snippet of the fragment text
    pub snippet: String,
}

/// Synthesized answer to one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
    pub usage: UsageReport,
    pub sources: Vec<SourceRef>,
}

/// Statistics from one successful load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub fragments_indexed: usize,
    pub bytes_read: u64,
    pub checkout_path: PathBuf,
    pub reused_checkout: bool,
    pub duration_secs: f64,
}

/// Pipeline knobs handed to the orchestrator at construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QaConfig {
    /// Completion model used for answers
    pub chat_model: String,

    /// Embedding model used for fragments and questions
    pub embedding_model: String,

    /// Number of fragments retrieved per question
    pub top_k: usize,

    /// Fragment width in characters
    pub chunk_size: usize,

    /// Characters shared by adjacent fragments
    pub chunk_overlap: usize,

    /// Texts per embedding request
    pub batch_size: usize,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            chat_model: "gpt-4".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            top_k: 4,
            chunk_size: 1000,
            chunk_overlap: 0,
            batch_size: 100,
        }
    }
}

impl QaConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            chat_model: config.model.clone(),
            embedding_model: config.embedding_model.clone(),
            top_k: config.retrieval.top_k,
            chunk_size: config.retrieval.chunk_size,
            chunk_overlap: config.retrieval.chunk_overlap,
            batch_size: config.retrieval.batch_size,
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.top_k == 0 {
            return Err(AppError::Config("top_k must be at least 1".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunk_size must be at least 1".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config("batch_size must be at least 1".to_string()));
        }
        Ok(())
    }
}
