//! Configuration management for repo-explain.
//!
//! This module handles loading and merging configuration from multiple sources:
//! - Built-in defaults
//! - Config file (`.repo-explain/config.yaml`)
//! - Environment variables
//! - Command-line flags
//!
//! Later sources win. Working copies and prompt overrides live under
//! `.repo-explain/` in the workspace.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, AppResult};

/// Name of the per-workspace state directory.
pub const STATE_DIR: &str = ".repo-explain";

/// Providers the factories know how to build.
pub const KNOWN_PROVIDERS: [&str; 2] = ["openai", "mock"];

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1";
const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Path to the workspace root (contains .repo-explain/)
    pub workspace: PathBuf,

    /// Optional config file path
    pub config_file: Option<PathBuf>,

    /// Provider used for both completions and embeddings ("openai", "mock")
    pub provider: String,

    /// Chat model identifier
    pub model: String,

    /// Embedding model identifier
    pub embedding_model: String,

    /// Base URL of the provider API
    pub endpoint: String,

    /// Environment variable holding the API key
    pub api_key_env: String,

    /// Log level override
    pub log_level: Option<String>,

    /// Verbose mode (enables debug logging)
    pub verbose: bool,

    /// Disable colored output
    pub no_color: bool,

    /// Chunking and retrieval knobs
    pub retrieval: RetrievalSettings,
}

/// Chunking and retrieval settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalSettings {
    /// Number of fragments fed to the synthesizer per question
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Fragment width in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Characters shared by consecutive fragments
    #[serde(default)]
    pub chunk_overlap: usize,

    /// Path suffix a file must end with to be indexed
    #[serde(default = "default_file_filter")]
    pub file_filter: String,

    /// Maximum texts per embedding request
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_top_k() -> usize {
    4
}

fn default_chunk_size() -> usize {
    1000
}

fn default_file_filter() -> String {
    ".py".to_string()
}

fn default_batch_size() -> usize {
    100
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            chunk_size: default_chunk_size(),
            chunk_overlap: 0,
            file_filter: default_file_filter(),
            batch_size: default_batch_size(),
        }
    }
}

/// Full configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct ConfigFile {
    llm: Option<LlmSection>,
    retrieval: Option<RetrievalSettings>,
    logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LlmSection {
    provider: Option<String>,
    model: Option<String>,
    embedding_model: Option<String>,
    endpoint: Option<String>,
    api_key_env: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoggingSection {
    level: Option<String>,
    color: Option<bool>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            config_file: None,
            provider: "openai".to_string(),
            model: "gpt-4".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            log_level: None,
            verbose: false,
            no_color: false,
            retrieval: RetrievalSettings::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from defaults, the YAML file and environment variables.
    ///
    /// An explicit workspace or config file (typically from CLI flags) wins
    /// over the matching environment variable and decides which YAML file
    /// is read.
    ///
    /// Environment variables:
    /// - `REPO_EXPLAIN_WORKSPACE`: Override workspace path
    /// - `REPO_EXPLAIN_CONFIG`: Path to config file
    /// - `REPO_EXPLAIN_PROVIDER`: Provider name
    /// - `REPO_EXPLAIN_MODEL`: Chat model identifier
    /// - `REPO_EXPLAIN_EMBEDDING_MODEL`: Embedding model identifier
    /// - `REPO_EXPLAIN_ENDPOINT`: Provider base URL
    /// - `RUST_LOG`: Log level
    /// - `NO_COLOR`: Disable colored output
    ///
    /// # Example
    /// ```no_run
    /// use explain_core::config::AppConfig;
    ///
    /// let config = AppConfig::load_from(None, None).expect("Failed to load config");
    /// println!("Workspace: {:?}", config.workspace);
    /// ```
    pub fn load_from(workspace: Option<PathBuf>, config_file: Option<PathBuf>) -> AppResult<Self> {
        let mut config = Self::default();

        if let Some(workspace) = workspace.or_else(|| {
            std::env::var("REPO_EXPLAIN_WORKSPACE")
                .ok()
                .map(PathBuf::from)
        }) {
            config.workspace = workspace;
        }

        config.config_file = config_file.or_else(|| {
            std::env::var("REPO_EXPLAIN_CONFIG")
                .ok()
                .map(PathBuf::from)
        });

        if !config.workspace.exists() {
            return Err(AppError::Config(format!(
                "Workspace directory does not exist: {:?}",
                config.workspace
            )));
        }

        let config_path = config
            .config_file
            .clone()
            .unwrap_or_else(|| config.state_dir().join("config.yaml"));

        if config_path.exists() {
            config = config.merge_yaml(&config_path)?;
        }

        // Environment variables override YAML config
        if let Ok(provider) = std::env::var("REPO_EXPLAIN_PROVIDER") {
            config.provider = provider;
        }

        if let Ok(model) = std::env::var("REPO_EXPLAIN_MODEL") {
            config.model = model;
        }

        if let Ok(model) = std::env::var("REPO_EXPLAIN_EMBEDDING_MODEL") {
            config.embedding_model = model;
        }

        if let Ok(endpoint) = std::env::var("REPO_EXPLAIN_ENDPOINT") {
            config.endpoint = endpoint;
        }

        if let Ok(level) = std::env::var("RUST_LOG") {
            config.log_level = Some(level);
        }

        if std::env::var_os("NO_COLOR").is_some() {
            config.no_color = true;
        }

        Ok(config)
    }

    /// Merge a YAML configuration file into a copy of this config.
    fn merge_yaml(&self, path: &Path) -> AppResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        let file: ConfigFile = serde_yaml::from_str(&contents).map_err(|e| {
            AppError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })?;

        Ok(self.merge_file(file))
    }

    fn merge_file(&self, file: ConfigFile) -> Self {
        let mut result = self.clone();

        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                result.provider = provider;
            }
            if let Some(model) = llm.model {
                result.model = model;
            }
            if let Some(embedding_model) = llm.embedding_model {
                result.embedding_model = embedding_model;
            }
            if let Some(endpoint) = llm.endpoint {
                result.endpoint = endpoint;
            }
            if let Some(api_key_env) = llm.api_key_env {
                result.api_key_env = api_key_env;
            }
        }

        if let Some(retrieval) = file.retrieval {
            result.retrieval = retrieval;
        }

        if let Some(logging) = file.logging {
            if let Some(level) = logging.level {
                result.log_level = Some(level);
            }
            if let Some(color) = logging.color {
                result.no_color = !color;
            }
        }

        result
    }

    /// Apply CLI overrides to the configuration.
    ///
    /// Command-line flags take precedence over the file and environment.
    /// `verbose` forces `debug` over any file or `RUST_LOG` level; only an
    /// explicit `log_level` flag beats it.
    #[allow(clippy::too_many_arguments)]
    pub fn with_overrides(
        mut self,
        workspace: Option<PathBuf>,
        config_file: Option<PathBuf>,
        provider: Option<String>,
        model: Option<String>,
        log_level: Option<String>,
        verbose: bool,
        no_color: bool,
    ) -> Self {
        if let Some(workspace) = workspace {
            self.workspace = workspace;
        }

        if let Some(config_file) = config_file {
            self.config_file = Some(config_file);
        }

        if let Some(provider) = provider {
            self.provider = provider;
        }

        if let Some(model) = model {
            self.model = model;
        }

        if verbose {
            self.verbose = true;
        }

        match log_level {
            Some(level) => self.log_level = Some(level),
            None if verbose => self.log_level = Some("debug".to_string()),
            None => {}
        }

        if no_color {
            self.no_color = true;
        }

        self
    }

    /// Get the path to the .repo-explain directory.
    pub fn state_dir(&self) -> PathBuf {
        self.workspace.join(STATE_DIR)
    }

    /// Directory holding cloned working copies.
    pub fn checkouts_dir(&self) -> PathBuf {
        self.state_dir().join("checkouts")
    }

    /// Ensure the .repo-explain directory exists.
    pub fn ensure_state_dir(&self) -> AppResult<()> {
        let dir = self.state_dir();
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                AppError::Config(format!("Failed to create {} directory: {}", STATE_DIR, e))
            })?;
        }
        Ok(())
    }

    /// Whether the active provider talks to a remote, keyed API.
    pub fn requires_api_key(&self) -> bool {
        self.provider == "openai"
    }

    /// Resolve the API key from the configured environment variable.
    pub fn resolve_api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    /// Validate configuration for the active provider.
    ///
    /// A missing credential is fatal here so that no core operation starts
    /// without one.
    pub fn validate(&self) -> AppResult<()> {
        if !KNOWN_PROVIDERS.contains(&self.provider.as_str()) {
            return Err(AppError::Config(format!(
                "Unknown provider: {}. Supported: {}",
                self.provider,
                KNOWN_PROVIDERS.join(", ")
            )));
        }

        if self.requires_api_key() && self.resolve_api_key().is_none() {
            return Err(AppError::Config(format!(
                "API key not found in environment variable: {}",
                self.api_key_env
            )));
        }

        self.retrieval.validate()
    }
}

impl RetrievalSettings {
    /// Check the chunking and retrieval knobs are usable.
    pub fn validate(&self) -> AppResult<()> {
        if self.top_k == 0 {
            return Err(AppError::Config("topK must be at least 1".to_string()));
        }
        if self.chunk_size == 0 {
            return Err(AppError::Config("chunkSize must be at least 1".to_string()));
        }
        if self.chunk_overlap >= self.chunk_size {
            return Err(AppError::Config(format!(
                "chunkOverlap ({}) must be smaller than chunkSize ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }
        if self.batch_size == 0 {
            return Err(AppError::Config("batchSize must be at least 1".to_string()));
        }
        Ok(())
    }
}
