//! Embedding configuration derived from the application config.

use explain_core::{AppConfig, AppError, AppResult};
use serde::{Deserialize, Serialize};

/// Vector width produced by the offline mock provider.
pub const MOCK_DIMENSIONS: usize = 384;

/// Settings for one embedding provider instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddingConfig {
    /// Provider name: "openai" or "mock"
    pub provider: String,

    /// Model identifier (provider-specific)
    pub model: String,

    /// Embedding vector dimensions
    pub dimensions: usize,

    /// Maximum texts per embedding request
    pub batch_size: usize,

    /// API base URL for remote providers
    pub endpoint: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "mock".to_string(),
            model: "trigram-v1".to_string(),
            dimensions: MOCK_DIMENSIONS,
            batch_size: 100,
            endpoint: String::new(),
        }
    }
}

impl EmbeddingConfig {
    /// Build the embedding settings for the configured provider.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let (model, dimensions) = if config.provider == "mock" {
            ("trigram-v1".to_string(), MOCK_DIMENSIONS)
        } else {
            (
                config.embedding_model.clone(),
                dimensions_for_model(&config.embedding_model),
            )
        };

        Self {
            provider: config.provider.clone(),
            model,
            dimensions,
            batch_size: config.retrieval.batch_size,
            endpoint: config.endpoint.clone(),
        }
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(AppError::Config(
                "Embedding batch size must be at least 1".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(AppError::Config(
                "Embedding model cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Known output widths of OpenAI embedding models; 0 when unknown.
pub fn dimensions_for_model(model: &str) -> usize {
    match model {
        "text-embedding-ada-002" | "text-embedding-3-small" => 1536,
        "text-embedding-3-large" => 3072,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_app_config_openai() {
        let app = AppConfig::default();
        let config = EmbeddingConfig::from_app_config(&app);

        assert_eq!(config.provider, "openai");
        assert_eq!(config.model, "text-embedding-ada-002");
        assert_eq!(config.dimensions, 1536);
        assert_eq!(config.batch_size, 100);
        assert_eq!(config.endpoint, "https://api.openai.com/v1");
    }

    #[test]
    fn test_from_app_config_mock() {
        let mut app = AppConfig::default();
        app.provider = "mock".to_string();

        let config = EmbeddingConfig::from_app_config(&app);
        assert_eq!(config.model, "trigram-v1");
        assert_eq!(config.dimensions, MOCK_DIMENSIONS);
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = EmbeddingConfig {
            batch_size: 0,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(config.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_unknown_model_dimensions() {
        assert_eq!(dimensions_for_model("custom-embedder"), 0);
    }
}
