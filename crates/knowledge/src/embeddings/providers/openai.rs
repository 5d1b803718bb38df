//! OpenAI embeddings provider.
//!
//! API: https://platform.openai.com/docs/api-reference/embeddings
//!
//! Texts are sent in batches of `batch_size` and the returned vectors are
//! re-ordered by their `index` field. A response that does not carry exactly
//! one vector per input aborts the whole call.

use crate::embeddings::config::EmbeddingConfig;
use crate::embeddings::provider::{sanitize, EmbeddingProvider};
use async_trait::async_trait;
use explain_core::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, instrument};

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Embedding provider backed by the OpenAI `/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    batch_size: usize,
}

impl fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("batch_size", &self.batch_size)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl OpenAiProvider {
    pub fn new(config: &EmbeddingConfig, api_key: impl Into<String>) -> Self {
        let mut base_url = config.endpoint.clone();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self {
            client: Client::new(),
            base_url,
            api_key: api_key.into(),
            model: config.model.clone(),
            dimensions: config.dimensions,
            batch_size: config.batch_size.max(1),
        }
    }

    #[instrument(skip(self, inputs), fields(batch = inputs.len(), model = %self.model))]
    async fn embed_chunk(&self, inputs: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbeddingRequest {
            model: &self.model,
            input: inputs,
        };

        debug!("Sending embedding request to {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to send request to OpenAI: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::Llm(format!("Failed to read OpenAI response: {}", e)))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ErrorEnvelope>(&text)
                .map(|envelope| envelope.error.message)
                .unwrap_or(text);
            return Err(AppError::Llm(format!(
                "OpenAI embeddings error ({}): {}",
                status, detail
            )));
        }

        let mut body: EmbeddingResponse = serde_json::from_str(&text).map_err(|e| {
            AppError::Llm(format!("Failed to parse OpenAI embeddings response: {}", e))
        })?;

        if body.data.len() != inputs.len() {
            return Err(AppError::Llm(format!(
                "OpenAI returned {} embeddings for {} inputs",
                body.data.len(),
                inputs.len()
            )));
        }

        body.data.sort_by_key(|item| item.index);
        Ok(body.data.into_iter().map(|item| item.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let sanitized: Vec<String> = texts.iter().map(|text| sanitize(text)).collect();
        let mut embeddings = Vec::with_capacity(texts.len());

        for chunk in sanitized.chunks(self.batch_size) {
            embeddings.extend(self.embed_chunk(chunk).await?);
        }

        debug!(
            "Generated {} embeddings with model '{}'",
            embeddings.len(),
            self.model
        );

        Ok(embeddings)
    }
}
