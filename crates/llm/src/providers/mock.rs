//! Deterministic offline completion client.

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use explain_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};

const ANSWER_PREVIEW_CHARS: usize = 200;

/// Mock client for tests and dry runs.
///
/// Answers are derived from the prompt text so they are stable across runs,
/// and token counts are whitespace word counts. A failing mock returns an
/// LLM error on every call.
#[derive(Debug, Default)]
pub struct MockLlmClient {
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl MockLlmClient {
    /// Create a mock that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that fails every completion with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            fail_with: Some(message.into()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of completion calls received so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn render_answer(request: &LlmRequest) -> String {
        let full = match request.system.as_deref() {
            Some(system) => format!("{}\n\n{}", system, request.prompt),
            None => request.prompt.clone(),
        };
        let preview: String = full.chars().take(ANSWER_PREVIEW_CHARS).collect();
        format!("Mock answer based on the supplied context:\n{}", preview)
    }
}

fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(ref message) = self.fail_with {
            return Err(AppError::Llm(message.clone()));
        }

        let content = Self::render_answer(request);
        let prompt_tokens =
            word_count(&request.prompt) + request.system.as_deref().map_or(0, word_count);
        let usage = LlmUsage::new(prompt_tokens, word_count(&content));

        Ok(LlmResponse {
            content,
            model: request.model.clone(),
            usage,
        })
    }
}
