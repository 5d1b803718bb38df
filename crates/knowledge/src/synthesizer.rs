//! Answer synthesis from retrieved fragments.
//!
//! Builds one context block from the fragments, renders the QA prompt and
//! submits a single completion request.

use crate::types::{ScoredFragment, SourceRef};
use explain_core::{AppError, AppResult};
use explain_llm::{LlmClient, LlmRequest, UsageReport};
use explain_prompt::{build_prompt, PromptDefinition};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Maximum snippet length for source references, in characters.
const MAX_SNIPPET_LENGTH: usize = 150;

/// Composes answers with a completion provider.
pub struct Synthesizer {
    client: Arc<dyn LlmClient>,
    model: String,
    prompt: PromptDefinition,
}

impl Synthesizer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, prompt: PromptDefinition) -> Self {
        Self {
            client,
            model: model.into(),
            prompt,
        }
    }

    /// Answer `question` from `fragments`, returning the raw text and usage.
    ///
    /// Provider failures are reported as query errors.
    pub async fn synthesize(
        &self,
        question: &str,
        fragments: &[ScoredFragment],
    ) -> AppResult<(String, UsageReport)> {
        let context = build_context(fragments);

        let mut variables = HashMap::new();
        variables.insert("context".to_string(), context);
        variables.insert("question".to_string(), question.to_string());
        let built = build_prompt(&self.prompt, variables)?;

        let mut request = LlmRequest::new(built.user, self.model.as_str());
        if let Some(system) = built.system {
            request = request.with_system(system);
        }
        if let Some(temperature) = built.metadata.temperature {
            request = request.with_temperature(temperature);
        }

        tracing::debug!(
            "Synthesizing answer with {} fragments (provider: {}, model: {})",
            fragments.len(),
            self.client.provider_name(),
            self.model
        );

        let response = self
            .client
            .complete(&request)
            .await
            .map_err(|e| AppError::Query(format!("Answer synthesis failed: {}", e)))?;

        let usage = UsageReport::from_usage(&response.usage, &self.model);
        Ok((response.content, usage))
    }
}

/// Fragment texts in retrieval order, separated by a blank line.
pub fn build_context(fragments: &[ScoredFragment]) -> String {
    fragments
        .iter()
        .map(|scored| scored.fragment.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Map fragments to source references, first occurrence wins.
pub fn source_refs(fragments: &[ScoredFragment]) -> Vec<SourceRef> {
    let mut seen = HashSet::new();
    let mut sources = Vec::new();

    for scored in fragments {
        let fragment = &scored.fragment;
        let path = fragment.source_path.to_string_lossy().replace('\\', "/");
        if !seen.insert((path.clone(), fragment.position)) {
            continue;
        }

        sources.push(SourceRef {
            path,
            position: fragment.position,
            snippet: truncate_snippet(&fragment.text, MAX_SNIPPET_LENGTH),
        });
    }

    sources
}

/// Truncate at a word boundary, counting characters.
fn truncate_snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }

    let truncated: String = trimmed.chars().take(max_chars).collect();
    match truncated.rfind(char::is_whitespace) {
        Some(last_space) if last_space > 0 => format!("{}...", truncated[..last_space].trim_end()),
        _ => format!("{}...", truncated),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Fragment;
    use explain_llm::MockLlmClient;
    use explain_prompt::default_qa_prompt;
    use std::path::PathBuf;

    fn scored(path: &str, position: u32, text: &str) -> ScoredFragment {
        ScoredFragment {
            fragment: Fragment {
                source_path: PathBuf::from(path),
                position,
                text: text.to_string(),
                char_start: 0,
                char_end: text.chars().count(),
            },
            score: 0.5,
        }
    }

    #[test]
    fn test_build_context_joins_in_order() {
        let fragments = vec![scored("a.py", 0, "first"), scored("b.py", 0, "second")];
        assert_eq!(build_context(&fragments), "first\n\nsecond");
        assert_eq!(build_context(&[]), "");
    }

    #[test]
    fn test_source_refs_dedupe() {
        let fragments = vec![
            scored("a.py", 0, "hello world"),
            scored("a.py", 0, "hello world"),
            scored("a.py", 1, "more"),
        ];

        let refs = source_refs(&fragments);
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].path, "a.py");
        assert_eq!(refs[1].position, 1);
    }

    #[test]
    fn test_truncate_snippet() {
        assert_eq!(truncate_snippet("  short  ", 100), "short");

        let long = "This is a very long text that needs to be truncated at some point";
        let result = truncate_snippet(long, 30);
        assert!(result.ends_with("..."));
        assert!(result.chars().count() <= 33);

        let wide = "é".repeat(40);
        assert_eq!(truncate_snippet(&wide, 10), format!("{}...", "é".repeat(10)));
    }

    #[tokio::test]
    async fn test_synthesize_reports_usage() {
        let client = Arc::new(MockLlmClient::new());
        let synthesizer = Synthesizer::new(client.clone(), "gpt-4", default_qa_prompt());

        let (text, usage) = synthesizer
            .synthesize("what does file A say?", &[scored("a.py", 0, "hello world")])
            .await
            .unwrap();

        assert!(text.contains("hello world"));
        assert!(usage.total_tokens > 0);
        assert_eq!(usage.total_tokens, usage.prompt_tokens + usage.completion_tokens);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_provider_failure_is_query_error() {
        let synthesizer = Synthesizer::new(
            Arc::new(MockLlmClient::failing("rate limited")),
            "gpt-4",
            default_qa_prompt(),
        );

        let result = synthesizer.synthesize("why?", &[scored("a.py", 0, "x")]).await;
        assert!(matches!(result, Err(AppError::Query(msg)) if msg.contains("rate limited")));
    }
}
