//! Built-in prompt definitions.

use crate::types::PromptDefinition;

/// Identifier of the question-answering prompt.
pub const QA_PROMPT_ID: &str = "qa.default";

const QA_SYSTEM_TEMPLATE: &str = "Use the following pieces of context to answer the user's question. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\
----------------\n\
{{context}}";

const QA_USER_TEMPLATE: &str = "{{question}}";

/// The stock "answer using only the following context" prompt.
///
/// Expects the variables `context` and `question`.
pub fn default_qa_prompt() -> PromptDefinition {
    PromptDefinition {
        id: QA_PROMPT_ID.to_string(),
        title: "Repository question answering".to_string(),
        api_version: "1.0".to_string(),
        system_template: Some(QA_SYSTEM_TEMPLATE.to_string()),
        template: QA_USER_TEMPLATE.to_string(),
        temperature: Some(0.0),
    }
}
