//! Prompt system for repo-explain.
//!
//! This crate provides the question-answering instruction template:
//! - A built-in default definition
//! - YAML overrides from `.repo-explain/prompts/`
//! - Handlebars template rendering

pub mod builder;
pub mod defaults;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::build_prompt;
pub use defaults::{default_qa_prompt, QA_PROMPT_ID};
pub use loader::load_prompt;
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
