//! LLM integration crate for repo-explain.
//!
//! Provider-agnostic completion client used by the answer synthesizer, plus
//! token and cost accounting for each call.
//!
//! # Providers
//! - **OpenAI**: chat completions API (default)
//! - **Mock**: deterministic offline client for tests and dry runs
//!
//! # Example
//! ```no_run
//! use explain_llm::{LlmClient, LlmRequest, providers::OpenAiClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OpenAiClient::new("sk-...");
//! let request = LlmRequest::new("Hello, world!", "gpt-4");
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;
pub mod usage;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{MockLlmClient, OpenAiClient};
pub use types::ProviderType;
pub use usage::UsageReport;
