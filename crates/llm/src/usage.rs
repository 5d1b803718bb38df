//! Token and cost accounting for completion calls.

use crate::client::LlmUsage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// USD price per 1K tokens as (model prefix, prompt, completion).
///
/// Ordered so that the most specific prefix matches first.
const PRICING: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.000_15, 0.000_6),
    ("gpt-4o", 0.002_5, 0.01),
    ("gpt-4-turbo", 0.01, 0.03),
    ("gpt-4-32k", 0.06, 0.12),
    ("gpt-4", 0.03, 0.06),
    ("gpt-3.5-turbo-16k", 0.003, 0.004),
    ("gpt-3.5-turbo", 0.000_5, 0.001_5),
];

/// Per-call usage summary handed back with every synthesized answer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// Estimated cost in USD; zero for models without a known price
    pub estimated_cost_usd: f64,
}

impl UsageReport {
    /// Build a report from provider usage, pricing it for `model`.
    pub fn from_usage(usage: &LlmUsage, model: &str) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            estimated_cost_usd: estimate_cost(model, usage),
        }
    }

    /// Cost rendered with two decimals, e.g. `$0.04`.
    pub fn cost_display(&self) -> String {
        format!("${:.2}", self.estimated_cost_usd)
    }
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Prompt Tokens: {}, Completion Tokens: {}, Total Tokens: {}, Cost: {}",
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            self.cost_display()
        )
    }
}

/// Estimate the USD cost of a call from the per-1K token price table.
pub fn estimate_cost(model: &str, usage: &LlmUsage) -> f64 {
    let model = model.to_lowercase();
    match PRICING.iter().find(|(prefix, _, _)| model.starts_with(prefix)) {
        Some((_, prompt_price, completion_price)) => {
            (usage.prompt_tokens as f64 / 1000.0) * prompt_price
                + (usage.completion_tokens as f64 / 1000.0) * completion_price
        }
        None => {
            tracing::debug!("No pricing known for model '{}', reporting zero cost", model);
            0.0
        }
    }
}
