//! Remote model invocation layer.
//!
//! This module provides a trait-based abstraction over generation
//! providers, with OpenRouter as the production implementation. The retry
//! loop in [`crate::processor`] drives these traits and stays ignorant of
//! any concrete provider.

mod error;
mod openrouter;

pub use error::{
    classify_http_status, ErrorCategory, LlmError, RetryConfig, MAX_ATTEMPTS,
    NETWORK_RETRY_WAIT, RATE_LIMIT_RETRY_WAIT, SERVER_RETRY_WAIT,
};
pub use openrouter::{OpenRouterClient, OpenRouterService};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw success value from a provider, before text extraction.
#[derive(Debug, Clone, Default)]
pub struct ProviderResult {
    /// Generated content. May be absent when the provider produced nothing.
    pub content: Option<String>,
    /// Provider-reported finish reason ("stop", "length", ...).
    pub finish_reason: Option<String>,
    /// Token usage, if reported by the provider.
    pub usage: Option<TokenUsage>,
}

impl ProviderResult {
    /// Result carrying only generated text.
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Self::default()
        }
    }
}

/// Token usage information (if provided by the upstream provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage object ensuring `total_tokens` is consistent.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// A single remote generation call.
///
/// Implementations perform exactly one request per call and no retries;
/// recovery is owned by the caller.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Invoke generation for `prompt` against `model`.
    async fn generate(&self, model: &str, prompt: &str) -> Result<ProviderResult, LlmError>;
}

/// Provider service consumed by the processor: constructs clients and turns
/// raw results into plain text.
#[async_trait]
pub trait ApiService: Send + Sync {
    /// Construct a client for one model. Called once per processing session.
    async fn init_client(
        &self,
        api_key: &str,
        model_name: &str,
        api_endpoint: Option<&str>,
    ) -> Result<Box<dyn ModelClient>, LlmError>;

    /// Extract the generated text from a raw provider result.
    ///
    /// Failures here flow into the same classification path as generation
    /// failures. An empty or whitespace-only result is an invalid-request
    /// error.
    fn extract_text(&self, result: &ProviderResult) -> Result<String, LlmError>;
}
