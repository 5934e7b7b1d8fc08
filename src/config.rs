//! Engine configuration.
//!
//! Environment variables provide the production defaults, the way the
//! surrounding tool wires the engine up; tests build [`Config`] directly.

use anyhow::Context;

use crate::llm::RetryConfig;

/// Configuration for one [`crate::processor::ModelProcessor`].
#[derive(Debug, Clone)]
pub struct Config {
    /// Provider API key.
    pub api_key: String,
    /// Override for the provider endpoint (proxies, self-hosted gateways).
    pub api_endpoint: Option<String>,
    /// Attempt budget for each processing session.
    pub retry: RetryConfig,
}

impl Config {
    /// Build a config with the default retry policy.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_endpoint: None,
            retry: RetryConfig::default(),
        }
    }

    /// Read configuration from the environment.
    ///
    /// - `OPENROUTER_API_KEY` — provider key (required)
    /// - `OPENROUTER_API_URL` — endpoint override (optional)
    pub fn from_env() -> anyhow::Result<Self> {
        let api_key =
            std::env::var("OPENROUTER_API_KEY").context("OPENROUTER_API_KEY is not set")?;
        Ok(Self {
            api_key,
            api_endpoint: std::env::var("OPENROUTER_API_URL").ok(),
            retry: RetryConfig::default(),
        })
    }
}
