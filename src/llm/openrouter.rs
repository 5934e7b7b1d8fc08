//! OpenRouter API client implementation.
//!
//! Performs exactly one request per [`ModelClient::generate`] call. Failure
//! classification happens here, at the point the raw failure is observed;
//! the retry loop lives in [`crate::processor`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::error::{ErrorCategory, LlmError};
use super::{ApiService, ModelClient, ProviderResult, TokenUsage};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// OpenRouter chat-completions client.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl OpenRouterClient {
    /// Create a new client against the default OpenRouter endpoint.
    pub fn new(api_key: String) -> Self {
        Self::with_endpoint(api_key, OPENROUTER_API_URL.to_string())
    }

    /// Create a client against a non-default endpoint (proxies, gateways,
    /// test servers).
    pub fn with_endpoint(api_key: String, endpoint: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            endpoint,
        }
    }

    /// Parse Retry-After header if present (seconds form only).
    fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
        headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok().map(Duration::from_secs))
    }
}

#[async_trait]
impl ModelClient for OpenRouterClient {
    async fn generate(&self, model: &str, prompt: &str) -> Result<ProviderResult, LlmError> {
        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
        };

        tracing::debug!("Sending generation request to OpenRouter: model={}", model);

        let response = match self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                // Network or connection error
                return Err(if e.is_timeout() {
                    LlmError::wrap(e, "request timeout", ErrorCategory::Network)
                } else if e.is_connect() {
                    LlmError::wrap(e, "connection failed", ErrorCategory::Network)
                } else {
                    LlmError::wrap(e, "request failed", ErrorCategory::Network)
                });
            }
        };

        let status = response.status();
        let retry_after = Self::parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), &body, retry_after));
        }

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            LlmError::invalid_request(format!("failed to parse response: {}, body: {}", e, body))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::invalid_request("no choices in response"))?;

        // Policy rejections surface as a finish reason, not a status code.
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(LlmError::content_filtered(
                "response blocked by provider content filter",
            ));
        }

        Ok(ProviderResult {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
            usage: parsed
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }
}

/// Production [`ApiService`] backed by OpenRouter.
#[derive(Debug, Default)]
pub struct OpenRouterService;

#[async_trait]
impl ApiService for OpenRouterService {
    async fn init_client(
        &self,
        api_key: &str,
        _model_name: &str,
        api_endpoint: Option<&str>,
    ) -> Result<Box<dyn ModelClient>, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::auth_error("missing OpenRouter API key"));
        }
        let client = match api_endpoint {
            Some(url) => OpenRouterClient::with_endpoint(api_key.to_string(), url.to_string()),
            None => OpenRouterClient::new(api_key.to_string()),
        };
        Ok(Box::new(client))
    }

    fn extract_text(&self, result: &ProviderResult) -> Result<String, LlmError> {
        match result.content.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => Ok(text.to_string()),
            _ => Err(LlmError::invalid_request("provider returned empty content")),
        }
    }
}

/// OpenRouter API request format (OpenAI-compatible subset).
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

/// OpenRouter API response format.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

/// A choice in the OpenRouter response.
#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

/// Message in OpenRouter response.
#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Usage data (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_after_seconds_parsed() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert("retry-after", "12".parse().unwrap());
        assert_eq!(
            OpenRouterClient::parse_retry_after(&headers),
            Some(Duration::from_secs(12))
        );
    }

    #[test]
    fn retry_after_http_date_ignored() {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "retry-after",
            "Wed, 21 Oct 2026 07:28:00 GMT".parse().unwrap(),
        );
        assert_eq!(OpenRouterClient::parse_retry_after(&headers), None);
    }

    #[test]
    fn extract_text_trims_content() {
        let service = OpenRouterService;
        let result = ProviderResult::with_content("  review text\n");
        assert_eq!(service.extract_text(&result).unwrap(), "review text");
    }

    #[test]
    fn extract_text_rejects_empty_content() {
        let service = OpenRouterService;

        let missing = ProviderResult::default();
        let err = service.extract_text(&missing).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidRequest);
        assert!(!err.retry_possible());

        let blank = ProviderResult::with_content("   \n");
        let err = service.extract_text(&blank).unwrap_err();
        assert_eq!(err.category(), ErrorCategory::InvalidRequest);
    }

    #[tokio::test]
    async fn init_client_requires_api_key() {
        let service = OpenRouterService;
        let err = service
            .init_client("", "test-model", None)
            .await
            .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Auth);
    }
}
