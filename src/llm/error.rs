//! Failure taxonomy and retry policy for remote model calls.
//!
//! Every failure surfaced by a provider client is classified into an
//! [`ErrorCategory`] exactly once, at the point the raw failure is observed.
//! The category fixes retry eligibility and the recovery wait; the retry
//! loop in [`crate::processor`] consumes both and never re-derives them.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Maximum invocations per retry session, counting the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Recovery wait after a transient network failure.
pub const NETWORK_RETRY_WAIT: Duration = Duration::from_secs(30);

/// Recovery wait after provider throttling. Rate limits are typically
/// enforced on minute-scale windows, hence the longer cool-down.
pub const RATE_LIMIT_RETRY_WAIT: Duration = Duration::from_secs(60);

/// Recovery wait after a 5xx response that carried no Retry-After hint.
pub const SERVER_RETRY_WAIT: Duration = Duration::from_secs(30);

/// Classification bucket for a failed remote call.
///
/// The set is closed; every match over it in this crate is exhaustive so
/// that a new category forces each policy site to be revisited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection failure, timeout, or other transport-level error.
    Network,
    /// HTTP 429 or provider-reported throttling.
    RateLimit,
    /// Invalid or expired credentials.
    Auth,
    /// The provider rejected the prompt or response on policy grounds.
    ContentFiltered,
    /// Malformed request, or a response payload the caller cannot use.
    InvalidRequest,
    /// Provider-side 5xx failure.
    Server,
    /// Unrecognized failure. Fails closed: never retried.
    Unknown,
}

impl ErrorCategory {
    /// Whether another attempt is policy-permitted for this category.
    pub fn retry_possible(self) -> bool {
        match self {
            ErrorCategory::Network | ErrorCategory::RateLimit | ErrorCategory::Server => true,
            ErrorCategory::Auth
            | ErrorCategory::ContentFiltered
            | ErrorCategory::InvalidRequest
            | ErrorCategory::Unknown => false,
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Network => "network",
            ErrorCategory::RateLimit => "rate limit",
            ErrorCategory::Auth => "auth",
            ErrorCategory::ContentFiltered => "content filtered",
            ErrorCategory::InvalidRequest => "invalid request",
            ErrorCategory::Server => "server",
            ErrorCategory::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Map an HTTP status code to a failure category.
///
/// Codes this engine has no policy for classify as [`ErrorCategory::Unknown`]
/// and are therefore not retried.
pub fn classify_http_status(status: u16) -> ErrorCategory {
    match status {
        401 | 403 => ErrorCategory::Auth,
        429 => ErrorCategory::RateLimit,
        400 | 404 | 422 => ErrorCategory::InvalidRequest,
        500..=599 => ErrorCategory::Server,
        _ => ErrorCategory::Unknown,
    }
}

/// A classified failure from a remote model call.
///
/// The category, retry eligibility, and any provider wait hint are fixed
/// when the error is built and travel with it. Wrapping or re-surfacing an
/// `LlmError` never reclassifies it.
#[derive(Debug, Error)]
#[error("{category} error: {message}")]
pub struct LlmError {
    category: ErrorCategory,
    message: String,
    retry_after: Option<Duration>,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl LlmError {
    /// Build an error with an explicit category.
    pub fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            retry_after: None,
            source: None,
        }
    }

    /// Wrap an underlying failure, assigning its category.
    pub fn wrap(
        source: impl std::error::Error + Send + Sync + 'static,
        message: impl Into<String>,
        category: ErrorCategory,
    ) -> Self {
        Self {
            category,
            message: message.into(),
            retry_after: None,
            source: Some(Box::new(source)),
        }
    }

    /// Build a classified error from an HTTP failure status and body.
    ///
    /// `retry_after` is the provider's wait hint, if the response carried
    /// one; it takes precedence over category defaults when retrying.
    pub fn from_status(status: u16, body: &str, retry_after: Option<Duration>) -> Self {
        Self {
            category: classify_http_status(status),
            message: format!("HTTP {status}: {body}"),
            retry_after,
            source: None,
        }
    }

    pub fn network_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Network, message)
    }

    pub fn rate_limited(message: impl Into<String>, retry_after: Option<Duration>) -> Self {
        Self {
            retry_after,
            ..Self::new(ErrorCategory::RateLimit, message)
        }
    }

    pub fn auth_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Auth, message)
    }

    pub fn content_filtered(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::ContentFiltered, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::InvalidRequest, message)
    }

    pub fn server_error(status: u16, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Server, format!("HTTP {status}: {}", message.into()))
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Unknown, message)
    }

    /// The category assigned at classification time.
    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    /// Whether another attempt is policy-permitted. Derived from the
    /// category once; never recomputed independently of it.
    pub fn retry_possible(&self) -> bool {
        self.category.retry_possible()
    }

    /// Human-readable failure message, without the category prefix.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Estimated wait before the next attempt.
    ///
    /// A non-zero provider hint is returned verbatim. Otherwise the
    /// category's recovery default applies; categories without a concrete
    /// signal return `None` and leave the choice to [`RetryConfig::next_wait`].
    pub fn estimated_wait(&self) -> Option<Duration> {
        if let Some(hint) = self.retry_after.filter(|d| !d.is_zero()) {
            return Some(hint);
        }
        match self.category {
            ErrorCategory::Network => Some(NETWORK_RETRY_WAIT),
            ErrorCategory::RateLimit => Some(RATE_LIMIT_RETRY_WAIT),
            ErrorCategory::Server
            | ErrorCategory::Auth
            | ErrorCategory::ContentFiltered
            | ErrorCategory::InvalidRequest
            | ErrorCategory::Unknown => None,
        }
    }
}

/// Attempt budget and wait policy for one retry session.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum invocations per session, counting the first.
    pub max_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: MAX_ATTEMPTS,
        }
    }
}

impl RetryConfig {
    /// Whether the session may attempt again after `attempts_made`
    /// invocations, the last of which failed with `err`.
    pub fn should_retry(&self, err: &LlmError, attempts_made: u32) -> bool {
        err.retry_possible() && attempts_made < self.max_attempts
    }

    /// Wait before the next attempt.
    ///
    /// An estimate carried by the error wins over the category default.
    /// Waits are fixed per category rather than growing with the attempt
    /// index; the remote reset hint predicts recovery better than an
    /// exponential curve would.
    pub fn next_wait(&self, err: &LlmError) -> Duration {
        if let Some(estimate) = err.estimated_wait().filter(|d| !d.is_zero()) {
            return estimate;
        }
        match err.category() {
            ErrorCategory::Network => NETWORK_RETRY_WAIT,
            ErrorCategory::RateLimit => RATE_LIMIT_RETRY_WAIT,
            ErrorCategory::Server => SERVER_RETRY_WAIT,
            // Non-retryable categories never reach the waiting state.
            ErrorCategory::Auth
            | ErrorCategory::ContentFiltered
            | ErrorCategory::InvalidRequest
            | ErrorCategory::Unknown => Duration::ZERO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_auth_statuses() {
        assert_eq!(classify_http_status(401), ErrorCategory::Auth);
        assert_eq!(classify_http_status(403), ErrorCategory::Auth);
    }

    #[test]
    fn classify_rate_limit_status() {
        assert_eq!(classify_http_status(429), ErrorCategory::RateLimit);
    }

    #[test]
    fn classify_invalid_request_statuses() {
        assert_eq!(classify_http_status(400), ErrorCategory::InvalidRequest);
        assert_eq!(classify_http_status(404), ErrorCategory::InvalidRequest);
        assert_eq!(classify_http_status(422), ErrorCategory::InvalidRequest);
    }

    #[test]
    fn classify_server_statuses() {
        assert_eq!(classify_http_status(500), ErrorCategory::Server);
        assert_eq!(classify_http_status(502), ErrorCategory::Server);
        assert_eq!(classify_http_status(503), ErrorCategory::Server);
    }

    #[test]
    fn unrecognized_statuses_fail_closed() {
        assert_eq!(classify_http_status(418), ErrorCategory::Unknown);
        assert_eq!(classify_http_status(302), ErrorCategory::Unknown);
        assert!(!classify_http_status(418).retry_possible());
    }

    #[test]
    fn retry_eligibility_per_category() {
        assert!(ErrorCategory::Network.retry_possible());
        assert!(ErrorCategory::RateLimit.retry_possible());
        assert!(ErrorCategory::Server.retry_possible());
        assert!(!ErrorCategory::Auth.retry_possible());
        assert!(!ErrorCategory::ContentFiltered.retry_possible());
        assert!(!ErrorCategory::InvalidRequest.retry_possible());
        assert!(!ErrorCategory::Unknown.retry_possible());
    }

    #[test]
    fn estimated_wait_uses_category_defaults() {
        let network = LlmError::network_error("connection reset");
        assert_eq!(network.estimated_wait(), Some(NETWORK_RETRY_WAIT));

        let rate_limited = LlmError::rate_limited("throttled", None);
        assert_eq!(rate_limited.estimated_wait(), Some(RATE_LIMIT_RETRY_WAIT));

        let auth = LlmError::auth_error("bad key");
        assert_eq!(auth.estimated_wait(), None);
    }

    #[test]
    fn provider_hint_overrides_category_default() {
        let err = LlmError::rate_limited("throttled", Some(Duration::from_secs(5)));
        assert_eq!(err.estimated_wait(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn zero_hint_falls_back_to_default() {
        let err = LlmError::rate_limited("throttled", Some(Duration::ZERO));
        assert_eq!(err.estimated_wait(), Some(RATE_LIMIT_RETRY_WAIT));

        let config = RetryConfig::default();
        assert_eq!(config.next_wait(&err), RATE_LIMIT_RETRY_WAIT);
    }

    #[test]
    fn next_wait_server_default() {
        let config = RetryConfig::default();
        let err = LlmError::server_error(503, "unavailable");
        assert_eq!(config.next_wait(&err), SERVER_RETRY_WAIT);
    }

    #[test]
    fn next_wait_ignores_attempt_index() {
        // Fixed per-category waits: the same error yields the same wait no
        // matter how many attempts preceded it.
        let config = RetryConfig::default();
        let err = LlmError::network_error("blip");
        assert_eq!(config.next_wait(&err), NETWORK_RETRY_WAIT);
        assert_eq!(config.next_wait(&err), NETWORK_RETRY_WAIT);
    }

    #[test]
    fn should_retry_respects_budget_and_category() {
        let config = RetryConfig::default();
        let transient = LlmError::network_error("blip");
        assert!(config.should_retry(&transient, 1));
        assert!(config.should_retry(&transient, 2));
        assert!(!config.should_retry(&transient, 3));

        let fatal = LlmError::auth_error("bad key");
        assert!(!config.should_retry(&fatal, 1));
    }

    #[test]
    fn from_status_carries_retry_after() {
        let err = LlmError::from_status(429, "slow down", Some(Duration::from_secs(7)));
        assert_eq!(err.category(), ErrorCategory::RateLimit);
        assert!(err.retry_possible());
        assert_eq!(err.estimated_wait(), Some(Duration::from_secs(7)));
    }

    #[test]
    fn wrap_preserves_assigned_category() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset");
        let err = LlmError::wrap(io, "connection reset by peer", ErrorCategory::Network);
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.retry_possible());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn display_includes_category_and_message() {
        let err = LlmError::content_filtered("blocked by policy");
        assert_eq!(err.to_string(), "content filtered error: blocked by policy");
    }
}
