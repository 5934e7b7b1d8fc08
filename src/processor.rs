//! Per-model retry controller.
//!
//! Drives one remote generation call through a bounded retry loop:
//!
//! ```text
//! Ready ──► Invoking ──► Succeeded
//!              │
//!              ▼
//!          Classifying ──► Stopped (terminal classified error)
//!              │
//!              ▼
//!           Waiting ──────► Stopped (cancelled)
//!              │
//!              └──────loop──► Invoking
//! ```
//!
//! One [`ModelProcessor::process`] call owns all of its state; concurrent
//! sessions for different models share nothing mutable. The only suspension
//! point between attempts is a wait that races the retry timer against the
//! caller's cancellation token.

use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::audit::{AuditRecord, AuditSink};
use crate::config::Config;
use crate::llm::{ApiService, ErrorCategory, LlmError, ModelClient};

/// Wait primitive used between attempts.
///
/// Production waits can run tens of seconds, so the timer is injected per
/// processor instance: the default wraps `tokio::time::sleep`, and tests
/// substitute instant, recording, or never-firing timers to drive the retry
/// loop without real elapsed time.
pub type TimerFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

fn wall_clock_timer() -> TimerFn {
    Arc::new(|duration| Box::pin(tokio::time::sleep(duration)))
}

/// Terminal outcome of a processing session that produced no text.
///
/// Callers distinguish "exhausted retries on a transient cause" from
/// "non-retryable cause" through [`ProcessError::category`], and
/// cancellation from both through [`ProcessError::is_cancelled`].
#[derive(Debug, Error)]
pub enum ProcessError {
    /// The final attempt's classified failure, category and message intact.
    #[error(transparent)]
    Llm(#[from] LlmError),
    /// The caller cancelled while the session was waiting to retry.
    #[error("cancelled while waiting to retry")]
    Cancelled,
}

impl ProcessError {
    /// Identity check distinguishing cancellation from classified failures.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessError::Cancelled)
    }

    /// The failure category, when the error is a classified failure.
    pub fn category(&self) -> Option<ErrorCategory> {
        match self {
            ProcessError::Llm(err) => Some(err.category()),
            ProcessError::Cancelled => None,
        }
    }
}

/// Drives a single model invocation with retry and recovery.
pub struct ModelProcessor {
    api: Arc<dyn ApiService>,
    audit: Arc<dyn AuditSink>,
    config: Config,
    timer: TimerFn,
}

impl ModelProcessor {
    pub fn new(api: Arc<dyn ApiService>, audit: Arc<dyn AuditSink>, config: Config) -> Self {
        Self {
            api,
            audit,
            config,
            timer: wall_clock_timer(),
        }
    }

    /// Replace the wait primitive for this instance.
    pub fn with_timer(mut self, timer: TimerFn) -> Self {
        self.timer = timer;
        self
    }

    /// Run one generation request against `model_name` to completion.
    ///
    /// Transient failures are retried up to the configured attempt budget,
    /// waiting between attempts. `cancel` interrupts only the waiting
    /// state; an in-flight remote call is never aborted. Terminal errors
    /// carry the final attempt's classification unchanged.
    pub async fn process(
        &self,
        cancel: &CancellationToken,
        model_name: &str,
        prompt: &str,
    ) -> Result<String, ProcessError> {
        let client = match self
            .api
            .init_client(
                &self.config.api_key,
                model_name,
                self.config.api_endpoint.as_deref(),
            )
            .await
        {
            Ok(client) => client,
            Err(err) => {
                tracing::error!("Client initialization for {} failed: {}", model_name, err);
                return Err(err.into());
            }
        };

        let mut attempt: u32 = 1;

        loop {
            self.audit
                .record(AuditRecord::attempt_started(model_name, attempt));

            match self.attempt_once(client.as_ref(), model_name, prompt).await {
                Ok(text) => {
                    if attempt > 1 {
                        tracing::info!(
                            "Generation for {} succeeded on attempt {}",
                            model_name,
                            attempt
                        );
                    }
                    self.audit.record(AuditRecord::succeeded(model_name, attempt));
                    return Ok(text);
                }
                Err(err) => {
                    if !self.config.retry.should_retry(&err, attempt) {
                        tracing::error!(
                            "Generation for {} failed terminally on attempt {} with {} error: {}",
                            model_name,
                            attempt,
                            err.category(),
                            err.message()
                        );
                        self.audit.record(AuditRecord::failed(model_name, attempt, &err));
                        return Err(err.into());
                    }

                    let wait = self.config.retry.next_wait(&err);
                    tracing::warn!(
                        "Attempt {} for {} failed with {} error, retrying in {:?}: {}",
                        attempt,
                        model_name,
                        err.category(),
                        wait,
                        err.message()
                    );
                    self.audit
                        .record(AuditRecord::retrying(model_name, attempt, &err, wait));

                    if self.wait_or_cancel(cancel, wait).await.is_err() {
                        tracing::warn!(
                            "Processing for {} cancelled while waiting to retry",
                            model_name
                        );
                        self.audit.record(AuditRecord::cancelled(model_name, attempt));
                        return Err(ProcessError::Cancelled);
                    }

                    attempt += 1;
                }
            }
        }
    }

    /// One invocation: remote generation plus text extraction. An error
    /// from either step reaches the classification path identically.
    async fn attempt_once(
        &self,
        client: &dyn ModelClient,
        model_name: &str,
        prompt: &str,
    ) -> Result<String, LlmError> {
        let raw = client.generate(model_name, prompt).await?;
        self.api.extract_text(&raw)
    }

    /// Race the retry timer against cancellation. Cancellation wins the
    /// race even when the timer is already due, so aborting never waits
    /// on the timer.
    async fn wait_or_cancel(
        &self,
        cancel: &CancellationToken,
        wait: Duration,
    ) -> Result<(), ProcessError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ProcessError::Cancelled),
            _ = (self.timer)(wait) => Ok(()),
        }
    }
}
