//! Attempt-boundary audit records.
//!
//! The processor reports every attempt start, retry decision, and terminal
//! outcome to an [`AuditSink`]. Sinks are side-effecting only; they never
//! influence control flow or return values.

use std::time::Duration;

use crate::llm::{ErrorCategory, LlmError};

/// Status carried by one audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditStatus {
    /// An invocation is about to start.
    Started,
    /// The session returned generated text.
    Succeeded,
    /// The attempt failed with a transient cause; a wait was scheduled.
    Retrying,
    /// The session ended with a classified failure.
    Failed,
    /// The session was cancelled while waiting to retry.
    Cancelled,
}

/// One entry in the audit trail of a processing session.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Model the session is invoking.
    pub model: String,
    /// 1-based invocation ordinal this record refers to.
    pub attempt: u32,
    pub status: AuditStatus,
    /// Failure category, for records produced by a classified failure.
    pub category: Option<ErrorCategory>,
    /// Failure message, for records produced by a classified failure.
    pub message: Option<String>,
    /// Wait chosen before the next attempt. Only set for `Retrying`.
    pub wait: Option<Duration>,
}

impl AuditRecord {
    fn new(model: &str, attempt: u32, status: AuditStatus) -> Self {
        Self {
            model: model.to_string(),
            attempt,
            status,
            category: None,
            message: None,
            wait: None,
        }
    }

    fn with_error(mut self, err: &LlmError) -> Self {
        self.category = Some(err.category());
        self.message = Some(err.to_string());
        self
    }

    pub(crate) fn attempt_started(model: &str, attempt: u32) -> Self {
        Self::new(model, attempt, AuditStatus::Started)
    }

    pub(crate) fn succeeded(model: &str, attempt: u32) -> Self {
        Self::new(model, attempt, AuditStatus::Succeeded)
    }

    pub(crate) fn retrying(model: &str, attempt: u32, err: &LlmError, wait: Duration) -> Self {
        let mut record = Self::new(model, attempt, AuditStatus::Retrying).with_error(err);
        record.wait = Some(wait);
        record
    }

    pub(crate) fn failed(model: &str, attempt: u32, err: &LlmError) -> Self {
        Self::new(model, attempt, AuditStatus::Failed).with_error(err)
    }

    pub(crate) fn cancelled(model: &str, attempt: u32) -> Self {
        Self::new(model, attempt, AuditStatus::Cancelled)
    }
}

/// Destination for audit records.
pub trait AuditSink: Send + Sync {
    fn record(&self, record: AuditRecord);
}

/// Audit sink that emits structured `tracing` events. Production default.
#[derive(Debug, Default)]
pub struct TracingAudit;

impl AuditSink for TracingAudit {
    fn record(&self, record: AuditRecord) {
        let message = record.message.as_deref().unwrap_or("");
        match record.status {
            AuditStatus::Started => tracing::debug!(
                "Audit: attempt {} for {} started",
                record.attempt,
                record.model
            ),
            AuditStatus::Succeeded => tracing::info!(
                "Audit: attempt {} for {} succeeded",
                record.attempt,
                record.model
            ),
            AuditStatus::Retrying => tracing::warn!(
                "Audit: attempt {} for {} will be retried in {:?}: {}",
                record.attempt,
                record.model,
                record.wait.unwrap_or_default(),
                message
            ),
            AuditStatus::Failed => tracing::error!(
                "Audit: attempt {} for {} failed terminally: {}",
                record.attempt,
                record.model,
                message
            ),
            AuditStatus::Cancelled => tracing::warn!(
                "Audit: processing for {} cancelled after {} attempts",
                record.model,
                record.attempt
            ),
        }
    }
}

/// Audit sink that drops every record.
#[derive(Debug, Default)]
pub struct NoopAudit;

impl AuditSink for NoopAudit {
    fn record(&self, _record: AuditRecord) {}
}
