//! # Council model runner
//!
//! Per-model retry and recovery engine for the Council multi-model code
//! reviewer.
//!
//! Given a prompt and a target model, the engine calls the remote
//! generation API, classifies any failure into a recovery category, and
//! drives a bounded, cancellable retry loop until it can return the
//! generated text or a terminal classified error.
//!
//! ## Architecture
//!
//! ```text
//!        ┌───────────────────────────────┐
//!        │        ModelProcessor         │
//!        │  (invoke → classify → wait)   │
//!        └──────┬───────────────┬────────┘
//!               │               │
//!               ▼               ▼
//!        ┌────────────┐  ┌────────────┐
//!        │ ApiService │  │ AuditSink  │
//!        │ (provider) │  │ (tracing)  │
//!        └────────────┘  └────────────┘
//! ```
//!
//! The orchestrator that fans sessions out across many models and
//! synthesizes their outputs consumes this crate through
//! [`processor::ModelProcessor::process`]; each session is independent and
//! owns no shared mutable state.
//!
//! ## Modules
//! - `llm`: provider traits, the OpenRouter client, and the failure taxonomy
//! - `processor`: the retry state machine
//! - `audit`: attempt-boundary audit records
//! - `config`: engine configuration

pub mod audit;
pub mod config;
pub mod llm;
pub mod processor;

pub use audit::{AuditRecord, AuditSink, AuditStatus, NoopAudit, TracingAudit};
pub use config::Config;
pub use llm::{
    classify_http_status, ApiService, ErrorCategory, LlmError, ModelClient, OpenRouterClient,
    OpenRouterService, ProviderResult, RetryConfig, TokenUsage,
};
pub use processor::{ModelProcessor, ProcessError, TimerFn};
