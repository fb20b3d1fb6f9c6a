//! # MDG Transfer Pipeline
//!
//! Resilient batch transfer for the Mobile Diagnostics Gateway:
//! - **Sanitization**: declarative per-field de-identification rules with a
//!   mandatory post-pass verification ([`policy`], [`sanitizer`])
//! - **Delivery**: retry/backoff-governed transfer over a caller-supplied
//!   channel capability ([`channel`], [`backoff`], [`transport`])
//! - **Orchestration**: per-record fault isolation across a whole batch,
//!   producing an ordered [`orchestrator::BatchReport`]
//!
//! # Error Handling
//! - Per-record error isolation: a policy violation or exhausted retry
//!   budget never aborts the batch
//! - Permanent channel failures are never retried
//! - Cancellation resolves the in-flight record as abandoned and leaves
//!   completed outcomes untouched

pub mod backoff;
pub mod channel;
pub mod orchestrator;
pub mod policy;
pub mod sanitizer;
pub mod transport;

pub use backoff::BackoffConfig;
pub use channel::{
    AlwaysSucceedChannel, AlwaysTransientChannel, Channel, FlakyChannel, ScriptedChannel,
    SendOutcome,
};
pub use orchestrator::{BatchOrchestrator, BatchReport, RecordOutcome};
pub use policy::{SanitizationPolicy, TagAction};
pub use sanitizer::sanitize;
pub use transport::{deliver, AbandonReason, DeliveryOutcome, TransferAttempt};
