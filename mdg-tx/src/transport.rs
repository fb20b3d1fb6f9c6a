//! Retryable transport
//!
//! Delivers one sanitized record over a [`Channel`] under a
//! [`BackoffConfig`]. Attempt 0 fires immediately; each transient failure
//! with budget remaining suspends for the backoff delay before the next
//! attempt. Permanent failures short-circuit without retry. The wait is
//! cooperative and cancellable: a cancellation signal observed before or
//! during a wait resolves the record as abandoned without further
//! attempts.
//!
//! Every attempt is recorded - delivery never loses the history of how a
//! record made it (or didn't) across the link.

use chrono::{DateTime, Utc};
use mdg_common::SanitizedRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::BackoffConfig;
use crate::channel::{Channel, SendOutcome};

/// One send attempt, append-only per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferAttempt {
    /// 0-based attempt index
    pub index: u32,
    /// Wait performed before this attempt (zero for attempt 0);
    /// reflects the actual, possibly jittered, delay
    pub delay_before: Duration,
    /// What the channel reported
    pub outcome: SendOutcome,
    /// When the attempt fired
    pub timestamp: DateTime<Utc>,
}

/// Why a record was given up on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AbandonReason {
    /// Attempt budget exhausted on transient failures
    RetriesExhausted,
    /// Channel reported an unrecoverable fault
    Permanent,
    /// Sanitization failed; the record never reached the transport
    PolicyViolation,
    /// External cancellation observed before or during a wait
    Cancelled,
}

/// Final status of one record's transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeliveryOutcome {
    /// Record reached the destination
    Delivered { attempts: Vec<TransferAttempt> },
    /// Record was given up on
    Abandoned {
        attempts: Vec<TransferAttempt>,
        reason: AbandonReason,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }

    /// Full attempt history, in firing order.
    pub fn attempts(&self) -> &[TransferAttempt] {
        match self {
            DeliveryOutcome::Delivered { attempts } => attempts,
            DeliveryOutcome::Abandoned { attempts, .. } => attempts,
        }
    }

    pub fn abandon_reason(&self) -> Option<AbandonReason> {
        match self {
            DeliveryOutcome::Delivered { .. } => None,
            DeliveryOutcome::Abandoned { reason, .. } => Some(*reason),
        }
    }
}

/// Deliver one sanitized record with bounded retry.
///
/// Returns the full attempt history either way; this function never
/// errors - every failure mode is a [`DeliveryOutcome`].
pub async fn deliver(
    record: &SanitizedRecord,
    channel: &dyn Channel,
    backoff: &BackoffConfig,
    cancel: &CancellationToken,
) -> DeliveryOutcome {
    let mut attempts: Vec<TransferAttempt> = Vec::new();

    for attempt in 0..backoff.max_attempts() {
        if cancel.is_cancelled() {
            warn!(
                record_id = %record.id(),
                attempt,
                "Delivery cancelled before attempt"
            );
            return DeliveryOutcome::Abandoned {
                attempts,
                reason: AbandonReason::Cancelled,
            };
        }

        let delay = if attempt == 0 {
            Duration::ZERO
        } else {
            let delay = backoff.next_delay(attempt - 1);
            debug!(
                record_id = %record.id(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Backing off before retry"
            );
            tokio::select! {
                _ = cancel.cancelled() => {
                    warn!(
                        record_id = %record.id(),
                        attempt,
                        "Delivery cancelled during backoff wait"
                    );
                    return DeliveryOutcome::Abandoned {
                        attempts,
                        reason: AbandonReason::Cancelled,
                    };
                }
                _ = tokio::time::sleep(delay) => {}
            }
            delay
        };

        let outcome = channel.send(record).await;
        attempts.push(TransferAttempt {
            index: attempt,
            delay_before: delay,
            outcome,
            timestamp: Utc::now(),
        });

        match outcome {
            SendOutcome::Success => {
                info!(
                    record_id = %record.id(),
                    channel = channel.name(),
                    attempts = attempts.len(),
                    "Record delivered"
                );
                return DeliveryOutcome::Delivered { attempts };
            }
            SendOutcome::TransientFailure => {
                warn!(
                    record_id = %record.id(),
                    channel = channel.name(),
                    attempt,
                    remaining = backoff.max_attempts() - attempt - 1,
                    "Transient delivery failure"
                );
            }
            SendOutcome::PermanentFailure => {
                warn!(
                    record_id = %record.id(),
                    channel = channel.name(),
                    attempt,
                    "Permanent delivery failure, not retrying"
                );
                return DeliveryOutcome::Abandoned {
                    attempts,
                    reason: AbandonReason::Permanent,
                };
            }
        }
    }

    warn!(
        record_id = %record.id(),
        max_attempts = backoff.max_attempts(),
        "Retry budget exhausted"
    );
    DeliveryOutcome::Abandoned {
        attempts,
        reason: AbandonReason::RetriesExhausted,
    }
}
