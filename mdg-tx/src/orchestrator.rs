//! Batch orchestrator
//!
//! Drives sanitize-then-deliver across a collection of records and
//! aggregates exactly one [`DeliveryOutcome`] per processed record into a
//! [`BatchReport`].
//!
//! # Error Handling
//! - Per-record error isolation: a policy violation is recorded as an
//!   immediate abandonment and processing continues - one bad record
//!   never aborts the batch
//! - Records are processed in input order; an optional cap leaves excess
//!   records untouched and unreported
//! - Cancellation resolves the in-flight record as abandoned and stops
//!   the batch without disturbing completed outcomes

use chrono::{DateTime, Utc};
use mdg_common::Record;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backoff::BackoffConfig;
use crate::channel::Channel;
use crate::policy::SanitizationPolicy;
use crate::sanitizer::sanitize;
use crate::transport::{deliver, AbandonReason, DeliveryOutcome};

/// Final status of one record within a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordOutcome {
    /// Identifier of the source record
    pub record_id: String,
    /// Origin station (for fleet-level fault attribution)
    pub station_id: String,
    pub outcome: DeliveryOutcome,
}

/// Aggregate report for one batch run. Immutable once returned; counts
/// always satisfy `delivered + abandoned == total`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Records processed (equal to `outcomes.len()`, not the input length
    /// when a cap applies)
    pub total: usize,
    pub delivered: usize,
    pub abandoned: usize,
    /// Send attempts issued across all records
    pub total_attempts: usize,
    /// Wall-clock duration of the run
    pub elapsed: Duration,
    /// Per-record outcomes, in input order
    pub outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    /// Identifiers of records that reached the destination, in input
    /// order. This set feeds the fleet QC stage.
    pub fn delivered_ids(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| o.outcome.is_delivered())
            .map(|o| o.record_id.as_str())
            .collect()
    }
}

/// Sanitize-and-deliver driver for a whole batch.
pub struct BatchOrchestrator {
    policy: SanitizationPolicy,
    backoff: BackoffConfig,
    record_cap: Option<usize>,
}

impl BatchOrchestrator {
    pub fn new(policy: SanitizationPolicy, backoff: BackoffConfig) -> Self {
        Self {
            policy,
            backoff,
            record_cap: None,
        }
    }

    /// Limit the number of records processed per invocation. Records past
    /// the cap are left untouched and do not appear in the report.
    pub fn with_record_cap(mut self, cap: usize) -> Self {
        self.record_cap = Some(cap);
        self
    }

    /// Process `records` in order: sanitize each, then deliver over
    /// `channel` under the configured backoff.
    ///
    /// Never fails as a whole - every per-record failure is captured in
    /// that record's outcome.
    pub async fn run(
        &self,
        records: &[Record],
        channel: &dyn Channel,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let batch_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();

        let batch = match self.record_cap {
            Some(cap) => &records[..records.len().min(cap)],
            None => records,
        };

        info!(
            batch_id = %batch_id,
            total = batch.len(),
            channel = channel.name(),
            "Starting batch transfer"
        );

        let mut outcomes: Vec<RecordOutcome> = Vec::with_capacity(batch.len());
        let mut delivered = 0usize;
        let mut abandoned = 0usize;
        let mut total_attempts = 0usize;

        for (index, record) in batch.iter().enumerate() {
            debug!(
                batch_id = %batch_id,
                record_id = %record.id,
                progress = format!("{}/{}", index + 1, batch.len()),
                "Processing record"
            );

            let outcome = match sanitize(record, &self.policy) {
                Ok(sanitized) => deliver(&sanitized, channel, &self.backoff, cancel).await,
                Err(error) => {
                    warn!(
                        batch_id = %batch_id,
                        record_id = %record.id,
                        error = %error,
                        "Sanitization failed, abandoning record"
                    );
                    DeliveryOutcome::Abandoned {
                        attempts: Vec::new(),
                        reason: AbandonReason::PolicyViolation,
                    }
                }
            };

            if outcome.is_delivered() {
                delivered += 1;
            } else {
                abandoned += 1;
            }
            total_attempts += outcome.attempts().len();
            let cancelled = outcome.abandon_reason() == Some(AbandonReason::Cancelled);
            outcomes.push(RecordOutcome {
                record_id: record.id.clone(),
                station_id: record.station_id.clone(),
                outcome,
            });

            if cancelled {
                info!(
                    batch_id = %batch_id,
                    processed = outcomes.len(),
                    "Batch cancelled, remaining records untouched"
                );
                break;
            }
        }

        let report = BatchReport {
            batch_id,
            started_at,
            total: outcomes.len(),
            delivered,
            abandoned,
            total_attempts,
            elapsed: start.elapsed(),
            outcomes,
        };

        info!(
            batch_id = %batch_id,
            total = report.total,
            delivered = report.delivered,
            abandoned = report.abandoned,
            total_attempts = report.total_attempts,
            "Batch transfer complete"
        );
        report
    }
}
