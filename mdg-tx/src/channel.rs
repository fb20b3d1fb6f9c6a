//! Delivery channel boundary
//!
//! The transport treats the destination as an opaque capability: anything
//! implementing [`Channel`] can receive sanitized records. The gateway
//! ships simulation channels only - real network transports live outside
//! the core and plug in through the same trait.
//!
//! Simulation variants:
//! - [`AlwaysSucceedChannel`] - every send succeeds
//! - [`AlwaysTransientChannel`] - every send fails transiently
//! - [`FlakyChannel`] - seeded random failure rate (unstable 4G/LTE model)
//! - [`ScriptedChannel`] - fixed outcome sequence for deterministic tests

use async_trait::async_trait;
use mdg_common::SanitizedRecord;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Result of one send over the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SendOutcome {
    /// Record accepted by the destination
    Success,
    /// Recoverable fault (connection drop, timeout); retried per backoff
    TransientFailure,
    /// Unrecoverable fault (malformed payload, rejected credentials);
    /// never retried
    PermanentFailure,
}

/// Destination capability for sanitized records.
///
/// Implementations decide success or failure per their own policy; the
/// transport only classifies the returned outcome.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name for log provenance
    fn name(&self) -> &'static str;

    /// Attempt to deliver one sanitized record.
    async fn send(&self, record: &SanitizedRecord) -> SendOutcome;
}

/// Channel that accepts every record.
#[derive(Debug, Default)]
pub struct AlwaysSucceedChannel;

#[async_trait]
impl Channel for AlwaysSucceedChannel {
    fn name(&self) -> &'static str {
        "always-succeed"
    }

    async fn send(&self, _record: &SanitizedRecord) -> SendOutcome {
        SendOutcome::Success
    }
}

/// Channel that fails every send transiently.
#[derive(Debug, Default)]
pub struct AlwaysTransientChannel;

#[async_trait]
impl Channel for AlwaysTransientChannel {
    fn name(&self) -> &'static str {
        "always-transient"
    }

    async fn send(&self, _record: &SanitizedRecord) -> SendOutcome {
        SendOutcome::TransientFailure
    }
}

/// Channel that drops sends at a configured rate.
///
/// Models the unstable uplink of a mobile unit. Seeded so that test runs
/// and replays are reproducible.
#[derive(Debug)]
pub struct FlakyChannel {
    failure_rate: f64,
    rng: Mutex<StdRng>,
}

impl FlakyChannel {
    /// `failure_rate` is clamped to [0.0, 1.0].
    pub fn new(failure_rate: f64, seed: u64) -> Self {
        Self {
            failure_rate: failure_rate.clamp(0.0, 1.0),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

#[async_trait]
impl Channel for FlakyChannel {
    fn name(&self) -> &'static str {
        "flaky"
    }

    async fn send(&self, _record: &SanitizedRecord) -> SendOutcome {
        let roll: f64 = {
            let mut rng = self.rng.lock().expect("flaky channel rng poisoned");
            rng.gen()
        };
        if roll < self.failure_rate {
            SendOutcome::TransientFailure
        } else {
            SendOutcome::Success
        }
    }
}

/// Channel that replays a fixed outcome sequence, then succeeds.
#[derive(Debug)]
pub struct ScriptedChannel {
    script: Mutex<VecDeque<SendOutcome>>,
}

impl ScriptedChannel {
    pub fn new(script: impl IntoIterator<Item = SendOutcome>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn send(&self, _record: &SanitizedRecord) -> SendOutcome {
        self.script
            .lock()
            .expect("scripted channel poisoned")
            .pop_front()
            .unwrap_or(SendOutcome::Success)
    }
}
