//! Exponential backoff policy
//!
//! Delay growth is strictly exponential with a cap:
//!
//! ```text
//! delay = min(base_delay * 2^attempt_index, max_delay)
//! ```
//!
//! Optional jitter randomizes each delay within [0.5, 1.5]x of the
//! nominal value to spread reconnection bursts across a fleet. The
//! transport records the actual (jittered) delay in the attempt history.

use mdg_common::{config::TransferConfig, Error, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Retry budget and backoff shape for one delivery.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: bool,
}

impl BackoffConfig {
    /// Create a validated backoff policy.
    ///
    /// # Errors
    /// Returns `Error::Config` when `max_attempts < 1`, `base_delay` is
    /// zero, or `max_delay < base_delay`. These are construction-time
    /// fatal errors; the transport never re-validates.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Result<Self> {
        if max_attempts < 1 {
            return Err(Error::Config("max_attempts must be >= 1".to_string()));
        }
        if base_delay.is_zero() {
            return Err(Error::Config("base_delay must be > 0".to_string()));
        }
        if max_delay < base_delay {
            return Err(Error::Config(
                "max_delay must be >= base_delay".to_string(),
            ));
        }
        Ok(Self {
            max_attempts,
            base_delay,
            max_delay,
            jitter: false,
        })
    }

    /// Enable multiplicative jitter in [0.5, 1.5]x.
    pub fn with_jitter(mut self) -> Self {
        self.jitter = true;
        self
    }

    /// Build from the transfer section of the gateway config.
    pub fn from_config(config: &TransferConfig) -> Result<Self> {
        // Duration::from_secs_f64 panics on negative or non-finite input,
        // so the float bounds are checked before conversion.
        if !config.base_delay_s.is_finite() || config.base_delay_s <= 0.0 {
            return Err(Error::Config(
                "base_delay_s must be a positive number".to_string(),
            ));
        }
        if !config.max_delay_s.is_finite() || config.max_delay_s < config.base_delay_s {
            return Err(Error::Config(
                "max_delay_s must be >= base_delay_s".to_string(),
            ));
        }
        let backoff = Self::new(
            config.max_attempts,
            Duration::from_secs_f64(config.base_delay_s),
            Duration::from_secs_f64(config.max_delay_s),
        )?;
        Ok(if config.jitter {
            backoff.with_jitter()
        } else {
            backoff
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn jitter_enabled(&self) -> bool {
        self.jitter
    }

    /// Nominal (un-jittered) delay after failed attempt `attempt_index`.
    pub fn nominal_delay(&self, attempt_index: u32) -> Duration {
        // 2^63 seconds already dwarfs any cap; avoid f64 overflow on the
        // exponent for absurd attempt counts.
        let factor = 2f64.powi(attempt_index.min(63) as i32);
        let seconds = self.base_delay.as_secs_f64() * factor;
        Duration::from_secs_f64(seconds.min(self.max_delay.as_secs_f64()))
    }

    /// Delay the transport actually waits: the nominal delay, jittered
    /// when enabled.
    pub fn next_delay(&self, attempt_index: u32) -> Duration {
        let nominal = self.nominal_delay(attempt_index);
        if !self.jitter {
            return nominal;
        }
        let factor: f64 = rand::thread_rng().gen_range(0.5..=1.5);
        Duration::from_secs_f64(nominal.as_secs_f64() * factor)
    }
}
