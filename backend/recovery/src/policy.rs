//! Retry policy: attempt cap and delay between attempts.
//!
//! Delays are fixed by default; a backoff factor above 1.0 grows them
//! geometrically up to `max_delay_ms`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry in milliseconds.
    pub delay_ms: u64,
    /// Multiplier applied to each subsequent delay.
    pub backoff_factor: f64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delay_ms: 1_000,
            backoff_factor: 1.0,
            max_delay_ms: 30_000,
        }
    }
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay_ms: u64) -> Self {
        Self { max_retries, delay_ms, ..Default::default() }
    }

    /// Compute the delay before retry number `retry` (1-indexed).
    pub fn delay_for(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }
        let factor = self.backoff_factor.max(1.0);
        let delay_ms = self.delay_ms as f64 * factor.powi((retry - 1) as i32);
        Duration::from_millis(delay_ms.min(self.max_delay_ms as f64) as u64)
    }

    /// Whether another attempt is allowed after `retries_done` retries.
    pub fn should_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Upper bound on how many times an operation runs under this policy.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }
}
