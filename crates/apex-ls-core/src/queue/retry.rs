//! Retry policy: decides backoff delays.

use std::time::Duration;

/// Exponential backoff for failed queued tasks.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Growth factor per further retry.
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(100),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-indexed):
    /// `base_delay * multiplier^(attempt - 1)`.
    ///
    /// With the defaults: 100ms, 200ms, 400ms, ...
    /// `attempt = 0` is treated like the first retry.
    pub fn next_delay(&self, attempt: u32) -> Duration {
        let base_nanos = self.base_delay.as_nanos() as f64;
        let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
        // `as u64` saturates on overflow.
        Duration::from_nanos((base_nanos * self.multiplier.powi(exponent)) as u64)
    }
}
