//! Polling cadence for job status checks.
//!
//! The first status check happens immediately after submission; every
//! later check waits [`PollPolicy::interval`], optionally growing by
//! [`PollPolicy::multiplier`] up to [`PollPolicy::max_interval`]. Polling
//! gives up after [`PollPolicy::max_attempts`] status checks.

use std::time::Duration;

use crate::error::CoreError;

/// Delay between status checks when nothing else is configured.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Upper bound on the delay between checks when backoff is enabled.
pub const DEFAULT_MAX_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Status checks before an attempt is abandoned (10 minutes at 3 s).
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 200;

/// Tunable parameters for the status polling loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second status check.
    pub interval: Duration,
    /// Upper bound on the delay between checks.
    pub max_interval: Duration,
    /// Factor by which the delay grows after each pending status.
    /// `1.0` keeps a fixed cadence.
    pub multiplier: f64,
    /// Maximum number of status checks, including the first.
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            max_interval: DEFAULT_MAX_POLL_INTERVAL,
            multiplier: 1.0,
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

impl PollPolicy {
    /// A fixed-cadence policy with the given interval and attempt cap.
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_interval: interval,
            multiplier: 1.0,
            max_attempts,
        }
    }

    /// Reject policies that could never poll or would spin.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_attempts == 0 {
            return Err(CoreError::Validation(
                "Poll max attempts must be at least 1".to_string(),
            ));
        }
        if self.interval.is_zero() {
            return Err(CoreError::Validation(
                "Poll interval must be greater than zero".to_string(),
            ));
        }
        if !self.multiplier.is_finite() || self.multiplier < 1.0 {
            return Err(CoreError::Validation(format!(
                "Poll backoff multiplier must be >= 1.0, got {}",
                self.multiplier
            )));
        }
        if self.max_interval < self.interval {
            return Err(CoreError::Validation(
                "Poll max interval must not be shorter than the interval".to_string(),
            ));
        }
        Ok(())
    }

    /// Calculate the next delay from the current one.
    ///
    /// The result is clamped to [`PollPolicy::max_interval`]; a product
    /// that does not fit a `Duration` clamps as well.
    pub fn next_delay(&self, current: Duration) -> Duration {
        Duration::try_from_secs_f64(current.as_secs_f64() * self.multiplier)
            .unwrap_or(self.max_interval)
            .min(self.max_interval)
    }
}
