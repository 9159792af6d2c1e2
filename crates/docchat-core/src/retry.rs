//! Retry policy for fallible remote operations
//!
//! Cross-cutting retry behavior is expressed as an explicit value object:
//! callers ask the policy for the delay before each attempt and loop
//! themselves, so what gets retried (429s, timeouts) and what does not
//! (terminal API errors) stays visible at the call site.

use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// How the delay grows between attempts
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BackoffSchedule {
    /// Same delay before every retry
    Fixed,
    /// Delay grows as `initial * retry_number` (2s, 4s, 6s, ...)
    Linear,
    /// Delay doubles each retry (1s, 2s, 4s, ...)
    Exponential,
}

/// Configuration for retrying a fallible operation
///
/// # Example
///
/// ```
/// use docchat_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy = RetryPolicy::linear(Duration::from_secs(2), 3);
///
/// // First retry after 2 seconds, second after 4 seconds
/// assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
/// assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(4));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including the initial one)
    pub max_attempts: u32,

    /// Base delay before the first retry
    #[serde(with = "duration_millis")]
    pub initial_interval: Duration,

    /// Cap on the delay between retries
    #[serde(with = "duration_millis")]
    pub max_interval: Duration,

    /// Delay growth schedule
    pub schedule: BackoffSchedule,

    /// Jitter factor (0.0-1.0) to add randomness; 0 keeps delays exact
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::linear(Duration::from_secs(2), 3)
    }
}

impl RetryPolicy {
    /// Linearly increasing backoff: `initial`, `2*initial`, `3*initial`, ...
    pub fn linear(initial: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_interval: initial,
            max_interval: Duration::from_secs(60),
            schedule: BackoffSchedule::Linear,
            jitter: 0.0,
        }
    }

    /// Fixed interval between attempts (no backoff)
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_interval: interval,
            max_interval: interval,
            schedule: BackoffSchedule::Fixed,
            jitter: 0.0,
        }
    }

    /// Exponential backoff doubling from `initial`
    pub fn exponential(initial: Duration, max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_interval: initial,
            max_interval: Duration::from_secs(60),
            schedule: BackoffSchedule::Exponential,
            jitter: 0.0,
        }
    }

    /// A policy that never retries
    pub fn no_retry() -> Self {
        Self::fixed(Duration::ZERO, 1)
    }

    /// Set the cap on the delay between retries
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Set the jitter factor (0.0-1.0)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Delay to wait before the given attempt number (1-based)
    ///
    /// Attempt 1 is the initial call and has no delay.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }

        let retry_num = attempt - 1;
        let initial = self.initial_interval.as_secs_f64();
        let base = match self.schedule {
            BackoffSchedule::Fixed => initial,
            BackoffSchedule::Linear => initial * retry_num as f64,
            BackoffSchedule::Exponential => initial * 2f64.powi(retry_num as i32 - 1),
        };
        let capped = base.min(self.max_interval.as_secs_f64());

        let jittered = if self.jitter > 0.0 {
            let mut rng = rand::thread_rng();
            let jitter_range = capped * self.jitter;
            let jitter_offset = rng.gen_range(-jitter_range..jitter_range);
            (capped + jitter_offset).max(0.0)
        } else {
            capped
        };

        Duration::from_secs_f64(jittered)
    }

    /// Whether another attempt may be made after `current_attempt` failed
    pub fn has_attempts_remaining(&self, current_attempt: u32) -> bool {
        current_attempt < self.max_attempts
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_delays_strictly_increase() {
        let policy = RetryPolicy::linear(Duration::from_secs(2), 3);

        let d2 = policy.delay_for_attempt(2);
        let d3 = policy.delay_for_attempt(3);
        assert_eq!(d2, Duration::from_secs(2));
        assert_eq!(d3, Duration::from_secs(4));
        assert!(d3 > d2);
    }

    #[test]
    fn test_initial_attempt_has_no_delay() {
        let policy = RetryPolicy::linear(Duration::from_secs(2), 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
    }

    #[test]
    fn test_fixed_interval() {
        let policy = RetryPolicy::fixed(Duration::from_secs(2), 2);
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(2));
    }

    #[test]
    fn test_exponential() {
        let policy = RetryPolicy::exponential(Duration::from_secs(1), 4);
        assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_secs(2));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_secs(4));
    }

    #[test]
    fn test_max_interval_cap() {
        let policy =
            RetryPolicy::linear(Duration::from_secs(30), 10).with_max_interval(Duration::from_secs(45));
        assert_eq!(policy.delay_for_attempt(5), Duration::from_secs(45));
    }

    #[test]
    fn test_has_attempts_remaining() {
        let policy = RetryPolicy::linear(Duration::from_secs(2), 3);
        assert!(policy.has_attempts_remaining(1));
        assert!(policy.has_attempts_remaining(2));
        assert!(!policy.has_attempts_remaining(3));
    }

    #[test]
    fn test_no_retry() {
        let policy = RetryPolicy::no_retry();
        assert!(!policy.has_attempts_remaining(1));
    }

    #[test]
    fn test_serialization() {
        let policy = RetryPolicy::linear(Duration::from_secs(2), 3);
        let json = serde_json::to_string(&policy).unwrap();
        let parsed: RetryPolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(policy, parsed);
    }
}
