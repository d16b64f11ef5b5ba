//! Retry policy for recoverable oracle failures.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Exponential backoff applied per mention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts
    pub max_retries: u32,
    /// Delay before the first retry
    #[serde(with = "humantime_serde")]
    pub initial_backoff: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f32,
    /// Upper bound for any single delay
    #[serde(with = "humantime_serde")]
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_secs(5),
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate backoff duration for a given attempt number (0-based).
    pub fn backoff_duration(&self, attempt: u32) -> Duration {
        let factor = self.backoff_multiplier.max(1.0).powi(attempt as i32);
        let backoff_ms = (self.initial_backoff.as_millis() as f32 * factor) as u64;
        Duration::from_millis(backoff_ms).min(self.max_backoff)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let policy = RetryPolicy {
            max_retries: 5,
            initial_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
            max_backoff: Duration::from_millis(500),
        };
        assert_eq!(policy.backoff_duration(0), Duration::from_millis(100));
        assert_eq!(policy.backoff_duration(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_duration(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_duration(3), Duration::from_millis(500));
    }

    #[test]
    fn test_humantime_durations() {
        let policy: RetryPolicy =
            serde_json::from_str(r#"{"max_retries": 1, "initial_backoff": "250ms"}"#).unwrap();
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
        assert_eq!(policy.max_backoff, Duration::from_secs(5));
    }
}
