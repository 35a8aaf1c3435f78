//! Bounded retry policy for remote fetches.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Retry policy for failed downloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts (including first try)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt in milliseconds
    #[serde(default)]
    pub delay_ms: u64,

    /// Delay multiplier per further attempt (1.0 keeps a constant cadence)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Maximum delay between retries in milliseconds
    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_multiplier() -> f64 {
    1.0
}
fn default_max_delay() -> u64 {
    30_000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            delay_ms: 0,
            backoff_multiplier: default_backoff_multiplier(),
            max_delay_ms: default_max_delay(),
        }
    }
}

impl RetryPolicy {
    /// Policy with `attempts` tries and no waiting in between
    pub fn immediate(attempts: u32) -> Self {
        Self {
            max_attempts: attempts,
            ..Self::default()
        }
    }

    /// Delay after a failed attempt (1-indexed)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if self.delay_ms == 0 {
            return Duration::ZERO;
        }

        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.delay_ms as f64 * self.backoff_multiplier.powi(exponent);
        let capped = delay.min(self.max_delay_ms as f64) as u64;
        Duration::from_millis(capped)
    }

    /// Check if we should retry based on attempt count
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Run `op` until it succeeds or the attempts are used up.
    ///
    /// Every failed attempt is logged as a warning naming `resource`; the
    /// last error is returned once the budget is spent.
    pub async fn run<T, E, F, Fut>(&self, resource: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    warn!(resource, attempt, max_attempts = self.max_attempts, error = %e, "Attempt failed");
                    if !self.should_retry(attempt) {
                        warn!(resource, attempts = attempt, "Giving up after repeated failures");
                        return Err(e);
                    }
                    let delay = self.delay_for_attempt(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_attempts == 0 {
            anyhow::bail!("retry policy needs at least one attempt");
        }
        if !(self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0) {
            anyhow::bail!(
                "backoff multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_constant_cadence() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_for_attempt(1), Duration::ZERO);
        assert_eq!(policy.delay_for_attempt(5), Duration::ZERO);
    }

    #[test]
    fn test_retry_policy_delays() {
        let policy = RetryPolicy {
            delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 5000,
            ..Default::default()
        };

        assert_eq!(policy.delay_for_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_for_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_for_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_for_attempt(4), Duration::from_millis(5000)); // Capped
    }

    #[test]
    fn test_should_retry() {
        let policy = RetryPolicy::immediate(2);
        assert!(policy.should_retry(1));
        assert!(!policy.should_retry(2));
        assert!(policy.validate().is_ok());
        assert!(RetryPolicy::immediate(0).validate().is_err());
    }

    #[tokio::test]
    async fn test_run_stops_after_budget() {
        let policy = RetryPolicy::immediate(3);
        let mut calls = 0;
        let result: Result<(), String> = policy
            .run("resource", || {
                calls += 1;
                async { Err("unreachable host".to_string()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 3);

        let mut calls = 0;
        let result: Result<u32, String> = policy
            .run("resource", || {
                calls += 1;
                let outcome = if calls < 2 { Err("timeout".to_string()) } else { Ok(calls) };
                async move { outcome }
            })
            .await;
        assert_eq!(result, Ok(2));
    }

    #[test]
    fn test_policy_from_yaml_defaults() {
        let policy: RetryPolicy = serde_yaml::from_str("max_attempts: 5").unwrap();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.delay_ms, 0);
        assert_eq!(policy.backoff_multiplier, 1.0);
    }
}
