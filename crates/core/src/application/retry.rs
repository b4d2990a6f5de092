// Reconnect policy for the primary relational backend
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Reconnect decision result
#[derive(Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Try again after the given backoff delay in ms
    Retry(u64),
    /// Attempts exhausted
    GiveUp,
}

/// Exponential backoff for primary connection attempts
///
/// `attempt` is zero-based: attempt 0 is the first connection try, so with
/// `max_attempts = 1` the first failure already gives up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub backoff_factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            base_delay_ms: 500,
            backoff_factor: 2.0,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay_ms: u64, backoff_factor: f64) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms,
            backoff_factor,
        }
    }

    /// Decide what to do after the failed `attempt`
    ///
    /// delay = base_delay * (backoff_factor ^ attempt) * jitter, where the
    /// jitter (0.9 to 1.1) is derived from `seed` so a given target always
    /// backs off the same way.
    pub fn decide(&self, attempt: u32, seed: &str) -> RetryDecision {
        if attempt + 1 >= self.max_attempts {
            warn!(
                attempt = attempt + 1,
                max_attempts = self.max_attempts,
                "Reconnect attempts exhausted"
            );
            return RetryDecision::GiveUp;
        }

        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let base_delay_ms = self.base_delay_ms as f64 * self.backoff_factor.powi(exponent);

        let jitter_seed = seed.chars().map(|c| c as u32).fold(0u32, u32::wrapping_add);
        let jitter_factor = 0.9 + ((jitter_seed % 21) as f64 / 100.0);

        let delay_ms = (base_delay_ms * jitter_factor) as u64;

        info!(
            attempt = attempt + 1,
            max_attempts = self.max_attempts,
            delay_ms,
            "Scheduling reconnect"
        );

        RetryDecision::Retry(delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_gives_up_after_first_failure() {
        let policy = ReconnectPolicy::default();
        assert_eq!(policy.decide(0, "localhost"), RetryDecision::GiveUp);
    }

    #[test]
    fn test_exponential_backoff_with_jitter() {
        let policy = ReconnectPolicy::new(4, 1000, 2.0);

        for attempt in 0..3 {
            let expected = 1000.0 * 2f64.powi(attempt as i32);
            match policy.decide(attempt, "db.internal:3306") {
                RetryDecision::Retry(delay) => {
                    let delay = delay as f64;
                    assert!(delay >= expected * 0.9 && delay <= expected * 1.1);
                }
                RetryDecision::GiveUp => panic!("should retry at attempt {}", attempt),
            }
        }
        assert_eq!(policy.decide(3, "db.internal:3306"), RetryDecision::GiveUp);
    }

    #[test]
    fn test_jitter_is_deterministic_per_seed() {
        let policy = ReconnectPolicy::new(3, 500, 2.0);
        assert_eq!(policy.decide(1, "host-a"), policy.decide(1, "host-a"));
    }

    #[test]
    fn test_zero_attempts_is_clamped() {
        assert_eq!(ReconnectPolicy::new(0, 10, 2.0).max_attempts, 1);
    }
}
