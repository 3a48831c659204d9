// SPDX-License-Identifier: MIT OR Apache-2.0
//! Backoff computation (spec §4.4): "Constant or Exponential with `start`
//! and `factor`, clamped to configured max."

use std::time::Duration;

use backoff::backoff::Backoff as _;
use backoff::ExponentialBackoff;

/// Backoff schedule between contiguous retries of the same provider.
#[derive(Debug, Clone)]
pub enum BackoffPolicy {
    /// Always wait the same delay.
    Constant {
        /// The fixed delay.
        delay: Duration,
    },
    /// Wait `start * factor^(attempt-1)`, clamped to `max`.
    Exponential {
        /// Delay before the first retry.
        start: Duration,
        /// Growth multiplier applied per attempt.
        factor: f64,
        /// Upper bound on the computed delay.
        max: Duration,
    },
}

impl BackoffPolicy {
    /// Compute the delay before retry number `attempt` (1-indexed: the
    /// first retry is `attempt == 1`).
    #[must_use]
    pub fn compute(&self, attempt: u32) -> Duration {
        match self {
            BackoffPolicy::Constant { delay } => *delay,
            BackoffPolicy::Exponential { start, factor, max } => {
                let mut schedule = ExponentialBackoff {
                    current_interval: *start,
                    initial_interval: *start,
                    multiplier: *factor,
                    max_interval: *max,
                    randomization_factor: 0.0,
                    max_elapsed_time: None,
                    ..ExponentialBackoff::default()
                };
                let mut delay = *start;
                for _ in 0..attempt.max(1) {
                    delay = schedule.next_backoff().unwrap_or(*max);
                }
                delay.min(*max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_backoff_never_changes() {
        let policy = BackoffPolicy::Constant { delay: Duration::from_millis(250) };
        assert_eq!(policy.compute(1), Duration::from_millis(250));
        assert_eq!(policy.compute(5), Duration::from_millis(250));
    }

    #[test]
    fn exponential_backoff_grows_then_clamps() {
        let policy = BackoffPolicy::Exponential {
            start: Duration::from_millis(20),
            factor: 2.0,
            max: Duration::from_millis(100),
        };
        assert_eq!(policy.compute(1), Duration::from_millis(20));
        assert_eq!(policy.compute(2), Duration::from_millis(40));
        assert_eq!(policy.compute(3), Duration::from_millis(80));
        assert_eq!(policy.compute(4), Duration::from_millis(100));
        assert_eq!(policy.compute(10), Duration::from_millis(100));
    }
}
