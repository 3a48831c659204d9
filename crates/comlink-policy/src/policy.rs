// SPDX-License-Identifier: MIT OR Apache-2.0
//! The three policy kinds a provider can be configured with (spec §4.4).

use std::time::Duration;

use crate::backoff::BackoffPolicy;

/// Per-provider failure policy.
#[derive(Debug, Clone)]
pub enum PolicyKind {
    /// No retry, no failover: the first failure aborts.
    NoRetry,
    /// Retry the same provider up to `max_contiguous_retries` times with a
    /// fixed backoff schedule between attempts.
    SimpleRetry {
        /// Maximum number of retries after the first failed attempt.
        max_contiguous_retries: u32,
        /// Wait schedule between attempts.
        backoff: BackoffPolicy,
        /// Bounds a single attempt; exceeding it surfaces as
        /// `request:timeout` (spec §5).
        request_timeout: Duration,
    },
    /// Three-state circuit breaker (spec §4.4).
    CircuitBreaker {
        /// Consecutive failures before the circuit opens.
        max_contiguous_failures: u32,
        /// Initial open duration.
        open_time: Duration,
        /// Upper bound the doubling open-time is clamped to.
        max_open_time: Duration,
        /// Bounds a single attempt.
        request_timeout: Duration,
    },
}

impl PolicyKind {
    /// The `request-timeout` this policy bounds a single attempt by, if
    /// any (`NoRetry` has none — a single failed attempt is terminal
    /// regardless of how long it took).
    #[must_use]
    pub fn request_timeout(&self) -> Option<Duration> {
        match self {
            PolicyKind::NoRetry => None,
            PolicyKind::SimpleRetry { request_timeout, .. }
            | PolicyKind::CircuitBreaker { request_timeout, .. } => Some(*request_timeout),
        }
    }
}
