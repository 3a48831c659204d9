// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-provider failure policy state (spec §3's "Failure policy state"):
//! the circuit-breaker mode plus the counters/timestamps every policy kind
//! reads and writes.

use std::time::Duration;

use crate::policy::PolicyKind;

/// Circuit-breaker mode (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitMode {
    /// Requests flow normally; failures accumulate toward the open
    /// threshold.
    Closed,
    /// One probe request is allowed through.
    HalfOpen,
    /// Requests are rejected until `next_attempt_at`.
    Open,
}

/// Mutable per-provider state the router reads and updates on every
/// `beforePerform`/`afterFailure`/`afterSuccess` call.
#[derive(Debug, Clone)]
pub struct ProviderState {
    /// The policy this provider is configured with.
    pub policy: PolicyKind,
    /// Circuit-breaker mode; always `Closed` for non-circuit-breaker
    /// policies.
    pub mode: CircuitMode,
    /// Failures since the last success (or since the circuit last
    /// closed).
    pub consecutive_failures: u32,
    /// Successes since the last failure.
    pub consecutive_successes: u32,
    /// Current open-time, doubled (capped) each time a `HalfOpen` probe
    /// fails.
    pub current_backoff: Duration,
    /// When the circuit last opened, in `Timers::now_millis` units.
    pub opened_at: Option<u64>,
    /// When a rejected request may next be attempted.
    pub next_attempt_at: Option<u64>,
    /// A retry backoff computed by `afterFailure` (simple-retry policy),
    /// consumed by the next `beforePerform` call.
    pub pending_backoff: Option<Duration>,
}

impl ProviderState {
    /// Fresh, healthy state for a provider configured with `policy`.
    #[must_use]
    pub fn new(policy: PolicyKind) -> Self {
        ProviderState {
            policy,
            mode: CircuitMode::Closed,
            consecutive_failures: 0,
            consecutive_successes: 0,
            current_backoff: Duration::ZERO,
            opened_at: None,
            next_attempt_at: None,
            pending_backoff: None,
        }
    }

    /// Reset to a healthy `Closed` state (spec §4.4: success from
    /// `HalfOpen` closes the circuit and resets counters).
    pub fn reset_to_closed(&mut self) {
        self.mode = CircuitMode::Closed;
        self.consecutive_failures = 0;
        self.consecutive_successes = 0;
        self.current_backoff = Duration::ZERO;
        self.opened_at = None;
        self.next_attempt_at = None;
        self.pending_backoff = None;
    }
}
