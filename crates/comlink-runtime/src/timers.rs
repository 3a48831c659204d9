// SPDX-License-Identifier: MIT OR Apache-2.0
//! Injectable wall clock (spec §6's `Timers`), used here for `success`/
//! `failure` event timestamps and for bound profile-provider cache expiry.
//!
//! Defined locally rather than shared with [`comlink_policy::Timers`] or
//! [`comlink_metrics::Timers`] — each crate's driver owns its own notion of
//! "now" for the same reason those two don't share one: there is no
//! precedent in the pack for a shared injectable-clock crate, and the
//! coupling it would introduce buys nothing functional.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Source of the current time, injectable so tests don't depend on the
/// wall clock.
pub trait Timers: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Real wall-clock [`Timers`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTimers;

impl Timers for SystemTimers {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually-advanced [`Timers`], for deterministic tests.
#[derive(Debug)]
pub struct ManualTimers(AtomicU64);

impl ManualTimers {
    /// Construct a clock starting at `start_millis`.
    #[must_use]
    pub fn new(start_millis: u64) -> Self {
        ManualTimers(AtomicU64::new(start_millis))
    }

    /// Move the clock forward by `delta_millis`.
    pub fn advance(&self, delta_millis: u64) {
        self.0.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl Timers for ManualTimers {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
