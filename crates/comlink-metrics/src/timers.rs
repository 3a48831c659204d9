// SPDX-License-Identifier: MIT OR Apache-2.0
//! The injected `Timers` collaborator (spec §6), defined locally rather
//! than shared with `comlink-policy`: the two crates' timing needs don't
//! overlap enough to justify a shared dependency, and there is no
//! precedent in this workspace for one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Wall-clock access, injectable so debounce-window decisions can be
/// tested without real sleeps.
pub trait Timers: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// [`Timers`] backed by the real wall clock.
#[derive(Debug, Default)]
pub struct SystemTimers;

impl Timers for SystemTimers {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// [`Timers`] driven by the test, not the wall clock.
#[derive(Debug, Default)]
pub struct ManualTimers(AtomicU64);

impl ManualTimers {
    /// Start the manual clock at `start_millis`.
    #[must_use]
    pub fn new(start_millis: u64) -> Self {
        ManualTimers(AtomicU64::new(start_millis))
    }

    /// Advance the clock by `delta_millis`.
    pub fn advance(&self, delta_millis: u64) {
        self.0.fetch_add(delta_millis, Ordering::SeqCst);
    }
}

impl Timers for ManualTimers {
    fn now_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}
