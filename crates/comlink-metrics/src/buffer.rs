// SPDX-License-Identifier: MIT OR Apache-2.0
//! The metric buffer (spec §3's "Metric buffer"): unordered per-(profile,
//! provider) counts plus the debounce window's `{started-at, timer}`.

use std::collections::BTreeMap;

use crate::config::DebounceConfig;
use crate::payload::{MetricsPayload, ProviderMetrics};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Counts {
    success: u64,
    failed: u64,
}

/// Single-writer buffer: every `record` call and the eventual `flush`
/// are expected to run under one external mutex (spec §5: "single writer
/// per reporter; flush resets buffer atomically").
#[derive(Debug, Default)]
pub struct MetricBuffer {
    counts: BTreeMap<(String, String), Counts>,
    order: Vec<(String, String)>,
    first_recorded_at: Option<u64>,
    last_recorded_at: Option<u64>,
}

impl MetricBuffer {
    /// Start empty.
    #[must_use]
    pub fn new() -> Self {
        MetricBuffer::default()
    }

    /// Record one `success`/`failure` observation.
    pub fn record(&mut self, profile: &str, provider: &str, success: bool, time: u64) {
        let key = (profile.to_string(), provider.to_string());
        if !self.counts.contains_key(&key) {
            self.order.push(key.clone());
        }
        let entry = self.counts.entry(key).or_default();
        if success {
            entry.success += 1;
        } else {
            entry.failed += 1;
        }
        self.first_recorded_at.get_or_insert(time);
        self.last_recorded_at = Some(time);
    }

    /// Whether the buffer holds anything not yet flushed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Whether a flush is due at `now`: `T_min` of inactivity since the
    /// last recorded entry, or `T_max` elapsed since the first.
    #[must_use]
    pub fn is_due(&self, now: u64, window: DebounceConfig) -> bool {
        if self.is_empty() {
            return false;
        }
        let since_last = self.last_recorded_at.map_or(0, |t| now.saturating_sub(t));
        let since_first = self.first_recorded_at.map_or(0, |t| now.saturating_sub(t));
        since_last as u128 >= window.t_min.as_millis() || since_first as u128 >= window.t_max.as_millis()
    }

    /// Drain the buffer into an aggregated payload, resetting the window.
    pub fn flush(&mut self) -> MetricsPayload {
        let entries = self
            .order
            .drain(..)
            .filter_map(|key| {
                self.counts.remove(&key).map(|counts| ProviderMetrics {
                    profile: key.0,
                    provider: key.1,
                    success_count: counts.success,
                    failed_count: counts.failed,
                })
            })
            .collect();
        self.first_recorded_at = None;
        self.last_recorded_at = None;
        MetricsPayload { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn aggregates_by_profile_and_provider() {
        let mut buffer = MetricBuffer::new();
        buffer.record("acme", "p1", true, 0);
        buffer.record("acme", "p1", false, 1);
        buffer.record("acme", "p2", true, 2);

        let payload = buffer.flush();
        assert_eq!(payload.entries.len(), 2);
        assert_eq!(payload.entries[0].success_count, 1);
        assert_eq!(payload.entries[0].failed_count, 1);
        assert_eq!(payload.entries[1].success_count, 1);
        assert!(buffer.is_empty());
    }

    #[test]
    fn due_after_min_inactivity_or_max_elapsed() {
        let window = DebounceConfig::new(Duration::from_millis(50), Duration::from_millis(200)).unwrap();
        let mut buffer = MetricBuffer::new();
        buffer.record("acme", "p1", true, 0);

        assert!(!buffer.is_due(10, window));
        assert!(buffer.is_due(60, window));
    }

    #[test]
    fn due_when_max_elapsed_even_without_inactivity() {
        let window = DebounceConfig::new(Duration::from_millis(50), Duration::from_millis(200)).unwrap();
        let mut buffer = MetricBuffer::new();
        buffer.record("acme", "p1", true, 0);
        buffer.record("acme", "p1", true, 190);

        assert!(buffer.is_due(210, window));
    }
}
