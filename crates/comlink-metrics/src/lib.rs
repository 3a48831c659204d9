// SPDX-License-Identifier: MIT OR Apache-2.0
//! Debounced aggregation and emission of `perform`/`provider-switch`
//! metrics.
//!
//! A per-(profile, provider) buffer of atomic run counters that flushes
//! on a debounce window rather than on demand, because this runtime's
//! metrics are driven by event subscriptions rather than a caller
//! explicitly asking for a snapshot.

mod buffer;
mod config;
mod payload;
mod reporter;
mod sink;
mod timers;

pub use config::{DebounceConfig, MetricsConfigError};
pub use payload::{MetricsPayload, ProviderMetrics};
pub use reporter::{MetricsReporter, REPORT_PRIORITY};
pub use sink::{MetricsSink, NoopMetricsSink};
pub use timers::{ManualTimers, SystemTimers, Timers};
