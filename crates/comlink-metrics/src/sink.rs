// SPDX-License-Identifier: MIT OR Apache-2.0
//! Where an aggregated [`crate::payload::MetricsPayload`] goes once a
//! debounce window closes.

use async_trait::async_trait;

use crate::payload::MetricsPayload;

/// Receives one aggregated `Metrics` emission per flush.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    /// Handle one flushed batch.
    async fn on_metrics(&self, payload: &MetricsPayload);
}

/// Discards every emission; useful when metrics reporting is disabled
/// (spec §6's `disableReporting` configuration option).
#[derive(Debug, Default)]
pub struct NoopMetricsSink;

#[async_trait]
impl MetricsSink for NoopMetricsSink {
    async fn on_metrics(&self, _payload: &MetricsPayload) {}
}
