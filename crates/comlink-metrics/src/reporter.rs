// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`MetricsReporter`]: subscribes to `success`/`failure`/`provider-switch`
//! at fixed priorities, buffers counts, and flushes an aggregated
//! [`MetricsPayload`] once the debounce window closes (spec §4.6).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use comlink_events::{
    EventBus, EventContext, EventFilter, FailurePayload, ProviderSwitchPayload, SuccessPayload,
    VoidListener,
};
use tokio::sync::Mutex;

use crate::buffer::MetricBuffer;
use crate::config::DebounceConfig;
use crate::sink::MetricsSink;
use crate::timers::Timers;

/// Priority the reporter registers its `success`/`failure` subscriptions
/// at. Fixed and low so the reporter observes every emission regardless
/// of what else is subscribed (spec §4.6: "subscribes at fixed
/// priorities").
pub const REPORT_PRIORITY: i32 = 1000;

/// Debounced aggregator for `success`/`failure`/`provider-switch` events.
pub struct MetricsReporter {
    buffer: Mutex<MetricBuffer>,
    window: DebounceConfig,
    timers: Arc<dyn Timers>,
    sink: Arc<dyn MetricsSink>,
}

impl MetricsReporter {
    /// Build a reporter that flushes through `sink` on the given
    /// debounce `window`.
    #[must_use]
    pub fn new(window: DebounceConfig, timers: Arc<dyn Timers>, sink: Arc<dyn MetricsSink>) -> Self {
        MetricsReporter {
            buffer: Mutex::new(MetricBuffer::new()),
            window,
            timers,
            sink,
        }
    }

    /// Subscribe this reporter to `bus`'s `success`, `failure`, and
    /// `provider-switch` channels.
    pub fn register(self: &Arc<Self>, bus: &mut EventBus) {
        bus.success.register(REPORT_PRIORITY, EventFilter::any(), self.clone());
        bus.failure.register(REPORT_PRIORITY, EventFilter::any(), self.clone());
        bus.provider_switch
            .register(REPORT_PRIORITY, EventFilter::any(), self.clone());
    }

    /// Check whether the debounce window has closed and, if so, flush
    /// and emit through the sink. Call this periodically (see
    /// [`MetricsReporter::spawn_ticker`]) or drive it directly in tests
    /// via an injected [`Timers`].
    pub async fn tick(&self) {
        let now = self.timers.now_millis();
        let due = {
            let buffer = self.buffer.lock().await;
            buffer.is_due(now, self.window)
        };
        if due {
            self.flush_now().await;
        }
    }

    /// Flush whatever is buffered right now, regardless of the debounce
    /// window, and emit it through the sink. A no-op if the buffer is
    /// empty.
    pub async fn flush_now(&self) {
        let payload = {
            let mut buffer = self.buffer.lock().await;
            if buffer.is_empty() {
                return;
            }
            buffer.flush()
        };
        tracing::debug!(
            target: "comlink_metrics.reporter",
            entries = payload.entries.len(),
            "flushing metrics"
        );
        self.sink.on_metrics(&payload).await;
    }

    /// Spawn a background task that calls [`MetricsReporter::tick`] every
    /// `poll_interval` until the returned handle is aborted or dropped.
    pub fn spawn_ticker(self: Arc<Self>, poll_interval: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(poll_interval).await;
                self.tick().await;
            }
        })
    }
}

#[async_trait]
impl VoidListener<SuccessPayload> for MetricsReporter {
    async fn on_event(&self, _ctx: &EventContext, payload: &SuccessPayload) {
        let mut buffer = self.buffer.lock().await;
        buffer.record(&payload.profile, &payload.provider, true, payload.time);
    }
}

#[async_trait]
impl VoidListener<FailurePayload> for MetricsReporter {
    async fn on_event(&self, _ctx: &EventContext, payload: &FailurePayload) {
        let mut buffer = self.buffer.lock().await;
        buffer.record(&payload.profile, &payload.provider, false, payload.time);
    }
}

#[async_trait]
impl VoidListener<ProviderSwitchPayload> for MetricsReporter {
    async fn on_event(&self, _ctx: &EventContext, _payload: &ProviderSwitchPayload) {
        self.flush_now().await;
    }
}
