// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`EventBus`]: one [`InterceptorChain`]/[`VoidChannel`] per event kind
//! named in spec §4.3, plus emission counters for diagnostics and tests.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::channel::{InterceptorChain, VoidChannel};
use crate::event::EventContext;
use crate::http_hook::{ScopedUnhandledHttpHook, UnhandledHttpRegistry};
use crate::payload::{
    BindAndPerformArgs, FailurePayload, FetchArgs, FetchResult, PerformArgs, PerformResult,
    ProviderSwitchPayload, SuccessPayload,
};

#[derive(Debug, Default)]
struct Counters {
    perform: AtomicU64,
    bind_and_perform: AtomicU64,
    fetch: AtomicU64,
    unhandled_http: AtomicU64,
    success: AtomicU64,
    failure: AtomicU64,
    provider_switch: AtomicU64,
}

/// Snapshot of how many times each event kind has been emitted, for
/// diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventBusStats {
    /// Number of `perform` emissions.
    pub perform: u64,
    /// Number of `bind-and-perform` emissions.
    pub bind_and_perform: u64,
    /// Number of `fetch` emissions.
    pub fetch: u64,
    /// Number of `unhandled-http` consultations.
    pub unhandled_http: u64,
    /// Number of `success` emissions.
    pub success: u64,
    /// Number of `failure` emissions.
    pub failure: u64,
    /// Number of `provider-switch` emissions.
    pub provider_switch: u64,
}

/// The runtime's single event bus: one channel per event kind named in
/// spec §4.3, shared across every use-case driver instance.
#[derive(Default)]
pub struct EventBus {
    /// `pre-perform`/`post-perform` interceptor chain.
    pub perform: InterceptorChain<PerformArgs, PerformResult>,
    /// `pre-bind-and-perform`/`post-bind-and-perform` interceptor chain.
    pub bind_and_perform: InterceptorChain<BindAndPerformArgs, PerformResult>,
    /// `pre-fetch`/`post-fetch` interceptor chain.
    pub fetch: InterceptorChain<FetchArgs, FetchResult>,
    /// `unhandled-http` decision registry.
    pub unhandled_http: UnhandledHttpRegistry,
    /// `success` subscribers.
    pub success: VoidChannel<SuccessPayload>,
    /// `failure` subscribers.
    pub failure: VoidChannel<FailurePayload>,
    /// `provider-switch` subscribers.
    pub provider_switch: VoidChannel<ProviderSwitchPayload>,
    counters: Counters,
}

impl EventBus {
    /// Create an empty bus with no listeners registered.
    #[must_use]
    pub fn new() -> Self {
        EventBus::default()
    }

    /// Run a `perform` call through its interceptor chain, counting the
    /// emission.
    pub async fn run_perform<F, Fut>(
        &self,
        ctx: &EventContext,
        args: PerformArgs,
        inner: F,
    ) -> PerformResult
    where
        F: Fn(PerformArgs) -> Fut,
        Fut: Future<Output = PerformResult>,
    {
        self.counters.perform.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(target: "comlink_events.bus", profile = %ctx.profile, usecase = %ctx.usecase, "perform");
        self.perform.run(ctx, args, inner).await
    }

    /// Run a `bind-and-perform` call through its interceptor chain.
    pub async fn run_bind_and_perform<F, Fut>(
        &self,
        ctx: &EventContext,
        args: BindAndPerformArgs,
        inner: F,
    ) -> PerformResult
    where
        F: Fn(BindAndPerformArgs) -> Fut,
        Fut: Future<Output = PerformResult>,
    {
        self.counters
            .bind_and_perform
            .fetch_add(1, Ordering::Relaxed);
        tracing::debug!(target: "comlink_events.bus", profile = %ctx.profile, usecase = %ctx.usecase, "bind-and-perform");
        self.bind_and_perform.run(ctx, args, inner).await
    }

    /// Run a single `fetch` through its interceptor chain.
    pub async fn run_fetch<F, Fut>(&self, ctx: &EventContext, args: FetchArgs, inner: F) -> FetchResult
    where
        F: Fn(FetchArgs) -> Fut,
        Fut: Future<Output = FetchResult>,
    {
        self.counters.fetch.fetch_add(1, Ordering::Relaxed);
        self.fetch.run(ctx, args, inner).await
    }

    /// Bind the `unhandled-http` registry to one call's context.
    #[must_use]
    pub fn unhandled_http_hook(&self, ctx: EventContext) -> ScopedUnhandledHttpHook<'_> {
        self.counters.unhandled_http.fetch_add(1, Ordering::Relaxed);
        self.unhandled_http.scoped(ctx)
    }

    /// Emit `success` to every matching subscriber.
    pub async fn emit_success(&self, ctx: &EventContext, payload: SuccessPayload) {
        self.counters.success.fetch_add(1, Ordering::Relaxed);
        self.success.emit(ctx, &payload).await;
    }

    /// Emit `failure` to every matching subscriber.
    pub async fn emit_failure(&self, ctx: &EventContext, payload: FailurePayload) {
        self.counters.failure.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(target: "comlink_events.bus", provider = %payload.provider, reason = ?payload.reason, "failure");
        self.failure.emit(ctx, &payload).await;
    }

    /// Emit `provider-switch` to every matching subscriber.
    pub async fn emit_provider_switch(&self, ctx: &EventContext, payload: ProviderSwitchPayload) {
        self.counters
            .provider_switch
            .fetch_add(1, Ordering::Relaxed);
        tracing::info!(target: "comlink_events.bus", from = %payload.from, to = ?payload.to, "provider-switch");
        self.provider_switch.emit(ctx, &payload).await;
    }

    /// Snapshot of emission counts, for diagnostics and tests.
    #[must_use]
    pub fn stats(&self) -> EventBusStats {
        EventBusStats {
            perform: self.counters.perform.load(Ordering::Relaxed),
            bind_and_perform: self.counters.bind_and_perform.load(Ordering::Relaxed),
            fetch: self.counters.fetch.load(Ordering::Relaxed),
            unhandled_http: self.counters.unhandled_http.load(Ordering::Relaxed),
            success: self.counters.success.load(Ordering::Relaxed),
            failure: self.counters.failure.load(Ordering::Relaxed),
            provider_switch: self.counters.provider_switch.load(Ordering::Relaxed),
        }
    }
}
