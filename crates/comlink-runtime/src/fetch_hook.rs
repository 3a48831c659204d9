// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wraps a concrete [`HttpExecutor`] so every call passes through the
//! shared event bus's `fetch` interceptor chain (spec §4.3's
//! `pre-fetch`/`post-fetch` hooks) before and after issuing the request.
//!
//! `comlink-http`'s [`comlink_http`] engine does not depend on
//! `comlink-events` (it only depends on the interpreter's collaborator
//! traits), so this adapter is where the two actually meet — the same
//! reason `comlink-runtime::provider` exists as the seam between wire and
//! internal security types.

use std::sync::Arc;

use async_trait::async_trait;
use comlink_error::CoreError;
use comlink_events::{EventBus, EventContext};
use comlink_interpreter::collaborators::{HttpCallResult, HttpCallSpec, HttpExecutor};

/// An [`HttpExecutor`] that runs every call through `events.fetch`'s
/// `pre-fetch`/`post-fetch` chain, so a registered `post-fetch` listener
/// can retry, rewrite, or short-circuit an individual HTTP call the way
/// spec §4.3 describes (distinct from the interpreter's own
/// `unhandled-http` retry, which only fires when no response handler
/// matched a status).
pub struct EventedHttpExecutor<'a> {
    inner: &'a (dyn HttpExecutor + 'a),
    events: Arc<EventBus>,
    ctx: EventContext,
}

impl<'a> EventedHttpExecutor<'a> {
    /// Wrap `inner`, scoping emitted events to `ctx`.
    #[must_use]
    pub fn new(inner: &'a (dyn HttpExecutor + 'a), events: Arc<EventBus>, ctx: EventContext) -> Self {
        EventedHttpExecutor { inner, events, ctx }
    }
}

#[async_trait]
impl<'a> HttpExecutor for EventedHttpExecutor<'a> {
    async fn execute(&self, spec: HttpCallSpec) -> Result<HttpCallResult, CoreError> {
        self.events
            .run_fetch(&self.ctx, spec, |spec| self.inner.execute(spec))
            .await
    }
}
