// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `unhandled-http` hook (spec §4.1's last resort when no response
//! handler matched): a priority-ordered registry of listeners, the first
//! of which to return a decision wins.

use std::sync::Arc;

use async_trait::async_trait;
use comlink_interpreter::collaborators::{HttpCallResult, UnhandledHttpDecision, UnhandledHttpHook};

use crate::event::{EventContext, EventFilter};

/// A listener consulted for the `unhandled-http` decision.
#[async_trait]
pub trait UnhandledHttpListener: Send + Sync {
    /// Return `Some` to claim the decision, `None` to defer to the next
    /// listener (or the interpreter's default if none claim it).
    async fn decide(
        &self,
        ctx: &EventContext,
        result: &HttpCallResult,
    ) -> Option<UnhandledHttpDecision>;
}

struct Registered {
    priority: i32,
    filter: EventFilter,
    listener: Arc<dyn UnhandledHttpListener>,
}

/// Registry of `unhandled-http` listeners, shared across use-case calls.
#[derive(Default)]
pub struct UnhandledHttpRegistry {
    listeners: Vec<Registered>,
}

impl UnhandledHttpRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        UnhandledHttpRegistry::default()
    }

    /// Register a listener; ties in `priority` keep registration order.
    pub fn register(&mut self, priority: i32, filter: EventFilter, listener: Arc<dyn UnhandledHttpListener>) {
        let position = self
            .listeners
            .iter()
            .position(|existing| existing.priority > priority)
            .unwrap_or(self.listeners.len());
        self.listeners.insert(
            position,
            Registered {
                priority,
                filter,
                listener,
            },
        );
    }

    /// Bind this registry to a single call's context, producing a
    /// `comlink-interpreter` collaborator the driver can borrow for the
    /// duration of one `run_to_completion`.
    #[must_use]
    pub fn scoped(&self, ctx: EventContext) -> ScopedUnhandledHttpHook<'_> {
        ScopedUnhandledHttpHook { registry: self, ctx }
    }
}

/// An [`UnhandledHttpRegistry`] bound to one call's [`EventContext`],
/// implementing the interpreter's collaborator trait directly.
pub struct ScopedUnhandledHttpHook<'a> {
    registry: &'a UnhandledHttpRegistry,
    ctx: EventContext,
}

#[async_trait]
impl UnhandledHttpHook for ScopedUnhandledHttpHook<'_> {
    async fn decide(&self, result: &HttpCallResult) -> Option<UnhandledHttpDecision> {
        for entry in &self.registry.listeners {
            if !entry.filter.matches(&self.ctx) {
                continue;
            }
            if let Some(decision) = entry.listener.decide(&self.ctx, result).await {
                return Some(decision);
            }
        }
        None
    }
}
