// SPDX-License-Identifier: MIT OR Apache-2.0
//! Generic interceptor machinery (spec §4.3): a priority-ordered,
//! filter-matched listener chain, plus the around-wrapper algorithm that
//! drives `pre-<E>`/`post-<E>` emission for a single event kind.
//!
//! Typed channels keyed by each event's own argument/result shape, one
//! [`InterceptorChain`] per event kind rather than one registry of a
//! single fixed hook trait.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use crate::event::{EventContext, EventFilter};

/// What a `pre-<E>` listener decides.
pub enum BeforeOutcome<A, R> {
    /// Proceed with the (possibly already modified) args.
    Continue,
    /// Replace the args seen by the remaining before-listeners and the
    /// inner call.
    ModifyArgs(A),
    /// Skip the inner call entirely and use this result.
    Abort(R),
}

/// What a `post-<E>` listener decides.
pub enum AfterOutcome<A, R> {
    /// Proceed with the (possibly already modified) result.
    Continue,
    /// Replace the result seen by the remaining after-listeners and the
    /// caller.
    ModifyResult(R),
    /// Re-run the whole before/call/after cycle, optionally with new args.
    Retry(Option<A>),
}

/// A `pre-<E>` listener.
#[async_trait]
pub trait BeforeListener<A, R>: Send + Sync {
    /// Inspect (and optionally rewrite or short-circuit) the pending call.
    async fn on_before(&self, ctx: &EventContext, args: &A) -> BeforeOutcome<A, R>;
}

/// A `post-<E>` listener.
#[async_trait]
pub trait AfterListener<A, R>: Send + Sync {
    /// Inspect (and optionally rewrite or retry) a completed call.
    async fn on_after(&self, ctx: &EventContext, args: &A, result: &R) -> AfterOutcome<A, R>;
}

struct Registered<L> {
    priority: i32,
    filter: EventFilter,
    listener: L,
}

fn insert_sorted<L>(entries: &mut Vec<Registered<L>>, entry: Registered<L>) {
    let position = entries
        .iter()
        .position(|existing| existing.priority > entry.priority)
        .unwrap_or(entries.len());
    entries.insert(position, entry);
}

/// Priority-ordered, filter-matched chain of before/after listeners for one
/// event kind, implementing the around-wrapper algorithm of spec §4.3.
pub struct InterceptorChain<A, R> {
    before: Vec<Registered<Arc<dyn BeforeListener<A, R>>>>,
    after: Vec<Registered<Arc<dyn AfterListener<A, R>>>>,
}

impl<A, R> Default for InterceptorChain<A, R> {
    fn default() -> Self {
        InterceptorChain {
            before: Vec::new(),
            after: Vec::new(),
        }
    }
}

impl<A, R> InterceptorChain<A, R>
where
    A: Clone + Send + Sync,
    R: Send + Sync,
{
    /// Create an empty chain.
    #[must_use]
    pub fn new() -> Self {
        InterceptorChain::default()
    }

    /// Register a `pre-<E>` listener. Listeners fire in ascending
    /// `priority` order (ties keep registration order).
    pub fn register_before(
        &mut self,
        priority: i32,
        filter: EventFilter,
        listener: Arc<dyn BeforeListener<A, R>>,
    ) {
        insert_sorted(
            &mut self.before,
            Registered {
                priority,
                filter,
                listener,
            },
        );
    }

    /// Register a `post-<E>` listener, same ordering rule as
    /// [`InterceptorChain::register_before`].
    pub fn register_after(
        &mut self,
        priority: i32,
        filter: EventFilter,
        listener: Arc<dyn AfterListener<A, R>>,
    ) {
        insert_sorted(
            &mut self.after,
            Registered {
                priority,
                filter,
                listener,
            },
        );
    }

    /// Run the around-wrapper algorithm: emit `pre-<E>`, call `inner`
    /// (unless aborted), emit `post-<E>`, looping on `retry`.
    ///
    /// Ordering guarantees of spec §4.3/§5: within one phase, listeners run
    /// sequentially in priority order, each awaited before the next runs;
    /// `abort`/`retry` short-circuits the remaining listeners in that
    /// phase. Re-entrancy is permitted — `inner` or a listener may itself
    /// emit other events.
    pub async fn run<F, Fut>(&self, ctx: &EventContext, mut args: A, inner: F) -> R
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = R>,
    {
        loop {
            let mut aborted: Option<R> = None;
            for entry in &self.before {
                if !entry.filter.matches(ctx) {
                    continue;
                }
                match entry.listener.on_before(ctx, &args).await {
                    BeforeOutcome::Continue => {}
                    BeforeOutcome::ModifyArgs(new_args) => args = new_args,
                    BeforeOutcome::Abort(result) => {
                        aborted = Some(result);
                        break;
                    }
                }
            }

            let mut result = match aborted {
                Some(result) => result,
                None => inner(args.clone()).await,
            };

            let mut retry: Option<Option<A>> = None;
            for entry in &self.after {
                if !entry.filter.matches(ctx) {
                    continue;
                }
                match entry.listener.on_after(ctx, &args, &result).await {
                    AfterOutcome::Continue => {}
                    AfterOutcome::ModifyResult(new_result) => result = new_result,
                    AfterOutcome::Retry(new_args) => {
                        retry = Some(new_args);
                        break;
                    }
                }
            }

            match retry {
                Some(new_args) => {
                    if let Some(new_args) = new_args {
                        args = new_args;
                    }
                    continue;
                }
                None => return result,
            }
        }
    }
}

/// A fire-and-forget listener for void events (`success`, `failure`,
/// `provider-switch`) that carry a payload but have no interception
/// outcome.
#[async_trait]
pub trait VoidListener<P>: Send + Sync {
    /// Observe the payload. Cannot influence the emission.
    async fn on_event(&self, ctx: &EventContext, payload: &P);
}

/// Priority-ordered, filter-matched chain of void listeners.
pub struct VoidChannel<P> {
    listeners: Vec<Registered<Arc<dyn VoidListener<P>>>>,
}

impl<P> Default for VoidChannel<P> {
    fn default() -> Self {
        VoidChannel {
            listeners: Vec::new(),
        }
    }
}

impl<P: Send + Sync> VoidChannel<P> {
    /// Create an empty channel.
    #[must_use]
    pub fn new() -> Self {
        VoidChannel::default()
    }

    /// Register a listener; ordering rule matches
    /// [`InterceptorChain::register_before`].
    pub fn register(
        &mut self,
        priority: i32,
        filter: EventFilter,
        listener: Arc<dyn VoidListener<P>>,
    ) {
        insert_sorted(
            &mut self.listeners,
            Registered {
                priority,
                filter,
                listener,
            },
        );
    }

    /// Fire every matching listener sequentially, in priority order.
    pub async fn emit(&self, ctx: &EventContext, payload: &P) {
        for entry in &self.listeners {
            if !entry.filter.matches(ctx) {
                continue;
            }
            entry.listener.on_event(ctx, payload).await;
        }
    }

    /// Number of registered listeners, for diagnostics/tests.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
