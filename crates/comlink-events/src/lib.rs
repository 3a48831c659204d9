// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Typed event bus with prioritized before/after/around interception
//! (spec §4.3).
//!
//! Priority-ordered listener firing, filter-matched and keyed per event
//! kind rather than one fixed callback trait, plus per-event-kind
//! emission counters on [`EventBus`] for publish-statistics tracking.

mod bus;
mod channel;
mod event;
mod http_hook;
mod payload;

pub use bus::{EventBus, EventBusStats};
pub use channel::{AfterListener, AfterOutcome, BeforeListener, BeforeOutcome, InterceptorChain, VoidChannel, VoidListener};
pub use event::{EventContext, EventFilter};
pub use http_hook::{ScopedUnhandledHttpHook, UnhandledHttpListener, UnhandledHttpRegistry};
pub use payload::{
    BindAndPerformArgs, FailoverReason, FailurePayload, FetchArgs, FetchResult, PerformArgs,
    PerformResult, ProviderSwitchPayload, SuccessPayload,
};
