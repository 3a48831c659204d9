// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`FailurePolicyRouter`]: one router per (profile, use-case), holding one
//! [`crate::policy::PolicyKind`]/[`ProviderState`] per provider (spec §4.4).

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use comlink_error::CoreError;
use comlink_events::{EventBus, EventContext, FailoverReason, ProviderSwitchPayload};
use tokio::sync::Mutex;

use crate::circuit::{CircuitMode, ProviderState};
use crate::classify::classify_core_error;
use crate::decision::{AfterFailureDecision, BeforePerformDecision};
use crate::policy::PolicyKind;
use crate::timers::Timers;

/// Whether a use-case defaults to allowing failover when not explicitly
/// configured (spec §4.4: "Only *unsafe* use-cases default to no
/// failover — *safe* use-cases may failover without special
/// annotation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UseCaseSafety {
    /// Retrying against a different provider cannot cause a duplicate
    /// side effect.
    Safe,
    /// Retrying against a different provider could duplicate a side
    /// effect (e.g. a payment) unless the use-case opts in explicitly.
    Unsafe,
}

/// The default `allow_failover` value for a use-case that did not
/// explicitly configure one, derived from its declared safety.
#[must_use]
pub fn default_allow_failover(safety: UseCaseSafety) -> bool {
    matches!(safety, UseCaseSafety::Safe)
}

/// Construction input for a [`FailurePolicyRouter`].
pub struct RouterConfig {
    /// Profile id this router is scoped to.
    pub profile: String,
    /// Use-case name this router is scoped to.
    pub usecase: String,
    /// Every provider configured for this use-case, in the order they
    /// appear in the configuration.
    pub providers: Vec<String>,
    /// Explicit failover priority order; empty means "not configured".
    pub priority: Vec<String>,
    /// Whether failover across providers is allowed at all.
    pub allow_failover: bool,
    /// Policy for each provider in `providers`. A provider with no entry
    /// defaults to [`PolicyKind::NoRetry`].
    pub policies: BTreeMap<String, PolicyKind>,
}

/// Router for one (profile, use-case): decides whether to proceed, wait,
/// retry, or fail over on every attempt (spec §4.4).
pub struct FailurePolicyRouter {
    ctx: EventContext,
    priority: Vec<String>,
    allow_failover: AtomicBool,
    current: AtomicUsize,
    states: Mutex<BTreeMap<String, ProviderState>>,
    timers: Arc<dyn Timers>,
    events: Arc<EventBus>,
}

impl FailurePolicyRouter {
    /// Build a router, logging the misconfiguration warnings spec §4.4
    /// names (non-empty priority with failover disabled; empty priority
    /// with failover enabled).
    #[must_use]
    pub fn new(config: RouterConfig, timers: Arc<dyn Timers>, events: Arc<EventBus>) -> Self {
        let priority = if config.priority.is_empty() {
            if config.allow_failover && config.providers.len() > 1 {
                tracing::warn!(
                    target: "comlink_policy.router",
                    profile = %config.profile,
                    usecase = %config.usecase,
                    "failover is enabled but no priority was configured; defaulting to \
                     configuration order"
                );
            }
            config.providers.clone()
        } else {
            if !config.allow_failover {
                tracing::warn!(
                    target: "comlink_policy.router",
                    profile = %config.profile,
                    usecase = %config.usecase,
                    "a provider priority was configured but failover is disabled; \
                     priority will be ignored"
                );
            }
            config.priority.clone()
        };

        let states = priority
            .iter()
            .map(|name| {
                let policy = config
                    .policies
                    .get(name)
                    .cloned()
                    .unwrap_or(PolicyKind::NoRetry);
                (name.clone(), ProviderState::new(policy))
            })
            .collect();

        FailurePolicyRouter {
            ctx: EventContext::new(config.profile, config.usecase),
            priority,
            allow_failover: AtomicBool::new(config.allow_failover),
            current: AtomicUsize::new(0),
            states: Mutex::new(states),
            timers,
            events,
        }
    }

    /// Disable or enable failover (spec §4.4's `setAllowFailover`); the
    /// use-case driver calls this with `false` when the caller explicitly
    /// named a provider.
    pub fn set_allow_failover(&self, allow: bool) {
        self.allow_failover.store(allow, Ordering::SeqCst);
    }

    fn allow_failover(&self) -> bool {
        self.allow_failover.load(Ordering::SeqCst)
    }

    /// The provider currently selected (spec §4.5's "current provider
    /// (sticky)").
    #[must_use]
    pub fn current_provider(&self) -> String {
        let index = self.current.load(Ordering::SeqCst);
        self.priority[index % self.priority.len()].clone()
    }

    async fn read<T>(&self, provider: &str, f: impl FnOnce(&ProviderState) -> T) -> T {
        let states = self.states.lock().await;
        let state = states
            .get(provider)
            .expect("provider must be registered with the router");
        f(state)
    }

    async fn write<T>(&self, provider: &str, f: impl FnOnce(&mut ProviderState) -> T) -> T {
        let mut states = self.states.lock().await;
        let state = states
            .get_mut(provider)
            .expect("provider must be registered with the router");
        f(state)
    }

    /// Find the next provider after `from` (round-robin through
    /// `priority`) whose circuit is not `Open`.
    async fn select_next_healthy(&self, from: &str) -> Option<String> {
        let from_index = self.priority.iter().position(|p| p == from)?;
        for offset in 1..self.priority.len() {
            let candidate = &self.priority[(from_index + offset) % self.priority.len()];
            let healthy = self.read(candidate, |s| s.mode != CircuitMode::Open).await;
            if healthy {
                return Some(candidate.clone());
            }
        }
        None
    }

    async fn switch_current_to(&self, from: &str, to: &str, reasons: Vec<FailoverReason>) {
        if let Some(index) = self.priority.iter().position(|p| p == to) {
            self.current.store(index, Ordering::SeqCst);
        }
        self.events
            .emit_provider_switch(
                &self.ctx,
                ProviderSwitchPayload {
                    from: from.to_string(),
                    to: Some(to.to_string()),
                    reasons,
                },
            )
            .await;
    }

    /// `beforePerform(provider)` (spec §4.4), applied to the current
    /// sticky provider.
    pub async fn before_perform(&self) -> BeforePerformDecision {
        let provider = self.current_provider();

        let pending = self.write(&provider, |s| s.pending_backoff.take()).await;
        if let Some(backoff) = pending {
            return BeforePerformDecision::Backoff(backoff);
        }

        let mode = self.read(&provider, |s| s.mode).await;
        if mode != CircuitMode::Open {
            return BeforePerformDecision::Ok;
        }

        let now = self.timers.now_millis();
        let ready_at = self.read(&provider, |s| s.next_attempt_at.unwrap_or(0)).await;
        if now >= ready_at {
            self.write(&provider, |s| s.mode = CircuitMode::HalfOpen).await;
            return BeforePerformDecision::Ok;
        }

        if self.allow_failover() {
            if let Some(next) = self.select_next_healthy(&provider).await {
                self.switch_current_to(&provider, &next, Vec::new()).await;
                return BeforePerformDecision::Recache(format!(
                    "provider '{provider}' circuit is open, switched to '{next}'"
                ));
            }
        }

        BeforePerformDecision::Backoff(Duration::from_millis(ready_at.saturating_sub(now)))
    }

    /// `afterFailure(provider, reason)` (spec §4.4).
    pub async fn after_failure(&self, provider: &str, error: &CoreError) -> AfterFailureDecision {
        let policy = self.read(provider, |s| s.policy.clone()).await;

        match policy {
            PolicyKind::NoRetry => AfterFailureDecision::Abort,

            PolicyKind::SimpleRetry {
                max_contiguous_retries,
                backoff,
                ..
            } => {
                let attempt = self
                    .write(provider, |s| {
                        s.consecutive_failures += 1;
                        s.consecutive_successes = 0;
                        s.consecutive_failures
                    })
                    .await;
                if attempt > max_contiguous_retries {
                    self.write(provider, |s| s.consecutive_failures = 0).await;
                    AfterFailureDecision::Abort
                } else {
                    let delay = backoff.compute(attempt);
                    self.write(provider, |s| s.pending_backoff = Some(delay)).await;
                    AfterFailureDecision::Retry
                }
            }

            PolicyKind::CircuitBreaker {
                max_contiguous_failures,
                open_time,
                max_open_time,
                ..
            } => {
                let now = self.timers.now_millis();
                let opened = self
                    .write(provider, |s| {
                        match s.mode {
                            CircuitMode::HalfOpen => {
                                let doubled = s.current_backoff.saturating_mul(2);
                                s.current_backoff = doubled.min(max_open_time);
                                s.mode = CircuitMode::Open;
                                s.opened_at = Some(now);
                                s.next_attempt_at = Some(now + s.current_backoff.as_millis() as u64);
                                true
                            }
                            CircuitMode::Closed => {
                                s.consecutive_failures += 1;
                                s.consecutive_successes = 0;
                                if s.consecutive_failures >= max_contiguous_failures {
                                    s.mode = CircuitMode::Open;
                                    s.current_backoff = open_time;
                                    s.opened_at = Some(now);
                                    s.next_attempt_at = Some(now + open_time.as_millis() as u64);
                                    true
                                } else {
                                    false
                                }
                            }
                            CircuitMode::Open => false,
                        }
                    })
                    .await;

                if !opened {
                    return AfterFailureDecision::Retry;
                }
                if !self.allow_failover() {
                    return AfterFailureDecision::Abort;
                }
                match self.select_next_healthy(provider).await {
                    Some(next) => {
                        let reason = classify_core_error(error);
                        self.switch_current_to(provider, &next, reason.into_iter().collect())
                            .await;
                        AfterFailureDecision::Switch(next)
                    }
                    None => AfterFailureDecision::Abort,
                }
            }
        }
    }

    /// `afterSuccess(provider)` (spec §4.4): resets failure counters and,
    /// from `HalfOpen`, closes the circuit.
    pub async fn after_success(&self, provider: &str) {
        self.write(provider, |s| {
            s.pending_backoff = None;
            s.consecutive_successes += 1;
            if s.mode == CircuitMode::HalfOpen {
                s.reset_to_closed();
                s.consecutive_successes = 1;
            } else {
                s.consecutive_failures = 0;
            }
        })
        .await;
    }
}
