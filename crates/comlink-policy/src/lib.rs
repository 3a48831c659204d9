// SPDX-License-Identifier: MIT OR Apache-2.0
//! Failure policy router: per-(profile, use-case) circuit breaker,
//! backoff, request timeout, and provider failover decisions.
//!
//! This crate's decision types carry the *action* to take (wait this
//! long, switch to this provider, retry) rather than a single allow/deny
//! bit, because a failure policy here has to drive retries and failover,
//! not just gate a request.

mod backoff;
mod circuit;
mod classify;
mod decision;
mod policy;
mod router;
mod timers;

pub use crate::backoff::BackoffPolicy;
pub use circuit::{CircuitMode, ProviderState};
pub use classify::classify_core_error;
pub use decision::{AfterFailureDecision, BeforePerformDecision};
pub use policy::PolicyKind;
pub use router::{default_allow_failover, FailurePolicyRouter, RouterConfig, UseCaseSafety};
pub use timers::{ManualTimers, SystemTimers, Timers};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::time::Duration;

    use comlink_error::CoreError;
    use comlink_events::EventBus;

    fn dns_error() -> CoreError {
        CoreError::Http {
            status_code: 0,
            request_debug: "[network:dns] GET http://unreachable.example".to_string(),
            response_body: None,
        }
    }

    fn server_error() -> CoreError {
        CoreError::Http {
            status_code: 503,
            request_debug: "GET http://host/flaky".to_string(),
            response_body: None,
        }
    }

    fn router_with(
        policies: BTreeMap<String, PolicyKind>,
        allow_failover: bool,
    ) -> (Arc<FailurePolicyRouter>, Arc<ManualTimers>, Arc<EventBus>) {
        let timers = Arc::new(ManualTimers::new(0));
        let events = Arc::new(EventBus::new());
        let config = RouterConfig {
            profile: "acme".to_string(),
            usecase: "get-user".to_string(),
            providers: vec!["p1".to_string(), "p2".to_string()],
            priority: vec!["p1".to_string(), "p2".to_string()],
            allow_failover,
            policies,
        };
        let router = Arc::new(FailurePolicyRouter::new(config, timers.clone(), events.clone()));
        (router, timers, events)
    }

    #[tokio::test]
    async fn no_retry_aborts_on_first_failure() {
        let mut policies = BTreeMap::new();
        policies.insert("p1".to_string(), PolicyKind::NoRetry);
        policies.insert("p2".to_string(), PolicyKind::NoRetry);
        let (router, _timers, _events) = router_with(policies, false);

        assert_eq!(router.before_perform().await, BeforePerformDecision::Ok);
        let decision = router.after_failure("p1", &server_error()).await;
        assert_eq!(decision, AfterFailureDecision::Abort);
    }

    #[tokio::test]
    async fn simple_retry_backs_off_then_gives_up() {
        let mut policies = BTreeMap::new();
        policies.insert(
            "p1".to_string(),
            PolicyKind::SimpleRetry {
                max_contiguous_retries: 2,
                backoff: BackoffPolicy::Constant { delay: Duration::from_millis(50) },
                request_timeout: Duration::from_secs(5),
            },
        );
        let (router, _timers, _events) = router_with(policies, false);

        assert_eq!(
            router.after_failure("p1", &server_error()).await,
            AfterFailureDecision::Retry
        );
        assert_eq!(
            router.before_perform().await,
            BeforePerformDecision::Backoff(Duration::from_millis(50))
        );
        assert_eq!(
            router.after_failure("p1", &server_error()).await,
            AfterFailureDecision::Retry
        );
        assert_eq!(
            router.after_failure("p1", &server_error()).await,
            AfterFailureDecision::Abort
        );
    }

    #[tokio::test]
    async fn circuit_breaker_opens_and_fails_over() {
        let mut policies = BTreeMap::new();
        policies.insert(
            "p1".to_string(),
            PolicyKind::CircuitBreaker {
                max_contiguous_failures: 2,
                open_time: Duration::from_millis(100),
                max_open_time: Duration::from_secs(1),
                request_timeout: Duration::from_secs(5),
            },
        );
        policies.insert(
            "p2".to_string(),
            PolicyKind::CircuitBreaker {
                max_contiguous_failures: 2,
                open_time: Duration::from_millis(100),
                max_open_time: Duration::from_secs(1),
                request_timeout: Duration::from_secs(5),
            },
        );
        let (router, _timers, events) = router_with(policies, true);

        assert_eq!(router.current_provider(), "p1");
        assert_eq!(
            router.after_failure("p1", &dns_error()).await,
            AfterFailureDecision::Retry
        );
        let decision = router.after_failure("p1", &dns_error()).await;
        assert_eq!(decision, AfterFailureDecision::Switch("p2".to_string()));
        assert_eq!(router.current_provider(), "p2");
        assert_eq!(events.stats().provider_switch, 1);
    }

    #[tokio::test]
    async fn circuit_closes_again_after_successful_probe() {
        let mut policies = BTreeMap::new();
        policies.insert(
            "p1".to_string(),
            PolicyKind::CircuitBreaker {
                max_contiguous_failures: 1,
                open_time: Duration::from_millis(100),
                max_open_time: Duration::from_secs(1),
                request_timeout: Duration::from_secs(5),
            },
        );
        policies.insert("p2".to_string(), PolicyKind::NoRetry);
        let (router, timers, _events) = router_with(policies, false);

        assert_eq!(
            router.after_failure("p1", &server_error()).await,
            AfterFailureDecision::Abort
        );
        assert_eq!(
            router.before_perform().await,
            BeforePerformDecision::Backoff(Duration::from_millis(100))
        );

        timers.advance(100);
        assert_eq!(router.before_perform().await, BeforePerformDecision::Ok);

        router.after_success("p1").await;
        assert_eq!(router.before_perform().await, BeforePerformDecision::Ok);
    }

    #[test]
    fn safe_usecases_default_to_allowing_failover() {
        assert!(default_allow_failover(UseCaseSafety::Safe));
        assert!(!default_allow_failover(UseCaseSafety::Unsafe));
    }
}
