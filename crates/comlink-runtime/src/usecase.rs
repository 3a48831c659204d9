// SPDX-License-Identifier: MIT OR Apache-2.0
//! The use-case driver (spec §4.5): binds a profile+provider, runs the
//! interpreter, and drives the failure policy router's retry/failover
//! decisions around each attempt.

use std::sync::Arc;
use std::time::Duration;

use comlink_error::CoreError;
use comlink_events::{
    BindAndPerformArgs, EventBus, EventContext, FailurePayload, PerformArgs, PerformResult,
    SuccessPayload,
};
use comlink_http::{Fetch, HttpEngine};
use comlink_interpreter::Interpreter;
use comlink_policy::{classify_core_error, AfterFailureDecision, BeforePerformDecision, FailurePolicyRouter};
use comlink_registry::{BindRequest, RegistryClient, RegistryError};
use comlink_sandbox::Sandbox;
use comlink_variables::Variable;
use tracing::debug;

use crate::cache::{CacheKey, ProfileProviderCache};
use crate::fetch_hook::EventedHttpExecutor;
use crate::provider::translate_provider;
use crate::timers::Timers;

/// Per-call overrides a caller may pass to [`UseCaseDriver::perform`] (spec
/// §6's `UseCase.perform(input, {provider?, parameters?, security?,
/// mapVariant?, mapRevision?})`).
#[derive(Debug, Clone, Default)]
pub struct PerformOptions {
    /// Pin the call to a specific provider, disabling automatic failover
    /// for this call.
    pub provider: Option<String>,
    /// Integration parameter overrides.
    pub parameters: Option<Variable>,
    /// Security credential overrides, keyed by security id.
    pub security: Option<Variable>,
    /// Explicit map variant to bind against.
    pub map_variant: Option<String>,
    /// Explicit map revision to bind against.
    pub map_revision: Option<String>,
}

/// Everything [`UseCaseDriver::new`] needs to assemble one (profile,
/// use-case) driver.
pub struct UseCaseDriverConfig {
    /// Profile id this driver is scoped to.
    pub profile_id: String,
    /// Profile version, if pinned.
    pub profile_version: Option<String>,
    /// Use-case name this driver is scoped to.
    pub usecase: String,
    /// Resolves profile/provider/map bindings.
    pub registry: Arc<dyn RegistryClient>,
    /// Network boundary shared across every attempt's HTTP engine.
    pub fetch: Arc<dyn Fetch>,
    /// Bound profile-provider cache, shared across use-cases on the same
    /// profile.
    pub cache: Arc<ProfileProviderCache>,
    /// Retry/circuit/failover state for this (profile, use-case).
    pub router: Arc<FailurePolicyRouter>,
    /// Shared event bus.
    pub events: Arc<EventBus>,
    /// Expression evaluator for `JessieExpression` nodes.
    pub sandbox: Arc<dyn Sandbox>,
    /// Per-expression evaluation timeout.
    pub sandbox_timeout: Duration,
    /// Clock used for `success`/`failure` timestamps and cache expiry.
    pub timers: Arc<dyn Timers>,
}

/// Drives one (profile, use-case) pair: binds a provider, runs the
/// interpreter against the bound map, and lets the failure policy router
/// decide whether to retry, fail over, or give up (spec §4.5).
pub struct UseCaseDriver {
    profile_id: String,
    profile_version: Option<String>,
    usecase: String,
    registry: Arc<dyn RegistryClient>,
    fetch: Arc<dyn Fetch>,
    cache: Arc<ProfileProviderCache>,
    router: Arc<FailurePolicyRouter>,
    events: Arc<EventBus>,
    sandbox: Arc<dyn Sandbox>,
    sandbox_timeout: Duration,
    timers: Arc<dyn Timers>,
}

impl UseCaseDriver {
    /// Assemble a driver from its collaborators.
    #[must_use]
    pub fn new(config: UseCaseDriverConfig) -> Self {
        UseCaseDriver {
            profile_id: config.profile_id,
            profile_version: config.profile_version,
            usecase: config.usecase,
            registry: config.registry,
            fetch: config.fetch,
            cache: config.cache,
            router: config.router,
            events: config.events,
            sandbox: config.sandbox,
            sandbox_timeout: config.sandbox_timeout,
            timers: config.timers,
        }
    }

    /// Run this use-case against `input` (spec §4.5's full perform
    /// algorithm): bind a provider, run the interpreter, retry or fail
    /// over per the policy router, until a result or a terminal error.
    pub async fn perform(&self, input: Variable, options: PerformOptions) -> Result<Variable, CoreError> {
        let ctx = EventContext::new(self.profile_id.clone(), self.usecase.clone());
        let bind_args = BindAndPerformArgs {
            perform: PerformArgs {
                input,
                provider: options.provider,
                parameters: options.parameters,
                security: options.security,
            },
            map_variant: options.map_variant,
            map_revision: options.map_revision,
        };
        self.events
            .run_bind_and_perform(&ctx, bind_args, |args| self.run_with_failover(args))
            .await
    }

    /// An explicitly-named provider bypasses the router's sticky-provider
    /// state machine entirely — the router models one "current" provider
    /// per (profile, use-case), and has no notion of a call-scoped current
    /// provider override, so there is no sound way to route an explicit
    /// pin through its backoff/circuit bookkeeping without corrupting the
    /// state other concurrent calls observe. A named provider therefore
    /// gets exactly one attempt, with automatic failover disabled for
    /// every call on this driver from then on (spec §4.5's "explicitly
    /// selecting a provider disables automatic provider selection").
    async fn run_with_failover(&self, args: BindAndPerformArgs) -> PerformResult {
        if let Some(explicit) = args.perform.provider.clone() {
            self.router.set_allow_failover(false);
            return self.attempt_once(&explicit, args).await;
        }

        loop {
            match self.router.before_perform().await {
                BeforePerformDecision::Backoff(delay) => {
                    tokio::time::sleep(delay).await;
                    continue;
                }
                BeforePerformDecision::Recache(_) | BeforePerformDecision::Ok => {}
            }

            let provider = self.router.current_provider();
            debug!(
                target: "comlink_runtime.usecase",
                profile = %self.profile_id, usecase = %self.usecase, provider = %provider,
                "attempting use-case"
            );
            let perform_ctx = EventContext::new(self.profile_id.clone(), self.usecase.clone())
                .with_provider(provider.clone());
            let result = self
                .events
                .run_perform(&perform_ctx, args.perform.clone(), |perform_args| {
                    self.attempt(&provider, &args, perform_args)
                })
                .await;

            match result {
                Ok(value) => {
                    self.router.after_success(&provider).await;
                    self.emit_success(&perform_ctx, &provider).await;
                    return Ok(value);
                }
                Err(error) => {
                    self.emit_failure(&perform_ctx, &provider, &error).await;
                    match self.router.after_failure(&provider, &error).await {
                        AfterFailureDecision::Retry | AfterFailureDecision::Switch(_) => continue,
                        AfterFailureDecision::Abort => return Err(error),
                    }
                }
            }
        }
    }

    async fn attempt_once(&self, provider: &str, args: BindAndPerformArgs) -> PerformResult {
        let ctx = EventContext::new(self.profile_id.clone(), self.usecase.clone())
            .with_provider(provider.to_string());
        let result = self
            .events
            .run_perform(&ctx, args.perform.clone(), |perform_args| {
                self.attempt(provider, &args, perform_args)
            })
            .await;

        match &result {
            Ok(_) => self.emit_success(&ctx, provider).await,
            Err(error) => self.emit_failure(&ctx, provider, error).await,
        }
        result
    }

    async fn emit_success(&self, ctx: &EventContext, provider: &str) {
        self.events
            .emit_success(
                ctx,
                SuccessPayload {
                    profile: self.profile_id.clone(),
                    provider: provider.to_string(),
                    usecase: self.usecase.clone(),
                    time: self.timers.now_millis(),
                },
            )
            .await;
    }

    async fn emit_failure(&self, ctx: &EventContext, provider: &str, error: &CoreError) {
        self.events
            .emit_failure(
                ctx,
                FailurePayload {
                    profile: self.profile_id.clone(),
                    provider: provider.to_string(),
                    usecase: self.usecase.clone(),
                    time: self.timers.now_millis(),
                    reason: classify_core_error(error),
                },
            )
            .await;
    }

    async fn attempt(
        &self,
        provider: &str,
        bind_args: &BindAndPerformArgs,
        perform_args: PerformArgs,
    ) -> Result<Variable, CoreError> {
        let request = BindRequest {
            profile_id: self.profile_id.clone(),
            profile_version: self.profile_version.clone(),
            provider_name: provider.to_string(),
            map_variant: bind_args.map_variant.clone(),
            map_revision: bind_args.map_revision.clone(),
        };
        let key = CacheKey::from_request(&request);
        let bound = self
            .cache
            .get_or_bind(key, self.registry.as_ref(), &request, self.timers.as_ref())
            .await
            .map_err(CoreError::from)?;

        let map = bound.map.maps.get(&self.usecase).ok_or_else(|| {
            CoreError::from(RegistryError::MissingMap {
                usecase: self.usecase.clone(),
            })
        })?;

        let (selector, security) = translate_provider(&bound.provider, perform_args.security.as_ref())?;
        let http = HttpEngine::new(Arc::clone(&self.fetch), selector, security);

        let hook_ctx = EventContext::new(self.profile_id.clone(), self.usecase.clone())
            .with_provider(provider.to_string());
        let hook = self.events.unhandled_http_hook(hook_ctx.clone());
        let evented_http = EventedHttpExecutor::new(&http, Arc::clone(&self.events), hook_ctx);

        let parameters = perform_args.parameters.unwrap_or_else(Variable::empty_object);
        let interpreter = Interpreter::new(
            &bound.map,
            self.sandbox.as_ref(),
            self.sandbox_timeout,
            &evented_http,
            &hook,
            perform_args.input,
            parameters,
        );
        interpreter.run_to_completion(map).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use comlink_http::{FetchError, FetchRequest, FetchResponse};
    use comlink_interpreter::ast::{MapDefinition, MapDocument, OutcomeStatement, Statement, Expr};
    use comlink_policy::{BackoffPolicy, PolicyKind, RouterConfig};
    use comlink_registry::{BindResponse, ProviderJson};
    use comlink_sandbox::CelSandbox;
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicU32, Ordering};
    use crate::timers::ManualTimers;

    struct StubFetch;
    #[async_trait]
    impl Fetch for StubFetch {
        async fn fetch(&self, _request: FetchRequest) -> Result<FetchResponse, FetchError> {
            Err(FetchError::Dns("stub never called".to_string()))
        }
    }

    fn map_document_returning(value: serde_json::Value) -> MapDocument {
        let mut maps = BTreeMap::new();
        maps.insert(
            "GetThing".to_string(),
            MapDefinition {
                name: "GetThing".to_string(),
                statements: vec![Statement::Outcome(OutcomeStatement {
                    condition: None,
                    value: Expr::PrimitiveLiteral(value),
                    is_error: false,
                    source_location: None,
                })],
            },
        );
        MapDocument { maps, operations: BTreeMap::new() }
    }

    struct FlakyThenOkRegistry {
        calls: AtomicU32,
    }

    #[async_trait]
    impl RegistryClient for FlakyThenOkRegistry {
        async fn bind(&self, request: &BindRequest) -> Result<BindResponse, RegistryError> {
            let attempt = self.calls.fetch_add(1, Ordering::SeqCst);
            if request.provider_name == "p1" && attempt == 0 {
                return Err(RegistryError::Http {
                    status_code: 503,
                    title: "unavailable".to_string(),
                    detail: None,
                });
            }
            Ok(BindResponse {
                provider: ProviderJson { services: BTreeMap::new() },
                map: map_document_returning(serde_json::json!("ok")),
            })
        }
    }

    fn driver_with(
        registry: Arc<dyn RegistryClient>,
        router: Arc<FailurePolicyRouter>,
        events: Arc<EventBus>,
        timers: Arc<ManualTimers>,
    ) -> UseCaseDriver {
        UseCaseDriver::new(UseCaseDriverConfig {
            profile_id: "acme/get-thing".to_string(),
            profile_version: None,
            usecase: "GetThing".to_string(),
            registry,
            fetch: Arc::new(StubFetch),
            cache: Arc::new(ProfileProviderCache::new(Duration::from_secs(60))),
            router,
            events,
            sandbox: Arc::new(CelSandbox::new()),
            sandbox_timeout: Duration::from_millis(500),
            timers,
        })
    }

    #[tokio::test]
    async fn single_provider_simple_retry_recovers_from_one_failure() {
        let timers = Arc::new(ManualTimers::new(0));
        let events = Arc::new(EventBus::new());
        let mut policies = BTreeMap::new();
        policies.insert(
            "p1".to_string(),
            PolicyKind::SimpleRetry {
                max_contiguous_retries: 2,
                backoff: BackoffPolicy::Constant { delay: Duration::from_millis(1) },
                request_timeout: Duration::from_secs(5),
            },
        );
        let router = Arc::new(FailurePolicyRouter::new(
            RouterConfig {
                profile: "acme/get-thing".to_string(),
                usecase: "GetThing".to_string(),
                providers: vec!["p1".to_string()],
                priority: vec!["p1".to_string()],
                allow_failover: false,
                policies,
            },
            Arc::new(comlink_policy::ManualTimers::new(0)),
            events.clone(),
        ));
        let registry = Arc::new(FlakyThenOkRegistry { calls: AtomicU32::new(0) });
        let driver = driver_with(registry, router, events.clone(), timers);

        let result = driver
            .perform(Variable::empty_object(), PerformOptions::default())
            .await
            .unwrap();

        assert_eq!(result, Variable::String("ok".to_string()));
        assert_eq!(events.stats().success, 1);
        assert_eq!(events.stats().failure, 1);
    }

    #[tokio::test]
    async fn explicit_provider_disables_failover_and_attempts_once() {
        let timers = Arc::new(ManualTimers::new(0));
        let events = Arc::new(EventBus::new());
        let mut policies = BTreeMap::new();
        policies.insert("p1".to_string(), PolicyKind::NoRetry);
        policies.insert("p2".to_string(), PolicyKind::NoRetry);
        let router = Arc::new(FailurePolicyRouter::new(
            RouterConfig {
                profile: "acme/get-thing".to_string(),
                usecase: "GetThing".to_string(),
                providers: vec!["p1".to_string(), "p2".to_string()],
                priority: vec!["p1".to_string(), "p2".to_string()],
                allow_failover: true,
                policies,
            },
            Arc::new(comlink_policy::ManualTimers::new(0)),
            events.clone(),
        ));
        let registry = Arc::new(FlakyThenOkRegistry { calls: AtomicU32::new(0) });
        let driver = driver_with(registry, router, events.clone(), timers);

        let err = driver
            .perform(
                Variable::empty_object(),
                PerformOptions { provider: Some("p1".to_string()), ..Default::default() },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, CoreError::Binding { .. }));
        assert_eq!(events.stats().failure, 1);
        assert_eq!(events.stats().provider_switch, 0);
    }
}
