// SPDX-License-Identifier: MIT OR Apache-2.0
//! End-to-end scenarios wiring every collaborator crate together the way
//! the public facade does: bind a provider, run the interpreter against a
//! real (wiremock-backed) HTTP server, and drive failure policy/events the
//! way a use-case call actually would.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use comlink_error::CoreError;
use comlink_events::{AfterListener, AfterOutcome, EventBus, EventContext, EventFilter};
use comlink_http::{Fetch, FetchError, FetchRequest, FetchResponse, ReqwestFetch};
use comlink_interpreter::ast::{
    Expr, HttpCallStatement, HttpResponseHandler, MapDefinition, MapDocument, OutcomeStatement,
    Statement,
};
use comlink_interpreter::collaborators::HttpCallSpec;
use comlink_metrics::{DebounceConfig, MetricsReporter, MetricsSink, ProviderMetrics};
use comlink_metrics::ManualTimers as MetricsManualTimers;
use comlink_policy::ManualTimers as PolicyManualTimers;
use comlink_policy::{FailurePolicyRouter, PolicyKind, RouterConfig};
use comlink_registry::{BindRequest, BindResponse, MockRegistryClient, ProviderJson, SecuritySchemeJson, ServiceJson};
use comlink_runtime::{ManualTimers, PerformOptions, ProfileProviderCache, UseCaseDriver, UseCaseDriverConfig};
use comlink_sandbox::CelSandbox;
use comlink_variables::Variable;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http_get_map(usecase: &str, url: &str, security: Option<&str>) -> MapDocument {
    let mut maps = BTreeMap::new();
    maps.insert(
        usecase.to_string(),
        MapDefinition {
            name: usecase.to_string(),
            statements: vec![Statement::HttpCall(HttpCallStatement {
                service_id: "default".to_string(),
                method: "GET".to_string(),
                url: url.to_string(),
                security: security.map(str::to_string),
                request: None,
                response_handlers: vec![HttpResponseHandler {
                    status_code: Some(200),
                    content_type: None,
                    content_language: None,
                    statements: vec![Statement::Outcome(OutcomeStatement {
                        condition: None,
                        value: Expr::Jessie {
                            source: "body".to_string(),
                            source_location: None,
                        },
                        is_error: false,
                        source_location: None,
                    })],
                }],
            })],
        },
    );
    MapDocument { maps, operations: BTreeMap::new() }
}

fn bind_request(profile: &str, provider: &str) -> BindRequest {
    BindRequest {
        profile_id: profile.to_string(),
        profile_version: None,
        provider_name: provider.to_string(),
        map_variant: None,
        map_revision: None,
    }
}

fn single_service_provider(base_url: &str, security: BTreeMap<String, SecuritySchemeJson>) -> ProviderJson {
    let mut services = BTreeMap::new();
    services.insert("default".to_string(), ServiceJson { base_url: base_url.to_string(), security });
    ProviderJson { services }
}

fn driver_for(
    profile: &str,
    usecase: &str,
    registry: Arc<MockRegistryClient>,
    fetch: Arc<dyn Fetch>,
    router: Arc<FailurePolicyRouter>,
    events: Arc<EventBus>,
) -> UseCaseDriver {
    UseCaseDriver::new(UseCaseDriverConfig {
        profile_id: profile.to_string(),
        profile_version: None,
        usecase: usecase.to_string(),
        registry,
        fetch,
        cache: Arc::new(ProfileProviderCache::new(Duration::from_secs(60))),
        router,
        events,
        sandbox: Arc::new(CelSandbox::new()),
        sandbox_timeout: Duration::from_millis(500),
        timers: Arc::new(ManualTimers::new(0)),
    })
}

fn no_retry_router(profile: &str, usecase: &str, providers: &[&str], events: Arc<EventBus>) -> Arc<FailurePolicyRouter> {
    let providers: Vec<String> = providers.iter().map(|p| p.to_string()).collect();
    let policies = providers
        .iter()
        .map(|p| (p.clone(), PolicyKind::NoRetry))
        .collect();
    Arc::new(FailurePolicyRouter::new(
        RouterConfig {
            profile: profile.to_string(),
            usecase: usecase.to_string(),
            providers: providers.clone(),
            priority: providers,
            allow_failover: false,
            policies,
        },
        Arc::new(PolicyManualTimers::new(0)),
        events,
    ))
}

/// Scenario: a simple GET with no path parameters maps the response body
/// straight through to the use-case result.
#[tokio::test]
async fn simple_get_maps_response_body_to_result() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/things"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "42"})))
        .mount(&server)
        .await;

    let registry = Arc::new(MockRegistryClient::new());
    registry.queue(
        &bind_request("acme/get-thing", "p1"),
        Ok(BindResponse {
            provider: single_service_provider(&server.uri(), BTreeMap::new()),
            map: http_get_map("GetThing", "/things", None),
        }),
    );
    let events = Arc::new(EventBus::new());
    let router = no_retry_router("acme/get-thing", "GetThing", &["p1"], events.clone());
    let driver = driver_for(
        "acme/get-thing",
        "GetThing",
        registry,
        Arc::new(ReqwestFetch::default()),
        router,
        events.clone(),
    );

    let result = driver
        .perform(Variable::empty_object(), PerformOptions::default())
        .await
        .unwrap();

    assert_eq!(
        result,
        Variable::from_iter([("id".to_string(), Variable::String("42".to_string()))])
    );
    assert_eq!(events.stats().success, 1);
}

/// Scenario: a path parameter is drawn from the use-case's `input`. The
/// map stages it onto the stack with a `set` statement (`id = input.id`)
/// before the HTTP call templates `{id}` into the URL — the only way a
/// path placeholder can resolve, since `HttpEngine` substitutes against
/// the call's scope, not `input`/`parameters` directly.
#[tokio::test]
async fn path_parameter_is_drawn_from_input() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/things/42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "42"})))
        .mount(&server)
        .await;

    let mut maps = BTreeMap::new();
    maps.insert(
        "GetThing".to_string(),
        MapDefinition {
            name: "GetThing".to_string(),
            statements: vec![
                Statement::Set(comlink_interpreter::ast::SetStatement {
                    condition: None,
                    assignments: vec![comlink_interpreter::ast::Assignment {
                        path: vec!["id".to_string()],
                        value: Expr::Jessie { source: "input.id".to_string(), source_location: None },
                    }],
                    source_location: None,
                }),
                Statement::HttpCall(HttpCallStatement {
                    service_id: "default".to_string(),
                    method: "GET".to_string(),
                    url: "/things/{id}".to_string(),
                    security: None,
                    request: None,
                    response_handlers: vec![HttpResponseHandler {
                        status_code: Some(200),
                        content_type: None,
                        content_language: None,
                        statements: vec![Statement::Outcome(OutcomeStatement {
                            condition: None,
                            value: Expr::Jessie { source: "body".to_string(), source_location: None },
                            is_error: false,
                            source_location: None,
                        })],
                    }],
                }),
            ],
        },
    );
    let map = MapDocument { maps, operations: BTreeMap::new() };

    let registry = Arc::new(MockRegistryClient::new());
    registry.queue(
        &bind_request("acme/get-thing", "p1"),
        Ok(BindResponse { provider: single_service_provider(&server.uri(), BTreeMap::new()), map }),
    );
    let events = Arc::new(EventBus::new());
    let router = no_retry_router("acme/get-thing", "GetThing", &["p1"], events.clone());
    let driver = driver_for(
        "acme/get-thing",
        "GetThing",
        registry,
        Arc::new(ReqwestFetch::default()),
        router,
        events.clone(),
    );

    let input = Variable::from_iter([("id".to_string(), Variable::String("42".to_string()))]);
    let result = driver.perform(input, PerformOptions::default()).await.unwrap();

    assert_eq!(
        result,
        Variable::from_iter([("id".to_string(), Variable::String("42".to_string()))])
    );
}

/// Scenario: a service secured with HTTP Basic gets an `Authorization`
/// header built from the provider's declared credentials.
#[tokio::test]
async fn basic_auth_security_scheme_is_applied() {
    let server = MockServer::start().await;
    let expected_auth = format!(
        "Basic {}",
        base64::Engine::encode(&base64::engine::general_purpose::STANDARD, "alice:s3cret")
    );
    Mock::given(method("GET"))
        .and(path("/things"))
        .and(header("authorization", expected_auth.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
        .mount(&server)
        .await;

    let mut security = BTreeMap::new();
    security.insert(
        "main".to_string(),
        SecuritySchemeJson::Basic { username: "alice".to_string(), password: "s3cret".to_string() },
    );

    let registry = Arc::new(MockRegistryClient::new());
    registry.queue(
        &bind_request("acme/get-thing", "p1"),
        Ok(BindResponse {
            provider: single_service_provider(&server.uri(), security),
            map: http_get_map("GetThing", "/things", Some("main")),
        }),
    );
    let events = Arc::new(EventBus::new());
    let router = no_retry_router("acme/get-thing", "GetThing", &["p1"], events.clone());
    let driver = driver_for(
        "acme/get-thing",
        "GetThing",
        registry,
        Arc::new(ReqwestFetch::default()),
        router,
        events.clone(),
    );

    let result = driver
        .perform(Variable::empty_object(), PerformOptions::default())
        .await
        .unwrap();

    assert_eq!(result, Variable::from_iter([("ok".to_string(), Variable::Bool(true))]));
}

/// Scenario: a registered `post-fetch` listener retries a single call once
/// (spec's `pre-fetch`/`post-fetch` hook contract) — the endpoint is hit
/// twice even though the use-case only performs once, and no failure is
/// ever reported to the policy router, since the retry is resolved inside
/// the fetch interceptor chain before the interpreter sees a result.
#[tokio::test]
async fn post_fetch_hook_retries_a_single_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/things"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "1"})))
        .expect(2)
        .mount(&server)
        .await;

    struct RetryOnce {
        fired: AtomicBool,
    }

    #[async_trait]
    impl AfterListener<HttpCallSpec, Result<comlink_interpreter::collaborators::HttpCallResult, CoreError>> for RetryOnce {
        async fn on_after(
            &self,
            _ctx: &EventContext,
            _args: &HttpCallSpec,
            _result: &Result<comlink_interpreter::collaborators::HttpCallResult, CoreError>,
        ) -> AfterOutcome<HttpCallSpec, Result<comlink_interpreter::collaborators::HttpCallResult, CoreError>> {
            if self.fired.swap(true, Ordering::SeqCst) {
                AfterOutcome::Continue
            } else {
                AfterOutcome::Retry(None)
            }
        }
    }

    let registry = Arc::new(MockRegistryClient::new());
    registry.queue(
        &bind_request("acme/get-thing", "p1"),
        Ok(BindResponse {
            provider: single_service_provider(&server.uri(), BTreeMap::new()),
            map: http_get_map("GetThing", "/things", None),
        }),
    );
    let mut events = EventBus::new();
    events
        .fetch
        .register_after(0, EventFilter::any(), Arc::new(RetryOnce { fired: AtomicBool::new(false) }));
    let events = Arc::new(events);
    let router = no_retry_router("acme/get-thing", "GetThing", &["p1"], events.clone());
    let driver = driver_for(
        "acme/get-thing",
        "GetThing",
        registry,
        Arc::new(ReqwestFetch::default()),
        router,
        events.clone(),
    );

    let result = driver
        .perform(Variable::empty_object(), PerformOptions::default())
        .await
        .unwrap();

    assert_eq!(result, Variable::from_iter([("id".to_string(), Variable::String("1".to_string()))]));
    assert_eq!(events.stats().fetch, 1);
    assert_eq!(events.stats().failure, 0);
}

/// A [`Fetch`] that simulates one provider's base URL being entirely
/// unreachable (DNS failure) while delegating everything else to a real
/// `reqwest`-backed fetch against the wiremock server — real DNS failure
/// would be slow and non-deterministic to reproduce in a test.
struct DnsFailingFor {
    unreachable_host: String,
    inner: ReqwestFetch,
}

#[async_trait]
impl Fetch for DnsFailingFor {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        if request.url.contains(&self.unreachable_host) {
            return Err(FetchError::Dns(format!("could not resolve {}", self.unreachable_host)));
        }
        self.inner.fetch(request).await
    }
}

/// Scenario: the primary provider's circuit opens after two consecutive
/// DNS failures, failover switches to the backup provider, and the
/// aggregated metrics payload reflects both providers' counts in
/// first-touched order.
#[tokio::test]
async fn circuit_breaker_fails_over_and_reports_aggregated_metrics() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/things"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "ok"})))
        .mount(&server)
        .await;

    let registry = Arc::new(MockRegistryClient::new());
    registry.queue(
        &bind_request("acme/get-thing", "p2"),
        Ok(BindResponse {
            provider: single_service_provider("http://down.invalid", BTreeMap::new()),
            map: http_get_map("GetThing", "/things", None),
        }),
    );
    registry.set_fallback(Ok(BindResponse {
        provider: single_service_provider(&server.uri(), BTreeMap::new()),
        map: http_get_map("GetThing", "/things", None),
    }));

    let fetch: Arc<dyn Fetch> = Arc::new(DnsFailingFor {
        unreachable_host: "down.invalid".to_string(),
        inner: ReqwestFetch::default(),
    });

    struct RecordingSink {
        received: std::sync::Mutex<Vec<comlink_metrics::MetricsPayload>>,
    }
    #[async_trait]
    impl MetricsSink for RecordingSink {
        async fn on_metrics(&self, payload: &comlink_metrics::MetricsPayload) {
            self.received.lock().unwrap().push(payload.clone());
        }
    }
    let sink = Arc::new(RecordingSink { received: std::sync::Mutex::new(Vec::new()) });
    let metrics_timers = Arc::new(MetricsManualTimers::new(0));
    let reporter = Arc::new(MetricsReporter::new(
        DebounceConfig::new(Duration::from_millis(1), Duration::from_millis(1)).unwrap(),
        metrics_timers.clone(),
        sink.clone(),
    ));
    let mut events = EventBus::new();
    reporter.register(&mut events);
    let events = Arc::new(events);

    let mut policies = BTreeMap::new();
    policies.insert(
        "p2".to_string(),
        PolicyKind::CircuitBreaker {
            max_contiguous_failures: 2,
            open_time: Duration::from_secs(30),
            max_open_time: Duration::from_secs(300),
            request_timeout: Duration::from_secs(5),
        },
    );
    policies.insert("p1".to_string(), PolicyKind::NoRetry);
    let router = Arc::new(FailurePolicyRouter::new(
        RouterConfig {
            profile: "acme/get-thing".to_string(),
            usecase: "GetThing".to_string(),
            providers: vec!["p2".to_string(), "p1".to_string()],
            priority: vec!["p2".to_string(), "p1".to_string()],
            allow_failover: true,
            policies,
        },
        Arc::new(PolicyManualTimers::new(0)),
        events.clone(),
    ));
    let driver = driver_for("acme/get-thing", "GetThing", registry, fetch, router, events.clone());

    let result = driver
        .perform(Variable::empty_object(), PerformOptions::default())
        .await
        .unwrap();
    assert_eq!(result, Variable::from_iter([("id".to_string(), Variable::String("ok".to_string()))]));
    assert_eq!(events.stats().provider_switch, 1);

    metrics_timers.advance(5);
    reporter.tick().await;

    let flushed = sink.received.lock().unwrap();
    assert_eq!(flushed.len(), 1);
    let entries = &flushed[0].entries;
    assert_eq!(
        entries,
        &vec![
            ProviderMetrics { profile: "acme/get-thing".to_string(), provider: "p2".to_string(), success_count: 0, failed_count: 2 },
            ProviderMetrics { profile: "acme/get-thing".to_string(), provider: "p1".to_string(), success_count: 1, failed_count: 0 },
        ]
    );
}

/// Scenario: a declared response handler maps a non-2xx status into a
/// `map error`, surfacing as [`CoreError::MappedHttp`] with the mapped
/// error properties rather than a generic transport-level error.
#[tokio::test]
async fn response_handler_maps_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/things"))
        .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({"reason": "not-found"})))
        .mount(&server)
        .await;

    let mut maps = BTreeMap::new();
    maps.insert(
        "GetThing".to_string(),
        MapDefinition {
            name: "GetThing".to_string(),
            statements: vec![Statement::HttpCall(HttpCallStatement {
                service_id: "default".to_string(),
                method: "GET".to_string(),
                url: "/things".to_string(),
                security: None,
                request: None,
                response_handlers: vec![HttpResponseHandler {
                    status_code: Some(404),
                    content_type: None,
                    content_language: None,
                    statements: vec![Statement::Outcome(OutcomeStatement {
                        condition: None,
                        value: Expr::Jessie { source: "body".to_string(), source_location: None },
                        is_error: true,
                        source_location: None,
                    })],
                }],
            })],
        },
    );
    let map = MapDocument { maps, operations: BTreeMap::new() };

    let registry = Arc::new(MockRegistryClient::new());
    registry.queue(
        &bind_request("acme/get-thing", "p1"),
        Ok(BindResponse { provider: single_service_provider(&server.uri(), BTreeMap::new()), map }),
    );
    let events = Arc::new(EventBus::new());
    let router = no_retry_router("acme/get-thing", "GetThing", &["p1"], events.clone());
    let driver = driver_for(
        "acme/get-thing",
        "GetThing",
        registry,
        Arc::new(ReqwestFetch::default()),
        router,
        events.clone(),
    );

    let err = driver
        .perform(Variable::empty_object(), PerformOptions::default())
        .await
        .unwrap_err();

    match err {
        CoreError::MappedHttp { status_code, properties } => {
            assert_eq!(status_code, 404);
            assert_eq!(properties, serde_json::json!({"reason": "not-found"}));
        }
        other => panic!("expected MappedHttp error, got {other:?}"),
    }
    assert_eq!(events.stats().failure, 1);
}
