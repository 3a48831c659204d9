// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Client`]: the composition root (spec §6's `Client(config, superJson?,
//! external-interfaces)`). Assembles one shared event bus, registry
//! client, document cache, sandbox, and metrics reporter, then hands each
//! `Profile`/`UseCase` a share of them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use comlink_config::ClientConfig;
use comlink_events::EventBus;
use comlink_http::{Fetch, ReqwestFetch};
use comlink_metrics::{DebounceConfig, MetricsPayload, MetricsReporter, MetricsSink, NoopMetricsSink};
use comlink_policy::{
    default_allow_failover, FailurePolicyRouter, RouterConfig, SystemTimers as PolicySystemTimers,
    Timers as PolicyTimers, UseCaseSafety,
};
use comlink_registry::{HttpRegistryClient, RegistryClient};
use comlink_runtime::{ProfileProviderCache, SystemTimers as RuntimeSystemTimers, Timers as RuntimeTimers};
use comlink_sandbox::{CelSandbox, Sandbox};
use tokio::sync::RwLock;

use crate::error::ClientError;
use crate::manifest::{ProfileManifest, SuperJson};
use crate::profile::Profile;

/// Emits each flushed [`MetricsPayload`] to `tracing`, in the absence of a
/// spec-named concrete metrics backend (spec §4.6 only defines the
/// aggregation contract, not where the aggregate ends up).
#[derive(Debug, Default)]
struct TracingMetricsSink;

#[async_trait]
impl MetricsSink for TracingMetricsSink {
    async fn on_metrics(&self, payload: &MetricsPayload) {
        for entry in &payload.entries {
            tracing::info!(
                target: "comlink_client.metrics",
                profile = %entry.profile,
                provider = %entry.provider,
                success = entry.success_count,
                failed = entry.failed_count,
                "metrics"
            );
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RouterKey {
    profile_id: String,
    profile_version: Option<String>,
    usecase: String,
}

/// Everything a [`Profile`]/use-case driver needs a share of. Kept
/// separate from [`Client`] itself so `Profile` can hold an `Arc` of just
/// this, not the whole client (including its manifest-lookup surface).
pub(crate) struct Shared {
    pub(crate) config: ClientConfig,
    pub(crate) registry: Arc<dyn RegistryClient>,
    pub(crate) fetch: Arc<dyn Fetch>,
    pub(crate) cache: Arc<ProfileProviderCache>,
    pub(crate) events: Arc<EventBus>,
    pub(crate) sandbox: Arc<dyn Sandbox>,
    pub(crate) runtime_timers: Arc<dyn RuntimeTimers>,
    pub(crate) policy_timers: Arc<dyn PolicyTimers>,
    routers: RwLock<HashMap<RouterKey, Arc<FailurePolicyRouter>>>,
}

impl Shared {
    pub(crate) async fn router_for(
        &self,
        profile: &ProfileManifest,
        profile_id: &str,
        profile_version: Option<&str>,
        usecase: &str,
    ) -> Arc<FailurePolicyRouter> {
        let key = RouterKey {
            profile_id: profile_id.to_string(),
            profile_version: profile_version.map(str::to_string),
            usecase: usecase.to_string(),
        };

        if let Some(router) = self.routers.read().await.get(&key) {
            return Arc::clone(router);
        }

        let mut routers = self.routers.write().await;
        if let Some(router) = routers.get(&key) {
            return Arc::clone(router);
        }

        let safety = profile
            .usecases
            .get(usecase)
            .map(|u| UseCaseSafety::from(u.safety))
            .unwrap_or(UseCaseSafety::Safe);
        let allow_failover = profile.allow_failover.unwrap_or_else(|| default_allow_failover(safety));

        let router = Arc::new(FailurePolicyRouter::new(
            RouterConfig {
                profile: profile_id.to_string(),
                usecase: usecase.to_string(),
                providers: profile.providers.clone(),
                priority: profile.priority.clone(),
                allow_failover,
                policies: profile
                    .policies
                    .iter()
                    .map(|(name, policy)| (name.clone(), policy.clone().into_policy_kind()))
                    .collect(),
            },
            Arc::clone(&self.policy_timers),
            Arc::clone(&self.events),
        ));
        routers.insert(key, Arc::clone(&router));
        router
    }
}

/// The top-level client (spec §6): holds the runtime's shared
/// collaborators and hands out [`Profile`] handles.
pub struct Client {
    manifest: SuperJson,
    shared: Arc<Shared>,
    metrics_reporter: Option<Arc<MetricsReporter>>,
    metrics_ticker: Option<tokio::task::JoinHandle<()>>,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").finish_non_exhaustive()
    }
}

impl Client {
    /// Build a client from `config`, an optional declarative `super_json`
    /// manifest, and an optional injected [`Fetch`] (a default
    /// `reqwest`-backed one is used when `None`, per spec §6's "injected
    /// interfaces" list).
    pub fn new(
        config: ClientConfig,
        super_json: Option<SuperJson>,
        fetch: Option<Arc<dyn Fetch>>,
    ) -> Result<Self, ClientError> {
        // Spec §6 enumerates no dedicated registry-call timeout option, so
        // bind calls get a fixed default rather than borrowing
        // `sandboxTimeout` (which bounds expression evaluation, a
        // different concern).
        const REGISTRY_BIND_TIMEOUT: Duration = Duration::from_secs(30);

        let fetch: Arc<dyn Fetch> = fetch.unwrap_or_else(|| Arc::new(ReqwestFetch::default()));
        let registry: Arc<dyn RegistryClient> = Arc::new(HttpRegistryClient::new(
            Arc::clone(&fetch),
            config.superface_api_url.clone(),
            REGISTRY_BIND_TIMEOUT,
        ));
        Self::with_collaborators(config, super_json, fetch, registry)
    }

    /// Build a client with an explicitly injected [`RegistryClient`] instead
    /// of the default HTTP-backed one — for scenario tests that want to
    /// drive the registry with canned responses (`MockRegistryClient`)
    /// rather than running a mock HTTP server behind `Fetch`.
    pub fn with_registry(
        config: ClientConfig,
        super_json: Option<SuperJson>,
        fetch: Arc<dyn Fetch>,
        registry: Arc<dyn RegistryClient>,
    ) -> Result<Self, ClientError> {
        Self::with_collaborators(config, super_json, fetch, registry)
    }

    fn with_collaborators(
        config: ClientConfig,
        super_json: Option<SuperJson>,
        fetch: Arc<dyn Fetch>,
        registry: Arc<dyn RegistryClient>,
    ) -> Result<Self, ClientError> {
        let warnings = config.validate();
        if ClientConfig::has_fatal_warnings(&warnings) {
            return Err(ClientError::InvalidConfig(warnings));
        }

        let cache = Arc::new(ProfileProviderCache::new(config.superface_cache_timeout_duration()));
        let sandbox: Arc<dyn Sandbox> = Arc::new(CelSandbox::new());
        let runtime_timers: Arc<dyn RuntimeTimers> = Arc::new(RuntimeSystemTimers);
        let policy_timers: Arc<dyn PolicyTimers> = Arc::new(PolicySystemTimers);

        let mut events = EventBus::new();
        let (metrics_reporter, metrics_ticker) = if config.disable_reporting {
            (None, None)
        } else {
            let window = DebounceConfig::new(
                config.metric_debounce_min(),
                config.metric_debounce_max(),
            )
            .map_err(|e| ClientError::InvalidConfig(vec![comlink_config::ConfigWarning {
                field: "metricDebounceTimeMax".to_string(),
                message: e.to_string(),
                severity: comlink_config::WarningSeverity::Error,
            }]))?;
            let reporter = Arc::new(MetricsReporter::new(
                window,
                Arc::new(comlink_metrics::SystemTimers),
                Arc::new(TracingMetricsSink),
            ));
            reporter.register(&mut events);
            let ticker = Arc::clone(&reporter).spawn_ticker(config.metric_debounce_min().max(Duration::from_millis(50)));
            (Some(reporter), Some(ticker))
        };

        let shared = Arc::new(Shared {
            config,
            registry,
            fetch,
            cache,
            events: Arc::new(events),
            sandbox,
            runtime_timers,
            policy_timers,
            routers: RwLock::new(HashMap::new()),
        });

        Ok(Client {
            manifest: super_json.unwrap_or_default(),
            shared,
            metrics_reporter,
            metrics_ticker,
        })
    }

    /// A sink that discards every metrics emission, for a client that
    /// does want reporting but has nowhere to send it yet (tests, or an
    /// embedding caller not ready to consume metrics).
    #[must_use]
    pub fn noop_metrics_sink() -> Arc<dyn MetricsSink> {
        Arc::new(NoopMetricsSink)
    }

    /// Look up a profile by id, optionally pinned to `version`.
    ///
    /// A profile absent from the manifest is still returned, in a
    /// permissive mode that accepts any use-case name and runs with a
    /// single implicit no-retry provider — see `DESIGN.md` for why this
    /// is not treated as an error.
    #[must_use]
    pub fn get_profile(&self, id: &str, version: Option<&str>) -> Profile {
        let manifest = self.manifest.profiles.get(id).cloned().unwrap_or_default();
        Profile::new(Arc::clone(&self.shared), id.to_string(), version.map(str::to_string), manifest)
    }

    /// The shared [`MetricsReporter`], if metrics reporting is enabled.
    #[must_use]
    pub fn metrics_reporter(&self) -> Option<&Arc<MetricsReporter>> {
        self.metrics_reporter.as_ref()
    }

    /// The shared [`EventBus`], for callers that want to register their
    /// own before/after listeners alongside the metrics reporter.
    #[must_use]
    pub fn events(&self) -> &Arc<EventBus> {
        &self.shared.events
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Some(ticker) = self.metrics_ticker.take() {
            ticker.abort();
        }
    }
}
