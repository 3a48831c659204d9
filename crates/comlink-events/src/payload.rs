// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed payloads for the eight event kinds named in spec §4.3/§4.5/§4.6.

use comlink_error::CoreError;
use comlink_interpreter::collaborators::{HttpCallResult, HttpCallSpec};
use comlink_variables::Variable;

/// Arguments to a `perform` call, as seen by `pre-perform`/`post-perform`
/// listeners (spec §4.5).
#[derive(Debug, Clone)]
pub struct PerformArgs {
    /// Use-case input.
    pub input: Variable,
    /// Explicitly requested provider, if the caller named one.
    pub provider: Option<String>,
    /// Integration parameter overrides.
    pub parameters: Option<Variable>,
    /// Security value overrides.
    pub security: Option<Variable>,
}

/// Arguments to the outer `bind-and-perform` call (spec §4.5): a `perform`
/// plus the provider/map-variant/map-revision binding inputs the policy
/// router observes to decide retries and failover.
#[derive(Debug, Clone)]
pub struct BindAndPerformArgs {
    /// The wrapped `perform` arguments.
    pub perform: PerformArgs,
    /// Explicit map variant, if requested.
    pub map_variant: Option<String>,
    /// Explicit map revision, if requested.
    pub map_revision: Option<String>,
}

/// Outcome of a `perform`/`bind-and-perform` call: the use-case's result
/// value, or the structured error that ended it.
pub type PerformResult = Result<Variable, CoreError>;

/// Arguments to a single `fetch` (spec §4.2's request construction, as the
/// interpreter hands it to the HTTP engine).
pub type FetchArgs = HttpCallSpec;

/// Outcome of a single `fetch`.
pub type FetchResult = Result<HttpCallResult, CoreError>;

/// Emitted once a `perform` completes successfully (spec §4.5 step 4).
#[derive(Debug, Clone)]
pub struct SuccessPayload {
    /// Profile id.
    pub profile: String,
    /// Provider that produced the result.
    pub provider: String,
    /// Use-case name.
    pub usecase: String,
    /// Milliseconds since the Unix epoch, supplied by the injected
    /// `Timers` collaborator rather than read from the wall clock here.
    pub time: u64,
}

/// Emitted once a `perform` fails (spec §4.5 step 4).
#[derive(Debug, Clone)]
pub struct FailurePayload {
    /// Profile id.
    pub profile: String,
    /// Provider the attempt was made against.
    pub provider: String,
    /// Use-case name.
    pub usecase: String,
    /// Milliseconds since the Unix epoch.
    pub time: u64,
    /// Classified failure reason, if the failure is one the policy router
    /// recognizes (spec §4.4's failure classification).
    pub reason: Option<FailoverReason>,
}

/// Failure classification feeding `provider-switch` decisions (spec §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailoverReason {
    /// DNS resolution failed.
    NetworkDns,
    /// Network-level connection timeout.
    NetworkTimeout,
    /// TLS/certificate failure.
    NetworkUnsignedSsl,
    /// Connection refused or reset.
    NetworkReject,
    /// A single attempt exceeded its `request-timeout`.
    RequestTimeout,
    /// The request was aborted after being sent.
    RequestAbort,
    /// The response status was 500 or above.
    Http5xx,
    /// Any other failure the router still classifies as retryable/failover
    /// eligible, but without a more specific reason.
    Unexpected,
}

impl FailoverReason {
    /// The `SCREAMING_SNAKE_CASE` name used in `provider-switch` telemetry
    /// (spec §8 scenario 5: `{reason: NETWORK_ERROR_DNS}`).
    #[must_use]
    pub fn telemetry_name(self) -> &'static str {
        match self {
            FailoverReason::NetworkDns => "NETWORK_ERROR_DNS",
            FailoverReason::NetworkTimeout => "NETWORK_ERROR_TIMEOUT",
            FailoverReason::NetworkUnsignedSsl => "NETWORK_ERROR_UNSIGNED_SSL",
            FailoverReason::NetworkReject => "NETWORK_ERROR_REJECT",
            FailoverReason::RequestTimeout => "REQUEST_ERROR_TIMEOUT",
            FailoverReason::RequestAbort => "REQUEST_ERROR_ABORT",
            FailoverReason::Http5xx => "HTTP_ERROR",
            FailoverReason::Unexpected => "UNEXPECTED_ERROR",
        }
    }

    /// Parse the `network:*`/`request:*` classification tag `comlink-http`
    /// embeds in `CoreError::Http::request_debug` (spec §7's propagation
    /// rule). Returns `None` for tags this router does not recognize.
    #[must_use]
    pub fn from_classification_tag(tag: &str) -> Option<Self> {
        match tag {
            "network:dns" => Some(FailoverReason::NetworkDns),
            "network:timeout" => Some(FailoverReason::NetworkTimeout),
            "network:unsigned-ssl" => Some(FailoverReason::NetworkUnsignedSsl),
            "network:reject" => Some(FailoverReason::NetworkReject),
            "request:timeout" => Some(FailoverReason::RequestTimeout),
            "request:abort" => Some(FailoverReason::RequestAbort),
            _ => None,
        }
    }
}

/// Emitted when the failure policy router switches providers (spec §4.4).
#[derive(Debug, Clone)]
pub struct ProviderSwitchPayload {
    /// Provider switched away from.
    pub from: String,
    /// Provider switched to, if a healthy one was found.
    pub to: Option<String>,
    /// Reasons accumulated for the switch (usually one per failed attempt).
    pub reasons: Vec<FailoverReason>,
}
