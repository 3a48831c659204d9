// SPDX-License-Identifier: MIT OR Apache-2.0
//! Traits the interpreter depends on but does not implement.
//!
//! The interpreter is deliberately decoupled from the HTTP engine and event
//! bus concretely: `comlink-http` and `comlink-events` implement these
//! traits, and `comlink-runtime` wires the concrete types in, rather than
//! the interpreter depending on either crate directly.

use async_trait::async_trait;
use comlink_error::CoreError;
use comlink_variables::Variable;
use std::collections::BTreeMap;

/// An outgoing HTTP request, abstracted the way the interpreter assembles
/// it (spec §4.1's `HttpCallStatement` contract).
#[derive(Debug, Clone)]
pub struct HttpCallSpec {
    /// Name of the service to resolve a base URL for.
    pub service_id: String,
    /// HTTP method.
    pub method: String,
    /// URL path, possibly containing `{name}` path templates.
    pub url: String,
    /// Security requirement id declared on the profile/provider, if any.
    pub security: Option<String>,
    /// Header name/value pairs. Coercion to strings (and the
    /// `SDKExecutionError` raised on non-scalar values) is the HTTP
    /// engine's responsibility (spec §4.2), not the interpreter's.
    pub headers: BTreeMap<String, Variable>,
    /// Query parameter name/value pairs, same coercion rule as `headers`.
    pub query: BTreeMap<String, Variable>,
    /// Request body, if any.
    pub body: Option<Variable>,
    /// `Content-Type` of the outgoing body.
    pub content_type: Option<String>,
    /// `Content-Language` of the outgoing body.
    pub content_language: Option<String>,
    /// Deduplicated, comma-joined `Accept` header value computed from the
    /// response handlers' declared content types (`*/*` if any handler
    /// omits its content type).
    pub accept: String,
    /// The variable stack in effect at the call site, used for path
    /// template substitution alongside `input`/`parameters`.
    pub scope: Variable,
}

/// The result of issuing an [`HttpCallSpec`].
#[derive(Debug, Clone)]
pub struct HttpCallResult {
    /// Response status code.
    pub status_code: u16,
    /// Response headers (first value wins on duplicates, matching the
    /// interpreter's `content-type`/`content-language` substring checks).
    pub headers: BTreeMap<String, String>,
    /// Parsed response body (JSON decoded when `content-type` is
    /// `application/json`, raw string/bytes otherwise).
    pub body: Variable,
    /// Debug information about the request that produced this response.
    pub request_debug: String,
}

/// Collaborator the interpreter calls into for every `HttpCallStatement`.
///
/// Implemented concretely by `comlink-http`'s HTTP engine.
#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Issue `spec` and return its result, or a structured error if the
    /// request could not be built or sent at all (the interpreter handles
    /// non-2xx responses itself via response handlers).
    async fn execute(&self, spec: HttpCallSpec) -> Result<HttpCallResult, CoreError>;
}

/// What to do when no response handler matched a status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnhandledHttpDecision {
    /// Proceed as if no handler existed at all (status ≥ 400 still fails).
    Continue,
    /// Re-issue the request and try response handlers again.
    Retry,
}

/// Collaborator consulted when no `HttpResponseHandler` matched a response
/// status (spec §4.1's *unhandled-http* hook).
///
/// Implemented concretely by `comlink-events`' hook registry.
#[async_trait]
pub trait UnhandledHttpHook: Send + Sync {
    /// Returns `None` if no hook is registered for this event (the
    /// interpreter then applies the default: status ≥ 400 is an
    /// `HTTPError`).
    async fn decide(&self, result: &HttpCallResult) -> Option<UnhandledHttpDecision>;
}

/// No-op [`UnhandledHttpHook`] used when the caller has not registered one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoUnhandledHttpHook;

#[async_trait]
impl UnhandledHttpHook for NoUnhandledHttpHook {
    async fn decide(&self, _result: &HttpCallResult) -> Option<UnhandledHttpDecision> {
        None
    }
}
