// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! HTTP engine: turns an [`comlink_interpreter::collaborators::HttpCallSpec`]
//! into a wire request, applies security, and parses the response.
//!
//! [`HttpEngine`] is the concrete [`comlink_interpreter::collaborators::HttpExecutor`]
//! `comlink-runtime` wires into the interpreter; this crate never depends on
//! the interpreter's driver, only on its collaborator traits and types.

pub mod fetch;
pub mod request;
pub mod security;

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use comlink_error::{AstPath, CoreError, PathSegment};
use comlink_interpreter::collaborators::{HttpCallResult, HttpCallSpec, HttpExecutor};
use comlink_variables::Variable;
use tracing::debug;

pub use fetch::{Fetch, FetchError, FetchRequest, FetchResponse, ReqwestFetch};
pub use request::{ServiceSelector, StaticServiceSelector};
pub use security::{ApiKeyPlacement, DigestCache, NoSecurityProvider, SecurityError, SecurityProvider, SecurityScheme};

/// Default per-request timeout applied when a call spec doesn't override it.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// The HTTP engine: resolves a service's base URL and security scheme,
/// builds the wire request, sends it through a [`Fetch`] adapter, and
/// parses the response — everything spec §4.2 describes short of the
/// interpreter's own response-handler matching, which stays in
/// `comlink-interpreter`.
pub struct HttpEngine<F, S, P> {
    fetch: F,
    services: S,
    security: P,
    digest_cache: DigestCache,
    timeout: Duration,
}

impl<F, S, P> HttpEngine<F, S, P>
where
    F: Fetch,
    S: ServiceSelector,
    P: SecurityProvider,
{
    /// Construct an engine from its three collaborators, using
    /// [`DEFAULT_REQUEST_TIMEOUT`].
    pub fn new(fetch: F, services: S, security: P) -> Self {
        HttpEngine {
            fetch,
            services,
            security,
            digest_cache: DigestCache::new(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Resolves `spec.security` against the provider, or `Ok(None)` if the
    /// call declares none.
    async fn resolve_security(
        &self,
        spec: &HttpCallSpec,
        ast_path: &AstPath,
    ) -> Result<Option<SecurityScheme>, CoreError> {
        let Some(security_id) = &spec.security else {
            return Ok(None);
        };
        self.security
            .resolve(&spec.service_id, security_id)
            .await
            .map(Some)
            .ok_or_else(|| CoreError::MapAst {
                message: format!("no security scheme configured for '{security_id}'"),
                ast_path: ast_path.clone(),
                source_location: None,
            })
    }

    /// Applies a `Basic`/`Bearer`/`Digest` scheme as an `Authorization`
    /// header. `ApiKey` placements are resolved earlier, in `execute`,
    /// since they can target the query string, path, or body instead.
    async fn apply_header_security(
        &self,
        scheme: &SecurityScheme,
        spec: &HttpCallSpec,
        url: &str,
        uri_for_digest: &str,
        headers: &mut BTreeMap<String, String>,
        ast_path: &AstPath,
    ) -> Result<(), CoreError> {
        match scheme {
            SecurityScheme::Basic { username, password } => {
                let token = base64::Engine::encode(
                    &base64::engine::general_purpose::STANDARD,
                    format!("{username}:{password}"),
                );
                headers.insert("authorization".to_string(), format!("Basic {token}"));
            }
            SecurityScheme::Bearer { token } => {
                headers.insert("authorization".to_string(), format!("Bearer {token}"));
            }
            SecurityScheme::ApiKey { .. } => {}
            SecurityScheme::Digest { username, password } => {
                match security::apply_cached_digest(
                    &self.digest_cache,
                    &spec.service_id,
                    username,
                    password,
                    &spec.method,
                    uri_for_digest,
                )
                .await
                {
                    security::DigestApplication::Header(header) => {
                        headers.insert("authorization".to_string(), header);
                    }
                    security::DigestApplication::NeedsChallenge => {
                        let priming = FetchRequest {
                            url: url.to_string(),
                            method: spec.method.clone(),
                            headers: headers.clone(),
                            body: None,
                            timeout: self.timeout,
                        };
                        let response = self
                            .fetch
                            .fetch(priming)
                            .await
                            .map_err(|e| fetch_error_to_core(e, spec))?;
                        let challenge = response
                            .headers
                            .get("www-authenticate")
                            .ok_or_else(|| CoreError::MapAst {
                                message: "digest-secured service did not return a challenge".to_string(),
                                ast_path: ast_path.clone(),
                                source_location: None,
                            })?;
                        let header = security::prime_digest_from_challenge(
                            &self.digest_cache,
                            &spec.service_id,
                            challenge,
                            username,
                            password,
                            &spec.method,
                            uri_for_digest,
                        )
                        .await
                        .ok_or_else(|| CoreError::MapAst {
                            message: "failed to parse digest challenge".to_string(),
                            ast_path: ast_path.clone(),
                            source_location: None,
                        })?;
                        headers.insert("authorization".to_string(), header);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Wraps a transport-level failure as [`CoreError::Http`] with `status_code:
/// 0` (no response was ever received) and the fetch error's
/// `network:*`/`request:*` classification tag prefixed onto
/// `request_debug`, so `comlink-policy` can recover [`FetchError`]'s
/// taxonomy for `FailoverReason` without depending on this crate.
fn fetch_error_to_core(error: FetchError, spec: &HttpCallSpec) -> CoreError {
    CoreError::Http {
        status_code: 0,
        request_debug: format!("[{}] {} {} ({error})", error.classification_tag(), spec.method, spec.url),
        response_body: None,
    }
}

#[async_trait]
impl<F, S, P> HttpExecutor for HttpEngine<F, S, P>
where
    F: Fetch,
    S: ServiceSelector,
    P: SecurityProvider,
{
    async fn execute(&self, spec: HttpCallSpec) -> Result<HttpCallResult, CoreError> {
        let ast_path = AstPath::root().push(PathSegment::Field("httpCall"));

        let base_url = self
            .services
            .base_url(&spec.service_id)
            .await
            .ok_or_else(|| CoreError::MapAst {
                message: format!("no service configured for id '{}'", spec.service_id),
                ast_path: ast_path.clone(),
                source_location: None,
            })?;

        let resolved_security = self.resolve_security(&spec, &ast_path).await?;

        let mut path_scope = spec.scope.clone();
        if let Some(SecurityScheme::ApiKey {
            placement: ApiKeyPlacement::Path,
            name,
            value,
        }) = &resolved_security
        {
            if let Variable::Object(fields) = &mut path_scope {
                fields.insert(name.clone(), Variable::String(value.clone()));
            }
        }

        let path = request::substitute_path_template(
            &spec.url,
            &path_scope,
            &Variable::empty_object(),
            &Variable::empty_object(),
            &ast_path,
        )?;
        let url = request::join_url(&base_url, &path);

        let mut headers = request::coerce_scalar_map(&spec.headers, "header", &ast_path)?;
        let mut query = request::coerce_scalar_map(&spec.query, "query parameter", &ast_path)?;
        let mut body_value = spec.body.clone();

        match &resolved_security {
            Some(SecurityScheme::ApiKey {
                placement: ApiKeyPlacement::Header,
                name,
                value,
            }) => {
                headers.insert(name.to_ascii_lowercase(), value.clone());
            }
            Some(SecurityScheme::ApiKey {
                placement: ApiKeyPlacement::Query,
                name,
                value,
            }) => {
                query.insert(name.clone(), value.clone());
            }
            Some(SecurityScheme::ApiKey {
                placement: ApiKeyPlacement::Body,
                name,
                value,
            }) => match &mut body_value {
                Some(Variable::Object(fields)) => {
                    fields.insert(name.clone(), Variable::String(value.clone()));
                }
                _ => {
                    return Err(CoreError::MapAst {
                        message: "api key security placement 'body' requires an object request body".to_string(),
                        ast_path: ast_path.clone(),
                        source_location: None,
                    });
                }
            },
            _ => {}
        }

        let full_url = if query.is_empty() {
            url.clone()
        } else {
            let mut serializer = form_urlencoded::Serializer::new(String::new());
            for (k, v) in &query {
                serializer.append_pair(k, v);
            }
            format!("{url}?{}", serializer.finish())
        };

        let body = match &body_value {
            Some(value) => {
                let serialized = request::serialize_body(value, spec.content_type.as_deref(), &ast_path)?;
                if let Some(content_type) = &serialized.content_type {
                    headers.insert("content-type".to_string(), content_type.clone());
                } else if let Some(declared) = &spec.content_type {
                    headers.insert("content-type".to_string(), declared.clone());
                }
                Some(serialized)
            }
            None => None,
        };
        if !spec.accept.is_empty() {
            headers.insert("accept".to_string(), spec.accept.clone());
        }
        if let Some(content_language) = &spec.content_language {
            headers.insert("content-language".to_string(), content_language.clone());
        }

        if let Some(scheme) = &resolved_security {
            self.apply_header_security(scheme, &spec, &full_url, &path, &mut headers, &ast_path)
                .await?;
        }

        let fetch_request = FetchRequest {
            url: full_url.clone(),
            method: spec.method.clone(),
            headers: headers.clone(),
            body: body.as_ref().map(|b| b.bytes.clone()),
            timeout: self.timeout,
        };

        debug!(
            target: "comlink_http.engine",
            method = %spec.method,
            url = %full_url,
            "sending http request"
        );

        let response = self
            .fetch
            .fetch(fetch_request)
            .await
            .map_err(|e| fetch_error_to_core(e, &spec))?;

        let request_debug = format!("{} {full_url}", spec.method);
        let content_type = response.headers.get("content-type").cloned();
        let parsed_body = request::parse_response_body(&response.body, content_type.as_deref());

        Ok(HttpCallResult {
            status_code: response.status_code,
            headers: response.headers,
            body: parsed_body,
            request_debug,
        })
    }
}
