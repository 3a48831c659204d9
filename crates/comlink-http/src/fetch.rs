// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `Fetch` collaborator (spec §6): the one point where this crate
//! actually touches the network.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

/// A fully-built outgoing HTTP request, ready to send.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// Absolute URL.
    pub url: String,
    /// HTTP method.
    pub method: String,
    /// Header name/value pairs, already coerced to strings.
    pub headers: BTreeMap<String, String>,
    /// Request body bytes, if any.
    pub body: Option<Vec<u8>>,
    /// Per-request timeout.
    pub timeout: Duration,
}

/// A raw HTTP response, not yet content-negotiated.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Response status code.
    pub status_code: u16,
    /// Response headers, first value wins on duplicates.
    pub headers: BTreeMap<String, String>,
    /// Raw response body bytes.
    pub body: Vec<u8>,
}

/// Classification of a fetch-level failure (spec §7's propagation rule):
/// the policy router needs this taxonomy, not just an opaque error, to
/// decide whether a failure is retryable.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// DNS resolution failed.
    #[error("dns resolution failed: {0}")]
    Dns(String),
    /// The underlying TLS connection was not established.
    #[error("tls connection failed: {0}")]
    UnsignedSsl(String),
    /// Connection refused or reset by the peer.
    #[error("connection rejected: {0}")]
    Reject(String),
    /// The overall network operation timed out.
    #[error("network timeout")]
    NetworkTimeout,
    /// The request was aborted after being sent (e.g. by a cancellation).
    #[error("request aborted: {0}")]
    Abort(String),
    /// The request timed out waiting for a response.
    #[error("request timeout")]
    RequestTimeout,
}

impl FetchError {
    /// The `network:*`/`request:*` tag spec failure classification uses
    /// (spec §7); `comlink-policy` matches on this to build a
    /// `FailoverReason` without needing `comlink-http` as a dependency.
    #[must_use]
    pub fn classification_tag(&self) -> &'static str {
        match self {
            FetchError::Dns(_) => "network:dns",
            FetchError::UnsignedSsl(_) => "network:unsigned-ssl",
            FetchError::Reject(_) => "network:reject",
            FetchError::NetworkTimeout => "network:timeout",
            FetchError::Abort(_) => "request:abort",
            FetchError::RequestTimeout => "request:timeout",
        }
    }
}

/// The network boundary the HTTP engine sends requests through.
///
/// Implementations must not apply retries themselves — that is
/// `comlink-policy`'s responsibility, driven by the classification in
/// [`FetchError`].
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Send `request` and return the raw response, or a classified failure.
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError>;
}

/// So a single shared adapter (one connection pool, one registered
/// digest/auth metadata slot) can be handed to many [`crate::HttpEngine`]
/// instances, each of which owns its `F: Fetch` by value.
#[async_trait]
impl<T: Fetch + ?Sized> Fetch for Arc<T> {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        (**self).fetch(request).await
    }
}

/// [`Fetch`] implementation backed by `reqwest`.
pub struct ReqwestFetch {
    client: reqwest::Client,
}

impl ReqwestFetch {
    /// Construct a fetch adapter from a pre-built `reqwest::Client` (so
    /// callers can configure connection pooling, proxies, etc).
    #[must_use]
    pub fn new(client: reqwest::Client) -> Self {
        ReqwestFetch { client }
    }
}

impl Default for ReqwestFetch {
    fn default() -> Self {
        ReqwestFetch::new(reqwest::Client::new())
    }
}

#[async_trait]
impl Fetch for ReqwestFetch {
    async fn fetch(&self, request: FetchRequest) -> Result<FetchResponse, FetchError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| FetchError::Abort(e.to_string()))?;

        let mut builder = self
            .client
            .request(method, &request.url)
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(classify_send_error)?;
        let status_code = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_ascii_lowercase(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Abort(e.to_string()))?
            .to_vec();

        Ok(FetchResponse {
            status_code,
            headers,
            body,
        })
    }
}

fn classify_send_error(error: reqwest::Error) -> FetchError {
    if error.is_connect() {
        if error.is_timeout() {
            return FetchError::NetworkTimeout;
        }
        let message = error.to_string();
        let lower = message.to_ascii_lowercase();
        if lower.contains("dns") || lower.contains("resolve") || lower.contains("lookup") {
            return FetchError::Dns(message);
        }
        if lower.contains("certificate") || lower.contains("tls") || lower.contains("ssl") {
            return FetchError::UnsignedSsl(message);
        }
        return FetchError::Reject(message);
    }
    if error.is_timeout() {
        return FetchError::RequestTimeout;
    }
    FetchError::Abort(error.to_string())
}
