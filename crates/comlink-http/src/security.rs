// SPDX-License-Identifier: MIT OR Apache-2.0
//! Security schemes (spec §4.2): the four ways a request can be
//! authenticated, and the Digest challenge/response state machine.

use std::collections::BTreeMap;

use async_trait::async_trait;
use md5::{Digest as _, Md5};
use rand::RngCore;
use sha2::Sha256;
use tokio::sync::Mutex;

/// Where an API key credential is placed on the outgoing request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiKeyPlacement {
    /// Sent as a header named by `SecurityScheme::ApiKey::name`.
    Header,
    /// Sent as a query parameter named by `SecurityScheme::ApiKey::name`.
    Query,
    /// Merged into a JSON object body under `name`. Fails if the body is
    /// not itself an object.
    Body,
    /// Substituted into a `{name}` path template segment.
    Path,
}

/// Digest hash algorithm, as named in the `WWW-Authenticate` challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    /// `MD5` (the default when the challenge omits `algorithm`).
    Md5,
    /// `SHA-256`.
    Sha256,
}

/// A resolved credential for one `HttpCallSpec.security` id.
#[derive(Debug, Clone)]
pub enum SecurityScheme {
    /// HTTP Basic: base64-encoded `username:password` in `Authorization`.
    Basic {
        /// Basic auth username.
        username: String,
        /// Basic auth password.
        password: String,
    },
    /// Bearer token in `Authorization: Bearer <token>`.
    Bearer {
        /// The bearer token value.
        token: String,
    },
    /// API key credential placed per `placement`.
    ApiKey {
        /// Where to put the key.
        placement: ApiKeyPlacement,
        /// Header/query/body-field/path-segment name.
        name: String,
        /// The key value.
        value: String,
    },
    /// HTTP Digest, RFC 7616.
    Digest {
        /// Digest auth username.
        username: String,
        /// Digest auth password.
        password: String,
    },
}

/// Errors raised while applying a [`SecurityScheme`] to a request.
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    /// `spec.security` named an id with no registered scheme.
    #[error("no security scheme registered for id '{0}'")]
    NotFound(String),
    /// An `ApiKey` in `Body` placement was applied to a non-object body.
    #[error("cannot place an api key into a non-object request body")]
    NonObjectBody,
    /// An `ApiKey`/`Digest` scheme named a path segment that does not
    /// appear in the URL template.
    #[error("security placement references path segment '{0}', which is not present in the url")]
    MissingPathSegment(String),
}

/// Injected collaborator resolving security requirement ids to schemes.
///
/// Implemented concretely by `comlink-runtime` from the bound
/// profile/provider's declared `securitySchemes`/`securityValues`.
#[async_trait]
pub trait SecurityProvider: Send + Sync {
    /// Resolve `security_id` for `service_id`, or `None` if unconfigured.
    async fn resolve(&self, service_id: &str, security_id: &str) -> Option<SecurityScheme>;
}

/// [`SecurityProvider`] with no configured schemes, for use-cases that
/// never declare a `security` requirement.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSecurityProvider;

#[async_trait]
impl SecurityProvider for NoSecurityProvider {
    async fn resolve(&self, _service_id: &str, _security_id: &str) -> Option<SecurityScheme> {
        None
    }
}

/// The parsed contents of a `WWW-Authenticate: Digest ...` challenge.
#[derive(Debug, Clone)]
struct DigestChallenge {
    realm: String,
    nonce: String,
    qop: Option<String>,
    opaque: Option<String>,
    algorithm: DigestAlgorithm,
}

/// Cached per-service digest state: the last challenge seen, plus the
/// nonce-count the RFC requires the client to track and increment on every
/// reuse of a server nonce.
#[derive(Debug, Clone)]
struct DigestState {
    challenge: DigestChallenge,
    nonce_count: u32,
}

/// Per-service cache of digest challenges, so repeated calls to the same
/// service do not need to re-prime with an extra round trip each time.
///
/// Backed by `tokio::sync::Mutex` rather than `std::sync::Mutex` so a
/// nonce-count read-and-bump (spec §5) composes with the rest of the async
/// request path without risking a blocking lock on the executor thread.
#[derive(Debug, Default)]
pub struct DigestCache {
    by_service: Mutex<BTreeMap<String, DigestState>>,
}

impl DigestCache {
    /// Construct an empty cache.
    #[must_use]
    pub fn new() -> Self {
        DigestCache::default()
    }

    async fn get(&self, service_id: &str) -> Option<DigestState> {
        self.by_service.lock().await.get(service_id).cloned()
    }

    async fn store_challenge(&self, service_id: &str, challenge: DigestChallenge) {
        self.by_service.lock().await.insert(
            service_id.to_string(),
            DigestState {
                challenge,
                nonce_count: 0,
            },
        );
    }

    async fn next_nonce_count(&self, service_id: &str) -> Option<u32> {
        let mut guard = self.by_service.lock().await;
        let state = guard.get_mut(service_id)?;
        state.nonce_count += 1;
        Some(state.nonce_count)
    }

    async fn invalidate(&self, service_id: &str) {
        self.by_service.lock().await.remove(service_id);
    }
}

/// Parses a `WWW-Authenticate` header value into a [`DigestChallenge`].
///
/// Returns `None` if the header is missing or is not a `Digest` challenge.
fn parse_challenge(header_value: &str) -> Option<DigestChallenge> {
    let rest = header_value.strip_prefix("Digest ")?;
    let mut fields: BTreeMap<String, String> = BTreeMap::new();
    for part in split_challenge_params(rest) {
        if let Some((key, value)) = part.split_once('=') {
            fields.insert(
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            );
        }
    }
    let realm = fields.get("realm")?.clone();
    let nonce = fields.get("nonce")?.clone();
    let algorithm = match fields.get("algorithm").map(String::as_str) {
        Some("SHA-256") => DigestAlgorithm::Sha256,
        _ => DigestAlgorithm::Md5,
    };
    Some(DigestChallenge {
        realm,
        nonce,
        qop: fields.get("qop").cloned(),
        opaque: fields.get("opaque").cloned(),
        algorithm,
    })
}

/// Splits digest challenge params on commas that are not inside quotes.
fn split_challenge_params(input: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(input[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(input[start..].trim());
    parts
}

fn hex_digest(algorithm: DigestAlgorithm, input: &str) -> String {
    match algorithm {
        DigestAlgorithm::Md5 => {
            let mut hasher = Md5::new();
            hasher.update(input.as_bytes());
            hex::encode(hasher.finalize())
        }
        DigestAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(input.as_bytes());
            hex::encode(hasher.finalize())
        }
    }
}

fn generate_cnonce() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Computes the `Authorization: Digest ...` header value for `method`/
/// `uri` given a previously-seen `challenge`, incrementing `nonce_count`.
fn build_authorization_header(
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
    challenge: &DigestChallenge,
    nonce_count: u32,
) -> String {
    let ha1 = hex_digest(
        challenge.algorithm,
        &format!("{username}:{}:{password}", challenge.realm),
    );
    let ha2 = hex_digest(challenge.algorithm, &format!("{method}:{uri}"));
    let nc = format!("{nonce_count:08x}");
    let cnonce = generate_cnonce();

    let (response, qop_field) = if let Some(qop) = &challenge.qop {
        let qop = qop.split(',').next().unwrap_or("auth").trim();
        let response = hex_digest(
            challenge.algorithm,
            &format!("{ha1}:{}:{nc}:{cnonce}:{qop}:{ha2}", challenge.nonce),
        );
        (response, Some(qop.to_string()))
    } else {
        let response = hex_digest(challenge.algorithm, &format!("{ha1}:{}:{ha2}", challenge.nonce));
        (response, None)
    };

    let mut header = format!(
        "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", uri=\"{uri}\", response=\"{response}\"",
        challenge.realm, challenge.nonce
    );
    if let Some(qop) = qop_field {
        header.push_str(&format!(", qop={qop}, nc={nc}, cnonce=\"{cnonce}\""));
    }
    if let Some(opaque) = &challenge.opaque {
        header.push_str(&format!(", opaque=\"{opaque}\""));
    }
    header
}

/// Result of trying to apply a cached digest challenge to a request.
pub enum DigestApplication {
    /// No cached challenge for this service; a priming request must be
    /// sent first so the server's `WWW-Authenticate` header can be read.
    NeedsChallenge,
    /// Header computed from a cached challenge.
    Header(String),
}

/// Looks up `service_id`'s cached digest challenge and computes the
/// `Authorization` header for it, or reports that a priming round trip is
/// needed first.
pub async fn apply_cached_digest(
    cache: &DigestCache,
    service_id: &str,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
) -> DigestApplication {
    let Some(state) = cache.get(service_id).await else {
        return DigestApplication::NeedsChallenge;
    };
    let nonce_count = cache.next_nonce_count(service_id).await.unwrap_or(1);
    DigestApplication::Header(build_authorization_header(
        username,
        password,
        method,
        uri,
        &state.challenge,
        nonce_count,
    ))
}

/// Records a fresh challenge read off a `401 WWW-Authenticate` response and
/// computes the first `Authorization` header to retry with.
pub async fn prime_digest_from_challenge(
    cache: &DigestCache,
    service_id: &str,
    www_authenticate: &str,
    username: &str,
    password: &str,
    method: &str,
    uri: &str,
) -> Option<String> {
    let challenge = parse_challenge(www_authenticate)?;
    cache.store_challenge(service_id, challenge.clone()).await;
    let nonce_count = cache.next_nonce_count(service_id).await.unwrap_or(1);
    Some(build_authorization_header(
        username,
        password,
        method,
        uri,
        &challenge,
        nonce_count,
    ))
}

/// Drops a service's cached digest challenge, e.g. after a retried request
/// is still rejected and the nonce must be considered stale.
pub async fn invalidate_digest(cache: &DigestCache, service_id: &str) {
    cache.invalidate(service_id).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_digest_challenge_with_qop() {
        let header = r#"Digest realm="api@example.com", qop="auth", nonce="abc123", opaque="xyz", algorithm=MD5"#;
        let challenge = parse_challenge(header).expect("challenge should parse");
        assert_eq!(challenge.realm, "api@example.com");
        assert_eq!(challenge.nonce, "abc123");
        assert_eq!(challenge.qop.as_deref(), Some("auth"));
        assert_eq!(challenge.opaque.as_deref(), Some("xyz"));
        assert_eq!(challenge.algorithm, DigestAlgorithm::Md5);
    }

    #[tokio::test]
    async fn cache_increments_nonce_count_across_requests() {
        let cache = DigestCache::new();
        cache
            .store_challenge(
                "svc",
                DigestChallenge {
                    realm: "r".into(),
                    nonce: "n".into(),
                    qop: Some("auth".into()),
                    opaque: None,
                    algorithm: DigestAlgorithm::Md5,
                },
            )
            .await;
        assert_eq!(cache.next_nonce_count("svc").await, Some(1));
        assert_eq!(cache.next_nonce_count("svc").await, Some(2));
    }

    #[test]
    fn authorization_header_contains_expected_fields() {
        let challenge = DigestChallenge {
            realm: "realm".into(),
            nonce: "nonce".into(),
            qop: Some("auth".into()),
            opaque: None,
            algorithm: DigestAlgorithm::Md5,
        };
        let header = build_authorization_header("u", "p", "GET", "/x", &challenge, 1);
        assert!(header.starts_with("Digest username=\"u\""));
        assert!(header.contains("nc=00000001"));
        assert!(header.contains("qop=auth"));
    }

    #[tokio::test]
    async fn needs_challenge_when_cache_is_empty() {
        let cache = DigestCache::new();
        let result = apply_cached_digest(&cache, "svc", "u", "p", "GET", "/x").await;
        assert!(matches!(result, DigestApplication::NeedsChallenge));
    }
}
