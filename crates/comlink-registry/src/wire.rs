// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry bind response wire shapes (spec §6: "Registry bind response:
//! `{ provider: ProviderJson, map_ast: string<MapDocumentNode> }` with
//! HTTP 200; on non-200, body may be `{title, detail}`").

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level bind response body, exactly as the registry returns it on a
/// 200. `map_ast` is a JSON-encoded `MapDocument`, not a nested object,
/// matching the wire format's `string<MapDocumentNode>` typing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BindResponseWire {
    /// Resolved provider metadata: services and their security schemes.
    pub provider: ProviderJson,
    /// JSON-encoded `MapDocument`.
    pub map_ast: String,
}

/// Resolved provider: every service the map may address, by id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderJson {
    /// Service id to service metadata.
    pub services: BTreeMap<String, ServiceJson>,
}

/// One service's base URL and the security schemes available on it,
/// keyed by the security id a map's `HttpCallSpec.security` may name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceJson {
    /// Base URL requests against this service are resolved against.
    pub base_url: String,
    /// Security id to scheme, as declared by the provider.
    #[serde(default)]
    pub security: BTreeMap<String, SecuritySchemeJson>,
}

/// Wire form of a security scheme (spec §4.2's four scheme kinds). Kept
/// separate from `comlink_http::SecurityScheme` (the *resolved*,
/// credential-bearing form a `SecurityProvider` hands back per request)
/// because the wire form additionally needs its own `Deserialize` and
/// carries placement information as plain strings rather than an enum
/// the registry has no reason to know about.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum SecuritySchemeJson {
    /// HTTP Basic.
    Basic {
        /// Basic auth username.
        username: String,
        /// Basic auth password.
        password: String,
    },
    /// Bearer token.
    Bearer {
        /// The bearer token value.
        token: String,
    },
    /// API key, placed per `placement` (`"header"`, `"query"`, `"body"`,
    /// or `"path"`).
    ApiKey {
        /// Where the key is placed on the outgoing request.
        placement: String,
        /// Header/query/path parameter or body field name.
        name: String,
        /// The key value.
        value: String,
    },
    /// HTTP Digest.
    Digest {
        /// Digest auth username.
        username: String,
        /// Digest auth password.
        password: String,
    },
}

/// Non-200 registry error body (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryErrorBody {
    /// Short human-readable summary.
    pub title: String,
    /// Longer explanation, if the registry supplied one.
    #[serde(default)]
    pub detail: Option<String>,
}
