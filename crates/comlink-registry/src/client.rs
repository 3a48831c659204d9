// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `RegistryClient` collaborator and its HTTP-backed implementation.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use comlink_http::{Fetch, FetchRequest};
use comlink_interpreter::ast::MapDocument;

use crate::error::RegistryError;
use crate::wire::{BindResponseWire, ProviderJson, RegistryErrorBody};

/// Inputs identifying which profile/provider/map revision to bind.
#[derive(Debug, Clone)]
pub struct BindRequest {
    /// Profile id.
    pub profile_id: String,
    /// Profile version, if pinned.
    pub profile_version: Option<String>,
    /// Provider name.
    pub provider_name: String,
    /// Explicit map variant, if requested.
    pub map_variant: Option<String>,
    /// Explicit map revision, if requested.
    pub map_revision: Option<String>,
}

/// A resolved bind: the provider's services/security plus its map
/// document, ready for the interpreter driver.
#[derive(Debug, Clone)]
pub struct BindResponse {
    /// Resolved provider metadata.
    pub provider: ProviderJson,
    /// The decoded map document.
    pub map: MapDocument,
}

/// Resolves a profile/provider/map-variant/map-revision combination
/// against the registry (spec §3's "Bound profile-provider").
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Bind `request`, returning the provider metadata and map document
    /// the interpreter runs against.
    async fn bind(&self, request: &BindRequest) -> Result<BindResponse, RegistryError>;
}

/// [`RegistryClient`] backed by a real HTTP call, reusing the same
/// [`Fetch`] abstraction the HTTP engine uses to talk to mapped APIs —
/// a registry bind call is, after all, just another HTTP request.
pub struct HttpRegistryClient {
    fetch: Arc<dyn Fetch>,
    base_url: String,
    timeout: Duration,
}

impl HttpRegistryClient {
    /// Build a client that binds against `base_url` (e.g.
    /// `https://registry.superface.ai`).
    #[must_use]
    pub fn new(fetch: Arc<dyn Fetch>, base_url: impl Into<String>, timeout: Duration) -> Self {
        HttpRegistryClient {
            fetch,
            base_url: base_url.into(),
            timeout,
        }
    }

    fn bind_url(&self, request: &BindRequest) -> String {
        let mut url = format!(
            "{}/registry/bind?profile={}&provider={}",
            self.base_url.trim_end_matches('/'),
            request.profile_id,
            request.provider_name,
        );
        if let Some(version) = &request.profile_version {
            url.push_str(&format!("&version={version}"));
        }
        if let Some(variant) = &request.map_variant {
            url.push_str(&format!("&mapVariant={variant}"));
        }
        if let Some(revision) = &request.map_revision {
            url.push_str(&format!("&mapRevision={revision}"));
        }
        url
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn bind(&self, request: &BindRequest) -> Result<BindResponse, RegistryError> {
        let fetch_request = FetchRequest {
            url: self.bind_url(request),
            method: "GET".to_string(),
            headers: BTreeMap::new(),
            body: None,
            timeout: self.timeout,
        };

        let response = self.fetch.fetch(fetch_request).await?;

        if response.status_code != 200 {
            let body = match serde_json::from_slice::<RegistryErrorBody>(&response.body) {
                Ok(body) => body,
                Err(_) => RegistryErrorBody {
                    title: format!("registry bind failed with status {}", response.status_code),
                    detail: None,
                },
            };
            return Err(RegistryError::Http {
                status_code: response.status_code,
                title: body.title,
                detail: body.detail,
            });
        }

        let wire: BindResponseWire =
            serde_json::from_slice(&response.body).map_err(RegistryError::InvalidResponse)?;
        let map: MapDocument =
            serde_json::from_str(&wire.map_ast).map_err(RegistryError::InvalidMapAst)?;

        tracing::debug!(
            target: "comlink_registry.client",
            profile = %request.profile_id,
            provider = %request.provider_name,
            "bound profile-provider"
        );

        Ok(BindResponse { provider: wire.provider, map })
    }
}
