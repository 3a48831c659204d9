// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry client: resolves a profile/provider/map-variant/map-revision
//! combination into a bound provider and map document.
//!
//! Spec §6 names only the wire format this collaborator consumes; this
//! crate supplies the collaborator trait and both a real HTTP-backed
//! implementation (reusing `comlink-http`'s `Fetch` abstraction — a
//! registry bind call is just another HTTP request) and a canned-response
//! mock for tests.

mod client;
mod error;
mod mock;
mod wire;

pub use client::{BindRequest, BindResponse, HttpRegistryClient, RegistryClient};
pub use error::RegistryError;
pub use mock::MockRegistryClient;
pub use wire::{BindResponseWire, ProviderJson, RegistryErrorBody, SecuritySchemeJson, ServiceJson};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;

    use comlink_http::{Fetch, FetchError, FetchRequest, FetchResponse};
    use comlink_interpreter::ast::MapDocument;

    struct StaticFetch {
        status_code: u16,
        body: Vec<u8>,
    }

    #[async_trait::async_trait]
    impl Fetch for StaticFetch {
        async fn fetch(&self, _request: FetchRequest) -> Result<FetchResponse, FetchError> {
            Ok(FetchResponse {
                status_code: self.status_code,
                headers: BTreeMap::new(),
                body: self.body.clone(),
            })
        }
    }

    fn bind_request() -> BindRequest {
        BindRequest {
            profile_id: "acme/get-user".to_string(),
            profile_version: None,
            provider_name: "p1".to_string(),
            map_variant: None,
            map_revision: None,
        }
    }

    #[tokio::test]
    async fn successful_bind_decodes_provider_and_map() {
        let map = MapDocument { maps: BTreeMap::new(), operations: BTreeMap::new() };
        let wire = BindResponseWire {
            provider: ProviderJson { services: BTreeMap::new() },
            map_ast: serde_json::to_string(&map).unwrap(),
        };
        let fetch = Arc::new(StaticFetch {
            status_code: 200,
            body: serde_json::to_vec(&wire).unwrap(),
        });
        let client = HttpRegistryClient::new(fetch, "https://registry.example", std::time::Duration::from_secs(5));

        let response = client.bind(&bind_request()).await.unwrap();
        assert!(response.map.maps.is_empty());
    }

    #[tokio::test]
    async fn non_200_with_title_detail_surfaces_as_http_error() {
        let body = serde_json::to_vec(&RegistryErrorBody {
            title: "provider not found".to_string(),
            detail: Some("no provider named 'p1' on this profile".to_string()),
        })
        .unwrap();
        let fetch = Arc::new(StaticFetch { status_code: 404, body });
        let client = HttpRegistryClient::new(fetch, "https://registry.example", std::time::Duration::from_secs(5));

        let error = client.bind(&bind_request()).await.unwrap_err();
        match error {
            RegistryError::Http { status_code, title, .. } => {
                assert_eq!(status_code, 404);
                assert_eq!(title, "provider not found");
            }
            other => panic!("expected Http error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn mock_registry_returns_queued_response_then_falls_back() {
        let mock = MockRegistryClient::new();
        let map = MapDocument { maps: BTreeMap::new(), operations: BTreeMap::new() };
        let provider = ProviderJson { services: BTreeMap::new() };
        mock.queue(&bind_request(), Ok(BindResponse { provider: provider.clone(), map: map.clone() }));

        let first = mock.bind(&bind_request()).await;
        assert!(first.is_ok());

        let second = mock.bind(&bind_request()).await;
        assert!(matches!(second, Err(RegistryError::MissingMap { .. })));
    }

    #[test]
    fn binding_error_converts_to_core_binding_error() {
        let error = RegistryError::Http {
            status_code: 404,
            title: "not found".to_string(),
            detail: Some("missing".to_string()),
        };
        let core: comlink_error::CoreError = error.into();
        match core {
            comlink_error::CoreError::Binding { status_code, .. } => {
                assert_eq!(status_code, Some(404));
            }
            other => panic!("expected Binding error, got {other:?}"),
        }
    }
}
