// SPDX-License-Identifier: MIT OR Apache-2.0
//! Translates a registry-bound [`ProviderJson`] into the collaborators
//! `comlink_http::HttpEngine` expects: a service-id-to-base-url map and a
//! resolved, credential-bearing security scheme per `(service, security-id)`
//! pair. Kept as its own module because this is the one place the wire
//! form (plain-string placements, no credential resolution) and the
//! internal form (a typed `SecurityScheme` enum) actually meet.

use std::collections::BTreeMap;

use async_trait::async_trait;
use comlink_error::CoreError;
use comlink_http::{ApiKeyPlacement, SecurityProvider, SecurityScheme, StaticServiceSelector};
use comlink_registry::{ProviderJson, SecuritySchemeJson};
use comlink_variables::Variable;

/// [`SecurityProvider`] backed by a bound provider's declared schemes, with
/// optional per-call overrides (spec §6's `UseCase.perform(..., {security?})`).
#[derive(Debug, Default, Clone)]
pub struct BoundSecurityProvider {
    by_service: BTreeMap<String, BTreeMap<String, SecurityScheme>>,
}

#[async_trait]
impl SecurityProvider for BoundSecurityProvider {
    async fn resolve(&self, service_id: &str, security_id: &str) -> Option<SecurityScheme> {
        self.by_service.get(service_id)?.get(security_id).cloned()
    }
}

fn placement_from_wire(placement: &str) -> Result<ApiKeyPlacement, CoreError> {
    match placement {
        "header" => Ok(ApiKeyPlacement::Header),
        "query" => Ok(ApiKeyPlacement::Query),
        "body" => Ok(ApiKeyPlacement::Body),
        "path" => Ok(ApiKeyPlacement::Path),
        other => Err(CoreError::Configuration {
            message: format!("unrecognized api key placement '{other}'"),
        }),
    }
}

fn translate_scheme(scheme: &SecuritySchemeJson) -> Result<SecurityScheme, CoreError> {
    Ok(match scheme {
        SecuritySchemeJson::Basic { username, password } => SecurityScheme::Basic {
            username: username.clone(),
            password: password.clone(),
        },
        SecuritySchemeJson::Bearer { token } => SecurityScheme::Bearer { token: token.clone() },
        SecuritySchemeJson::ApiKey { placement, name, value } => SecurityScheme::ApiKey {
            placement: placement_from_wire(placement)?,
            name: name.clone(),
            value: value.clone(),
        },
        SecuritySchemeJson::Digest { username, password } => SecurityScheme::Digest {
            username: username.clone(),
            password: password.clone(),
        },
    })
}

/// Apply a `UseCase.perform`-supplied `security` override: an object
/// `{securityId: {token?, value?, username?, password?}}` whose fields are
/// merged onto the bound scheme of the same id across every service that
/// declares it. Overriding a credential field the original scheme shape
/// doesn't have is an error, since there is no declared scheme to place it
/// into — the caller can only replace values, not invent new scheme kinds.
fn apply_override(scheme: &SecurityScheme, overrides: &Variable) -> Result<SecurityScheme, CoreError> {
    let Variable::Object(fields) = overrides else {
        return Ok(scheme.clone());
    };
    let string_field = |name: &str| -> Option<String> {
        match fields.get(name) {
            Some(Variable::String(s)) => Some(s.clone()),
            _ => None,
        }
    };
    Ok(match scheme {
        SecurityScheme::Basic { username, password } => SecurityScheme::Basic {
            username: string_field("username").unwrap_or_else(|| username.clone()),
            password: string_field("password").unwrap_or_else(|| password.clone()),
        },
        SecurityScheme::Bearer { token } => SecurityScheme::Bearer {
            token: string_field("token").unwrap_or_else(|| token.clone()),
        },
        SecurityScheme::ApiKey { placement, name, value } => SecurityScheme::ApiKey {
            placement: placement.clone(),
            name: name.clone(),
            value: string_field("value").unwrap_or_else(|| value.clone()),
        },
        SecurityScheme::Digest { username, password } => SecurityScheme::Digest {
            username: string_field("username").unwrap_or_else(|| username.clone()),
            password: string_field("password").unwrap_or_else(|| password.clone()),
        },
    })
}

/// Build the HTTP engine's service selector and security provider from a
/// bound provider, applying `security_overrides` (per security id) on top
/// of the provider's declared schemes.
pub fn translate_provider(
    provider: &ProviderJson,
    security_overrides: Option<&Variable>,
) -> Result<(StaticServiceSelector, BoundSecurityProvider), CoreError> {
    let mut services = Vec::new();
    let mut by_service = BTreeMap::new();

    for (service_id, service) in &provider.services {
        services.push((service_id.clone(), service.base_url.clone()));

        let mut by_security = BTreeMap::new();
        for (security_id, scheme) in &service.security {
            let mut resolved = translate_scheme(scheme)?;
            if let Some(Variable::Object(overrides)) = security_overrides {
                if let Some(override_value) = overrides.get(security_id) {
                    resolved = apply_override(&resolved, override_value)?;
                }
            }
            by_security.insert(security_id.clone(), resolved);
        }
        by_service.insert(service_id.clone(), by_security);
    }

    Ok((StaticServiceSelector::new(services), BoundSecurityProvider { by_service }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider_with_bearer() -> ProviderJson {
        let mut security = BTreeMap::new();
        security.insert(
            "main".to_string(),
            SecuritySchemeJson::Bearer { token: "original".to_string() },
        );
        let mut services = BTreeMap::new();
        services.insert(
            "default".to_string(),
            comlink_registry::ServiceJson {
                base_url: "https://api.example.test".to_string(),
                security,
            },
        );
        ProviderJson { services }
    }

    #[tokio::test]
    async fn translates_bearer_scheme() {
        let (selector, security) = translate_provider(&provider_with_bearer(), None).unwrap();
        assert_eq!(
            comlink_http::ServiceSelector::base_url(&selector, "default").await,
            Some("https://api.example.test".to_string())
        );
        let resolved = security.resolve("default", "main").await.unwrap();
        assert!(matches!(resolved, SecurityScheme::Bearer { token } if token == "original"));
    }

    #[tokio::test]
    async fn override_replaces_bearer_token() {
        let overrides = Variable::from_iter([(
            "main".to_string(),
            Variable::from_iter([("token".to_string(), Variable::String("overridden".to_string()))]),
        )]);
        let (_selector, security) = translate_provider(&provider_with_bearer(), Some(&overrides)).unwrap();
        let resolved = security.resolve("default", "main").await.unwrap();
        assert!(matches!(resolved, SecurityScheme::Bearer { token } if token == "overridden"));
    }

    #[test]
    fn unrecognized_placement_is_a_configuration_error() {
        let scheme = SecuritySchemeJson::ApiKey {
            placement: "cookie".to_string(),
            name: "key".to_string(),
            value: "v".to_string(),
        };
        let err = translate_scheme(&scheme).unwrap_err();
        assert!(matches!(err, CoreError::Configuration { .. }));
    }
}
