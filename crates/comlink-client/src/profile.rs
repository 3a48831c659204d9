// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`Profile`]: one profile id/version pair, scoped to the [`crate::Client`]
//! that produced it (spec §6's `Client.getProfile(id, version?) -> Profile`).

use std::sync::Arc;

use crate::client::Shared;
use crate::error::ClientError;
use crate::manifest::ProfileManifest;
use crate::usecase::UseCase;

/// A bound profile id, ready to hand out [`UseCase`] handles.
pub struct Profile {
    shared: Arc<Shared>,
    id: String,
    version: Option<String>,
    manifest: ProfileManifest,
}

impl Profile {
    pub(crate) fn new(shared: Arc<Shared>, id: String, version: Option<String>, manifest: ProfileManifest) -> Self {
        Profile { shared, id, version, manifest }
    }

    /// This profile's id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// This profile's pinned version, if any.
    #[must_use]
    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// Look up a use-case by name (spec §6's `Profile.getUseCase(name)`).
    ///
    /// Returns [`ClientError::UsecaseNotFound`] if the manifest declares
    /// this profile's use-cases and `name` is absent from that list. A
    /// profile with no declared use-cases at all (the permissive default
    /// — see [`crate::Client::get_profile`]) accepts any name.
    pub fn get_use_case(&self, name: &str) -> Result<UseCase, ClientError> {
        if !self.manifest.usecases.is_empty() && !self.manifest.usecases.contains_key(name) {
            return Err(ClientError::UsecaseNotFound {
                profile: self.id.clone(),
                usecase: name.to_string(),
            });
        }

        Ok(UseCase::new(
            Arc::clone(&self.shared),
            self.id.clone(),
            self.version.clone(),
            self.manifest.clone(),
            name.to_string(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comlink_config::ClientConfig;
    use crate::client::Client;
    use crate::manifest::{SuperJson, UseCaseManifest};
    use std::collections::BTreeMap;

    fn config() -> ClientConfig {
        ClientConfig {
            cache_path: "/tmp/c".to_string(),
            superface_path: "/tmp/s".to_string(),
            superface_api_url: "https://registry.example".to_string(),
            sdk_auth_token: None,
            disable_reporting: true,
            metric_debounce_time_min: 10,
            metric_debounce_time_max: 30,
            sandbox_timeout: 1000,
            superface_cache_timeout: 60,
            cache: true,
            debug: false,
        }
    }

    #[test]
    fn declared_profile_rejects_unknown_usecase() {
        let mut usecases = BTreeMap::new();
        usecases.insert("GetUser".to_string(), UseCaseManifest::default());
        let mut profiles = BTreeMap::new();
        profiles.insert(
            "acme/get-user".to_string(),
            ProfileManifest { usecases, ..Default::default() },
        );
        let client = Client::new(config(), Some(SuperJson { profiles }), None).unwrap();

        let profile = client.get_profile("acme/get-user", None);
        assert!(profile.get_use_case("GetUser").is_ok());
        let err = profile.get_use_case("DeleteUser").unwrap_err();
        assert!(matches!(err, ClientError::UsecaseNotFound { .. }));
    }
}
