// SPDX-License-Identifier: MIT OR Apache-2.0
//! [`UseCase`]: spec §6's `UseCase.perform(input?, {provider?, parameters?,
//! security?, mapVariant?, mapRevision?}) -> Result<output, error>`.

use std::sync::Arc;

use comlink_runtime::{PerformOptions, UseCaseDriver, UseCaseDriverConfig};
use comlink_variables::Variable;

use crate::client::Shared;
use crate::error::ClientError;
use crate::manifest::ProfileManifest;

/// A bound (profile, use-case) pair, ready to perform.
pub struct UseCase {
    shared: Arc<Shared>,
    profile_id: String,
    profile_version: Option<String>,
    profile_manifest: ProfileManifest,
    usecase: String,
}

impl std::fmt::Debug for UseCase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UseCase")
            .field("profile_id", &self.profile_id)
            .field("profile_version", &self.profile_version)
            .field("usecase", &self.usecase)
            .finish_non_exhaustive()
    }
}

impl UseCase {
    pub(crate) fn new(
        shared: Arc<Shared>,
        profile_id: String,
        profile_version: Option<String>,
        profile_manifest: ProfileManifest,
        usecase: String,
    ) -> Self {
        UseCase { shared, profile_id, profile_version, profile_manifest, usecase }
    }

    /// This use-case's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.usecase
    }

    /// Perform this use-case against the input and per-call overrides
    /// (spec §6).
    pub async fn perform(&self, input: Variable, options: PerformOptions) -> Result<Variable, ClientError> {
        let router = self
            .shared
            .router_for(&self.profile_manifest, &self.profile_id, self.profile_version.as_deref(), &self.usecase)
            .await;

        let driver = UseCaseDriver::new(UseCaseDriverConfig {
            profile_id: self.profile_id.clone(),
            profile_version: self.profile_version.clone(),
            usecase: self.usecase.clone(),
            registry: Arc::clone(&self.shared.registry),
            fetch: Arc::clone(&self.shared.fetch),
            cache: Arc::clone(&self.shared.cache),
            router,
            events: Arc::clone(&self.shared.events),
            sandbox: Arc::clone(&self.shared.sandbox),
            sandbox_timeout: self.shared.config.sandbox_timeout_duration(),
            timers: Arc::clone(&self.shared.runtime_timers),
        });

        driver.perform(input, options).await.map_err(ClientError::from)
    }
}
