// SPDX-License-Identifier: MIT OR Apache-2.0
//! Facade-level errors (spec §6): everything [`crate::Client`] can fail
//! with before a use-case even reaches the interpreter, plus the
//! passthrough for whatever the runtime itself returns.

use comlink_config::ConfigWarning;
use comlink_error::CoreError;
use thiserror::Error;

/// Errors surfaced by the `Client`/`Profile`/`UseCase` facade.
#[derive(Debug, Error)]
pub enum ClientError {
    /// `ClientConfig::validate` found at least one fatal warning.
    #[error("client configuration is invalid: {0:?}")]
    InvalidConfig(Vec<ConfigWarning>),

    /// `Profile.getUseCase(name)` was called with a name absent from the
    /// profile's declared use-cases (spec §6).
    #[error("use-case '{usecase}' is not declared on profile '{profile}'")]
    UsecaseNotFound {
        /// The profile that was asked for the use-case.
        profile: String,
        /// The use-case name that was not found.
        usecase: String,
    },

    /// The runtime itself failed (binding, interpretation, HTTP, or
    /// validation).
    #[error(transparent)]
    Core(#[from] CoreError),
}
