// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry failure taxonomy (spec §7's *Binding* kind).

use comlink_error::CoreError;
use comlink_http::FetchError;
use thiserror::Error;

/// Everything that can go wrong binding a profile/provider/map against
/// the registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The fetch to the registry itself failed (DNS, TLS, timeout, ...).
    #[error("registry request failed: {0}")]
    Transport(#[from] FetchError),

    /// The registry responded with a non-200 status.
    #[error("registry responded {status_code}: {title}")]
    Http {
        /// The response status code.
        status_code: u16,
        /// `{title, detail}` body, or a generic summary if the body did
        /// not parse as that shape.
        title: String,
        /// `detail`, if the body carried one.
        detail: Option<String>,
    },

    /// The 200 response body did not match `BindResponseWire`.
    #[error("malformed bind response: {0}")]
    InvalidResponse(#[source] serde_json::Error),

    /// `map_ast` did not decode to a valid `MapDocument`.
    #[error("malformed map document: {0}")]
    InvalidMapAst(#[source] serde_json::Error),

    /// The bound map document has no entry for the requested use-case.
    #[error("map document has no entry for use-case '{usecase}'")]
    MissingMap {
        /// The use-case that was requested.
        usecase: String,
    },
}

impl From<RegistryError> for CoreError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::Http { status_code, title, detail } => CoreError::Binding {
                message: detail.unwrap_or(title),
                status_code: Some(status_code),
            },
            other => CoreError::Binding {
                message: other.to_string(),
                status_code: None,
            },
        }
    }
}
