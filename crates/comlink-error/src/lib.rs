// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Structured error taxonomy shared by every Comlink map-runtime crate.
//!
//! [`CoreError`] replaces the usual flat string-message error with a tagged
//! enum carrying the structured context each kind needs: AST path and source
//! location for interpretation failures, status code and mapped properties
//! for HTTP-originated failures, a field-level issue list for validation
//! failures. Every variant implements both [`CoreError::format_short`] and
//! [`CoreError::format_long`]; `Display` is [`CoreError::format_long`].

use std::fmt;

mod ast_path;
mod validation;

pub use ast_path::{AstPath, PathSegment, SourceLocation};
pub use validation::{ValidationIssue, ValidationIssueKind};

/// The complete Comlink core error taxonomy.
///
/// Each variant corresponds to a failure category named in the error
/// handling design: configuration, binding, interpretation, HTTP, mapped
/// (non-HTTP) outcome, and profile input/result validation.
///
/// `Display` renders [`CoreError::format_long`] rather than a single
/// message line (the taxonomy's own formatting contract), so this type
/// implements [`std::error::Error`]/[`fmt::Display`] by hand instead of via
/// `#[derive(thiserror::Error)]`.
#[derive(Debug)]
pub enum CoreError {
    /// Client configuration failed validation (e.g. `metricDebounceTimeMax <
    /// metricDebounceTimeMin`).
    Configuration {
        /// Human-readable explanation of what is invalid.
        message: String,
    },

    /// Binding a profile/provider/map combination against the registry
    /// failed (network failure, or a `{title, detail}` error body).
    Binding {
        /// Human-readable explanation, usually derived from the registry's
        /// `{title, detail}` error body.
        message: String,
        /// The HTTP status code returned by the registry, if the failure
        /// was a non-200 response rather than a transport-level failure.
        status_code: Option<u16>,
    },

    /// A Map AST node could not be interpreted: an unknown node kind, a
    /// missing named operation, an out-of-range child reference, or any
    /// other structural defect in the AST itself.
    MapAst {
        /// Human-readable explanation.
        message: String,
        /// Path from the document root to the offending node.
        ast_path: AstPath,
        /// Source location of the offending node, if the AST carried one.
        source_location: Option<SourceLocation>,
    },

    /// A `JessieExpression` node failed to evaluate in the sandbox.
    Jessie {
        /// Human-readable explanation, usually the sandbox's own error
        /// message.
        message: String,
        /// Path from the document root to the offending node.
        ast_path: AstPath,
        /// Source location of the offending node, if the AST carried one.
        source_location: Option<SourceLocation>,
    },

    /// An interpreter invariant was violated (a bug in the interpreter
    /// itself, not in the AST or the mapped API).
    Unexpected {
        /// Human-readable explanation.
        message: String,
        /// Path from the document root to the offending node.
        ast_path: AstPath,
        /// Source location of the offending node, if the AST carried one.
        source_location: Option<SourceLocation>,
    },

    /// An HTTP response reached a status of 400 or above with no response
    /// handler matching it and no *unhandled-http* hook registered.
    Http {
        /// The response status code.
        status_code: u16,
        /// A short description of the request that produced this response
        /// (method and URL), for diagnostics.
        request_debug: String,
        /// The raw response body, if it was read.
        response_body: Option<String>,
    },

    /// An error outcome was reached while the visitor stack was inside an
    /// HTTP response handler; carries the response status for telemetry in
    /// addition to whatever properties the map assigned to the error value.
    MappedHttp {
        /// The response status code in effect when the outcome was set.
        status_code: u16,
        /// Structured properties assigned to the error value by the map.
        properties: serde_json::Value,
    },

    /// A non-HTTP error outcome (`fail` statement with `isError: true`
    /// outside an HTTP context).
    Mapped {
        /// Structured properties assigned to the error value by the map.
        properties: serde_json::Value,
    },

    /// The use-case's declared input shape rejected the caller-supplied
    /// input.
    InputValidation {
        /// One entry per failing field.
        issues: Vec<ValidationIssue>,
    },

    /// The use-case's declared result shape rejected the value the map
    /// produced.
    ResultValidation {
        /// One entry per failing field.
        issues: Vec<ValidationIssue>,
    },
}

impl CoreError {
    /// One-line summary: kind plus message, no remediation hint.
    #[must_use]
    pub fn format_short(&self) -> String {
        match self {
            CoreError::Configuration { message } => format!("Configuration error: {message}"),
            CoreError::Binding { message, .. } => format!("Binding error: {message}"),
            CoreError::MapAst { message, .. } => format!("Map AST error: {message}"),
            CoreError::Jessie { message, .. } => format!("Expression error: {message}"),
            CoreError::Unexpected { message, .. } => format!("Unexpected error: {message}"),
            CoreError::Http { status_code, .. } => format!("HTTP error: status {status_code}"),
            CoreError::MappedHttp { status_code, .. } => {
                format!("Mapped HTTP error: status {status_code}")
            }
            CoreError::Mapped { .. } => "Mapped error".to_string(),
            CoreError::InputValidation { issues } => {
                format!("Input validation failed ({} issue(s))", issues.len())
            }
            CoreError::ResultValidation { issues } => {
                format!("Result validation failed ({} issue(s))", issues.len())
            }
        }
    }

    /// Short summary, AST path/location when available, and a `Hint:`-prefixed
    /// remediation line.
    #[must_use]
    pub fn format_long(&self) -> String {
        let mut out = self.format_short();
        if let Some(path) = self.ast_path() {
            out.push_str(&format!("\n  at {path}"));
        }
        if let Some(loc) = self.source_location() {
            out.push_str(&format!(" ({loc})"));
        }
        if let Some(hint) = self.hint() {
            out.push_str(&format!("\nHint: {hint}"));
        }
        out
    }

    /// The AST path attached to this error, if it is an interpretation
    /// failure.
    #[must_use]
    pub fn ast_path(&self) -> Option<&AstPath> {
        match self {
            CoreError::MapAst { ast_path, .. }
            | CoreError::Jessie { ast_path, .. }
            | CoreError::Unexpected { ast_path, .. } => Some(ast_path),
            _ => None,
        }
    }

    /// The source location attached to this error, if the offending AST
    /// node carried one.
    #[must_use]
    pub fn source_location(&self) -> Option<&SourceLocation> {
        match self {
            CoreError::MapAst {
                source_location, ..
            }
            | CoreError::Jessie {
                source_location, ..
            }
            | CoreError::Unexpected {
                source_location, ..
            } => source_location.as_ref(),
            _ => None,
        }
    }

    fn hint(&self) -> Option<&'static str> {
        match self {
            CoreError::Configuration { .. } => {
                Some("check the client configuration against its documented constraints")
            }
            CoreError::Binding { .. } => {
                Some("confirm the profile, provider, and map revision are published to the registry")
            }
            CoreError::MapAst { .. } => {
                Some("the map document is structurally invalid; re-publish a valid map")
            }
            CoreError::Jessie { .. } => Some("check the expression syntax and referenced variables"),
            CoreError::Unexpected { .. } => {
                Some("this indicates an interpreter bug; please file an issue with the map and input")
            }
            CoreError::Http { .. } => {
                Some("add a response handler for this status code or register an unhandled-http hook")
            }
            CoreError::MappedHttp { .. } | CoreError::Mapped { .. } => None,
            CoreError::InputValidation { .. } => Some("check the input against the use-case's input schema"),
            CoreError::ResultValidation { .. } => {
                Some("the provider response does not match the use-case's declared result shape")
            }
        }
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_long())
    }
}

impl std::error::Error for CoreError {}
