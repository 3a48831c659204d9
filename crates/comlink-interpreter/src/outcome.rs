// SPDX-License-Identifier: MIT OR Apache-2.0
//! Visitor outcomes: the `{data}` / `{error, ...}` slot every frame carries.

use comlink_error::AstPath;
use comlink_variables::Variable;

/// What a frame (or its subtree) produced: a data value, or an error with
/// enough context to resolve into a [`comlink_error::CoreError`] later.
#[derive(Debug, Clone)]
pub enum Outcome {
    /// A successful result value.
    Data(Variable),
    /// An error outcome raised by a `map error` statement (or propagated
    /// from a descendant).
    Error {
        /// The error value the map assigned.
        value: Variable,
        /// Path to the `OutcomeStatement` (or other failure site) that
        /// raised this error.
        source_path: AstPath,
        /// `true` if this error was raised or observed while inside an HTTP
        /// response handler.
        from_http: bool,
        /// The response status code in effect when this error was raised,
        /// set only when `from_http` is `true`.
        status_code: Option<u16>,
    },
}

impl Outcome {
    /// Merge two outcomes, with error outcomes dominating: once an error is
    /// set, a later data outcome from a sibling never overwrites it (spec
    /// §3's frame-outcome invariant).
    #[must_use]
    pub fn merge(self, other: Outcome) -> Outcome {
        match self {
            Outcome::Error { .. } => self,
            Outcome::Data(_) => other,
        }
    }

    /// `true` if this outcome should terminate the enclosing definition.
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error { .. })
    }

    /// Mark an error outcome as having occurred inside an HTTP response
    /// handler, recording the status code in effect. No-op for data
    /// outcomes.
    #[must_use]
    pub fn mark_from_http(self, status_code: u16) -> Outcome {
        match self {
            Outcome::Error {
                value,
                source_path,
                ..
            } => Outcome::Error {
                value,
                source_path,
                from_http: true,
                status_code: Some(status_code),
            },
            other => other,
        }
    }
}
