// SPDX-License-Identifier: MIT OR Apache-2.0
//! Configuration warnings: a `ConfigWarning`/`WarningSeverity` pair for
//! non-fatal issues surfaced during config validation.

/// How severe a configuration issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningSeverity {
    /// Informational note, not necessarily a problem.
    Info,
    /// Something likely unintended, but the client still starts.
    Warning,
    /// Invalid configuration; construction fails.
    Error,
}

/// A single configuration issue found while validating a [`crate::ClientConfig`].
#[derive(Debug, Clone)]
pub struct ConfigWarning {
    /// Dot-delimited path to the problematic field (e.g.
    /// `"metricDebounceTimeMax"`).
    pub field: String,
    /// Human-readable description of the issue.
    pub message: String,
    /// How severe this issue is.
    pub severity: WarningSeverity,
}
