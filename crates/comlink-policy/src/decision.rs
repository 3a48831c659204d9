// SPDX-License-Identifier: MIT OR Apache-2.0
//! The router's decision vocabulary (spec §4.4): tagged outcomes that
//! carry what to actually do next — wait, switch provider, retry, or
//! give up — rather than a single allow/deny bit.

use std::time::Duration;

/// Result of `beforePerform(provider)`.
#[derive(Debug, Clone, PartialEq)]
pub enum BeforePerformDecision {
    /// Proceed with the attempt now.
    Ok,
    /// Wait this long before attempting (circuit still open, or a pending
    /// retry backoff from the previous failure).
    Backoff(Duration),
    /// The current provider changed; the caller must re-bind the
    /// profile-provider before retrying.
    Recache(String),
}

/// Result of `afterFailure(provider, reason)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AfterFailureDecision {
    /// Retry the same provider (a pending backoff, if any, is available
    /// via the next `beforePerform` call).
    Retry,
    /// Retry against a different provider.
    Switch(String),
    /// Give up; propagate the last error to the caller.
    Abort,
}
