// SPDX-License-Identifier: MIT OR Apache-2.0
//! The `superJson?` input to `Client::new` (spec §6): which profiles are
//! configured, which providers each one may use, and the failure policy
//! each provider gets. Deserializable so a caller can load it from a
//! config file, but also constructible by hand for embedding callers and
//! tests.
//!
//! A profile absent from the manifest (or a client built with no manifest
//! at all) is not an error by itself — [`Client::get_profile`](crate::Client::get_profile)
//! falls back to a permissive default (every use-case name accepted, a
//! single implicit provider with no retry) rather than requiring every
//! profile to be pre-declared, since the registry bind call is the real
//! source of truth for what a provider actually offers.

use std::collections::BTreeMap;
use std::time::Duration;

use comlink_policy::{BackoffPolicy, PolicyKind, UseCaseSafety};
use serde::{Deserialize, Serialize};

/// Top-level manifest: every profile this client knows about ahead of
/// time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuperJson {
    /// Profile id to its declared configuration.
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileManifest>,
}

/// One profile's declared use-cases and provider failure policies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileManifest {
    /// Pinned profile version, if any.
    #[serde(default)]
    pub version: Option<String>,
    /// Use-cases this profile declares, by name.
    #[serde(default)]
    pub usecases: BTreeMap<String, UseCaseManifest>,
    /// Every provider name configured for this profile, in configuration
    /// order (spec §4.4's `RouterConfig::providers`).
    #[serde(default)]
    pub providers: Vec<String>,
    /// Explicit failover priority; empty means "use configuration order".
    #[serde(default)]
    pub priority: Vec<String>,
    /// Overrides the per-use-case safety default when set.
    #[serde(default)]
    pub allow_failover: Option<bool>,
    /// Per-provider failure policy; a provider with no entry defaults to
    /// [`PolicyKind::NoRetry`].
    #[serde(default)]
    pub policies: BTreeMap<String, PolicyManifest>,
}

/// One declared use-case within a profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UseCaseManifest {
    /// Whether retrying against a different provider can duplicate a
    /// side effect (spec §4.4).
    #[serde(default = "default_safety")]
    pub safety: SafetyManifest,
}

impl Default for UseCaseManifest {
    fn default() -> Self {
        UseCaseManifest { safety: default_safety() }
    }
}

fn default_safety() -> SafetyManifest {
    SafetyManifest::Safe
}

/// Wire form of [`UseCaseSafety`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyManifest {
    /// See [`UseCaseSafety::Safe`].
    Safe,
    /// See [`UseCaseSafety::Unsafe`].
    Unsafe,
}

impl From<SafetyManifest> for UseCaseSafety {
    fn from(value: SafetyManifest) -> Self {
        match value {
            SafetyManifest::Safe => UseCaseSafety::Safe,
            SafetyManifest::Unsafe => UseCaseSafety::Unsafe,
        }
    }
}

/// Wire form of [`PolicyKind`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyManifest {
    /// See [`PolicyKind::NoRetry`].
    NoRetry,
    /// See [`PolicyKind::SimpleRetry`].
    SimpleRetry {
        /// Maximum retries after the first failed attempt.
        max_contiguous_retries: u32,
        /// Wait schedule between attempts.
        backoff: BackoffManifest,
        /// Bounds a single attempt, in milliseconds.
        request_timeout_ms: u64,
    },
    /// See [`PolicyKind::CircuitBreaker`].
    CircuitBreaker {
        /// Consecutive failures before the circuit opens.
        max_contiguous_failures: u32,
        /// Initial open duration, in milliseconds.
        open_time_ms: u64,
        /// Upper bound the doubling open-time is clamped to, in
        /// milliseconds.
        max_open_time_ms: u64,
        /// Bounds a single attempt, in milliseconds.
        request_timeout_ms: u64,
    },
}

impl PolicyManifest {
    /// Translate into the router's internal policy representation.
    #[must_use]
    pub fn into_policy_kind(self) -> PolicyKind {
        match self {
            PolicyManifest::NoRetry => PolicyKind::NoRetry,
            PolicyManifest::SimpleRetry { max_contiguous_retries, backoff, request_timeout_ms } => {
                PolicyKind::SimpleRetry {
                    max_contiguous_retries,
                    backoff: backoff.into_backoff_policy(),
                    request_timeout: Duration::from_millis(request_timeout_ms),
                }
            }
            PolicyManifest::CircuitBreaker {
                max_contiguous_failures,
                open_time_ms,
                max_open_time_ms,
                request_timeout_ms,
            } => PolicyKind::CircuitBreaker {
                max_contiguous_failures,
                open_time: Duration::from_millis(open_time_ms),
                max_open_time: Duration::from_millis(max_open_time_ms),
                request_timeout: Duration::from_millis(request_timeout_ms),
            },
        }
    }
}

/// Wire form of [`BackoffPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackoffManifest {
    /// See [`BackoffPolicy::Constant`].
    Constant {
        /// Fixed delay, in milliseconds.
        delay_ms: u64,
    },
    /// See [`BackoffPolicy::Exponential`].
    Exponential {
        /// Delay before the first retry, in milliseconds.
        start_ms: u64,
        /// Growth multiplier applied per attempt.
        factor: f64,
        /// Upper bound on the computed delay, in milliseconds.
        max_ms: u64,
    },
}

impl BackoffManifest {
    /// Translate into the router's internal backoff representation.
    #[must_use]
    pub fn into_backoff_policy(self) -> BackoffPolicy {
        match self {
            BackoffManifest::Constant { delay_ms } => {
                BackoffPolicy::Constant { delay: Duration::from_millis(delay_ms) }
            }
            BackoffManifest::Exponential { start_ms, factor, max_ms } => BackoffPolicy::Exponential {
                start: Duration::from_millis(start_ms),
                factor,
                max: Duration::from_millis(max_ms),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_a_minimal_profile() {
        let json = r#"{
            "profiles": {
                "acme/get-user": {
                    "usecases": {"GetUser": {"safety": "unsafe"}},
                    "providers": ["p1", "p2"],
                    "priority": ["p2", "p1"],
                    "policies": {
                        "p2": {
                            "kind": "circuit_breaker",
                            "max_contiguous_failures": 2,
                            "open_time_ms": 20,
                            "max_open_time_ms": 1000,
                            "request_timeout_ms": 5000
                        }
                    }
                }
            }
        }"#;
        let manifest: SuperJson = serde_json::from_str(json).unwrap();
        let profile = manifest.profiles.get("acme/get-user").unwrap();
        assert_eq!(profile.priority, vec!["p2".to_string(), "p1".to_string()]);
        assert_eq!(
            profile.usecases.get("GetUser").unwrap().safety,
            SafetyManifest::Unsafe
        );
        let policy = profile.policies.get("p2").cloned().unwrap().into_policy_kind();
        assert!(matches!(policy, PolicyKind::CircuitBreaker { max_contiguous_failures: 2, .. }));
    }
}
