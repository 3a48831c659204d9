// SPDX-License-Identifier: MIT OR Apache-2.0
//! Aggregated metrics payload shape (spec §4.6, §8 scenario 5).

/// Success/failure counts for one (profile, provider) pair accumulated
/// since the last flush.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderMetrics {
    /// Profile id.
    pub profile: String,
    /// Provider name.
    pub provider: String,
    /// Number of `success` events observed for this pair.
    pub success_count: u64,
    /// Number of `failure` events observed for this pair.
    pub failed_count: u64,
}

/// One aggregated `Metrics` emission: every (profile, provider) pair
/// touched since the previous flush.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MetricsPayload {
    /// Per-provider counts, in first-touched order.
    pub entries: Vec<ProviderMetrics>,
}
