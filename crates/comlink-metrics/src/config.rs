// SPDX-License-Identifier: MIT OR Apache-2.0
//! Debounce window configuration (spec §4.6): "Configuration requires
//! `T_max >= T_min` — otherwise construction fails."

use std::time::Duration;

use thiserror::Error;

/// Construction-time validation failure for [`DebounceConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricsConfigError {
    /// `metricDebounceTimeMax` was smaller than `metricDebounceTimeMin`.
    #[error("metric debounce max ({max_ms}ms) must be >= min ({min_ms}ms)")]
    MaxBelowMin {
        /// The configured minimum, in milliseconds.
        min_ms: u64,
        /// The configured maximum, in milliseconds.
        max_ms: u64,
    },
}

/// The debounce window a [`crate::reporter::MetricsReporter`] flushes on:
/// at least `t_min` of inactivity, never more than `t_max` from the first
/// buffered entry.
#[derive(Debug, Clone, Copy)]
pub struct DebounceConfig {
    /// Minimum inactivity before a flush.
    pub t_min: Duration,
    /// Maximum time since the first buffered entry before a forced flush.
    pub t_max: Duration,
}

impl DebounceConfig {
    /// Validate and build a debounce window.
    pub fn new(t_min: Duration, t_max: Duration) -> Result<Self, MetricsConfigError> {
        if t_max < t_min {
            return Err(MetricsConfigError::MaxBelowMin {
                min_ms: t_min.as_millis() as u64,
                max_ms: t_max.as_millis() as u64,
            });
        }
        Ok(DebounceConfig { t_min, t_max })
    }

    /// `T_max = 3 * T_min`, the default a caller gets when only `t_min`
    /// is configured.
    #[must_use]
    pub fn with_default_max(t_min: Duration) -> Self {
        DebounceConfig {
            t_min,
            t_max: t_min * 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn max_below_min_is_rejected() {
        let result = DebounceConfig::new(Duration::from_millis(500), Duration::from_millis(100));
        assert!(result.is_err());
    }

    #[test]
    fn default_max_is_triple_min() {
        let config = DebounceConfig::with_default_max(Duration::from_millis(200));
        assert_eq!(config.t_max, Duration::from_millis(600));
    }
}
