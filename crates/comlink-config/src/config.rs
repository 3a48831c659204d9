// SPDX-License-Identifier: MIT OR Apache-2.0
//! `ClientConfig` (spec §6's "Configuration options (enumerated)").

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::token::is_valid_sdk_auth_token;
use crate::warning::{ConfigWarning, WarningSeverity};

/// Client-wide configuration (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Directory profile ASTs are cached under.
    pub cache_path: String,
    /// Path to the super.json-equivalent project descriptor.
    pub superface_path: String,
    /// Registry base URL.
    pub superface_api_url: String,
    /// SDK auth token, if configured. Invalid tokens are dropped (not
    /// rejected) during validation — see
    /// [`ClientConfig::validate`].
    #[serde(default)]
    pub sdk_auth_token: Option<String>,
    /// Disable metric reporting entirely.
    #[serde(default)]
    pub disable_reporting: bool,
    /// Minimum metric debounce inactivity, in milliseconds.
    pub metric_debounce_time_min: u64,
    /// Maximum metric debounce window, in milliseconds. Must be `>=`
    /// `metric_debounce_time_min`.
    pub metric_debounce_time_max: u64,
    /// Sandbox evaluation timeout, in milliseconds.
    pub sandbox_timeout: u64,
    /// Profile/provider document cache lifetime, in seconds.
    pub superface_cache_timeout: u64,
    /// Whether the document cache is enabled at all.
    #[serde(default = "default_true")]
    pub cache: bool,
    /// Verbose internal logging.
    #[serde(default)]
    pub debug: bool,
}

fn default_true() -> bool {
    true
}

impl ClientConfig {
    /// Validate this configuration, returning every warning found.
    /// `metricDebounceTimeMax < metricDebounceTimeMin` is the one
    /// condition severe enough that construction should fail outright
    /// (spec §4.6); everything else is a [`WarningSeverity::Warning`] the
    /// client still starts with.
    #[must_use]
    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        if self.metric_debounce_time_max < self.metric_debounce_time_min {
            warnings.push(ConfigWarning {
                field: "metricDebounceTimeMax".to_string(),
                message: format!(
                    "metricDebounceTimeMax ({}) must be >= metricDebounceTimeMin ({})",
                    self.metric_debounce_time_max, self.metric_debounce_time_min
                ),
                severity: WarningSeverity::Error,
            });
        }

        if let Some(token) = &self.sdk_auth_token {
            if !is_valid_sdk_auth_token(token) {
                warnings.push(ConfigWarning {
                    field: "sdkAuthToken".to_string(),
                    message: "sdkAuthToken is not a well-formed 'sfs_<hex>_<hex>' token and will be ignored".to_string(),
                    severity: WarningSeverity::Warning,
                });
            }
        }

        if self.cache_path.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "cachePath".to_string(),
                message: "cachePath must not be empty".to_string(),
                severity: WarningSeverity::Error,
            });
        }

        if self.superface_path.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "superfacePath".to_string(),
                message: "superfacePath must not be empty".to_string(),
                severity: WarningSeverity::Error,
            });
        }

        if self.superface_api_url.trim().is_empty() {
            warnings.push(ConfigWarning {
                field: "superfaceApiUrl".to_string(),
                message: "superfaceApiUrl must not be empty".to_string(),
                severity: WarningSeverity::Error,
            });
        }

        if self.sandbox_timeout == 0 {
            warnings.push(ConfigWarning {
                field: "sandboxTimeout".to_string(),
                message: "sandboxTimeout of 0 disables the sandbox's own timeout entirely".to_string(),
                severity: WarningSeverity::Warning,
            });
        }

        for warning in &warnings {
            tracing::warn!(
                target: "comlink_config.validate",
                field = %warning.field,
                severity = ?warning.severity,
                "{}",
                warning.message
            );
        }

        warnings
    }

    /// Whether any warning returned by [`ClientConfig::validate`] is
    /// severe enough that this configuration must not be used.
    #[must_use]
    pub fn has_fatal_warnings(warnings: &[ConfigWarning]) -> bool {
        warnings.iter().any(|w| w.severity == WarningSeverity::Error)
    }

    /// The `sdkAuthToken` to actually use: `None` if unset or malformed.
    #[must_use]
    pub fn effective_sdk_auth_token(&self) -> Option<&str> {
        self.sdk_auth_token
            .as_deref()
            .filter(|token| is_valid_sdk_auth_token(token))
    }

    /// [`ClientConfig::metric_debounce_time_min`] as a [`Duration`].
    #[must_use]
    pub fn metric_debounce_min(&self) -> Duration {
        Duration::from_millis(self.metric_debounce_time_min)
    }

    /// [`ClientConfig::metric_debounce_time_max`] as a [`Duration`].
    #[must_use]
    pub fn metric_debounce_max(&self) -> Duration {
        Duration::from_millis(self.metric_debounce_time_max)
    }

    /// [`ClientConfig::sandbox_timeout`] as a [`Duration`].
    #[must_use]
    pub fn sandbox_timeout_duration(&self) -> Duration {
        Duration::from_millis(self.sandbox_timeout)
    }

    /// [`ClientConfig::superface_cache_timeout`] as a [`Duration`].
    #[must_use]
    pub fn superface_cache_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.superface_cache_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_config() -> ClientConfig {
        ClientConfig {
            cache_path: "/tmp/comlink-cache".to_string(),
            superface_path: "/tmp/superface".to_string(),
            superface_api_url: "https://registry.example".to_string(),
            sdk_auth_token: None,
            disable_reporting: false,
            metric_debounce_time_min: 100,
            metric_debounce_time_max: 300,
            sandbox_timeout: 1000,
            superface_cache_timeout: 60,
            cache: true,
            debug: false,
        }
    }

    #[test]
    fn well_formed_config_has_no_warnings() {
        assert!(base_config().validate().is_empty());
    }

    #[test]
    fn max_below_min_is_a_fatal_warning() {
        let mut config = base_config();
        config.metric_debounce_time_max = 50;
        let warnings = config.validate();
        assert!(ClientConfig::has_fatal_warnings(&warnings));
    }

    #[test]
    fn malformed_token_warns_but_is_not_fatal() {
        let mut config = base_config();
        config.sdk_auth_token = Some("not-a-token".to_string());
        let warnings = config.validate();
        assert!(!ClientConfig::has_fatal_warnings(&warnings));
        assert_eq!(warnings.len(), 1);
        assert!(config.effective_sdk_auth_token().is_none());
    }

    #[test]
    fn valid_token_is_effective() {
        let mut config = base_config();
        config.sdk_auth_token = Some("sfs_deadbeef_0011".to_string());
        assert!(config.validate().is_empty());
        assert_eq!(config.effective_sdk_auth_token(), Some("sfs_deadbeef_0011"));
    }
}
