// SPDX-License-Identifier: MIT OR Apache-2.0
//! Client configuration: the options enumerated in spec §6, their
//! construction-time validation, and the non-fatal warnings surfaced for
//! everything short of `metricDebounceTimeMax < metricDebounceTimeMin`.

mod config;
mod token;
mod warning;

pub use config::ClientConfig;
pub use token::is_valid_sdk_auth_token;
pub use warning::{ConfigWarning, WarningSeverity};
