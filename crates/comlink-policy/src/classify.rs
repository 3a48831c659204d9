// SPDX-License-Identifier: MIT OR Apache-2.0
//! Failure classification (spec §4.4/§7): turn a `CoreError` into the
//! `FailoverReason` taxonomy `comlink-events` defines, reading back the
//! `[network:dns]`-style tag `comlink-http` embeds in `request_debug`.

use comlink_error::CoreError;
use comlink_events::FailoverReason;

/// Classify `error` for failover purposes.
///
/// Only HTTP-originated failures are classifiable (spec §4.4 names
/// `{network, request, http}` categories, all of which arise from the
/// HTTP engine); anything else (a Map AST defect, a Jessie expression
/// error, an input/result validation failure) is a use-case bug, not a
/// provider health signal, and returns `None`.
#[must_use]
pub fn classify_core_error(error: &CoreError) -> Option<FailoverReason> {
    match error {
        CoreError::Http {
            status_code,
            request_debug,
            ..
        } => {
            if let Some(tag) = extract_tag(request_debug) {
                if let Some(reason) = FailoverReason::from_classification_tag(tag) {
                    return Some(reason);
                }
            }
            if *status_code >= 500 {
                return Some(FailoverReason::Http5xx);
            }
            None
        }
        _ => None,
    }
}

fn extract_tag(request_debug: &str) -> Option<&str> {
    let rest = request_debug.strip_prefix('[')?;
    let (tag, _) = rest.split_once(']')?;
    Some(tag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use comlink_error::AstPath;

    #[test]
    fn classifies_embedded_network_tag() {
        let error = CoreError::Http {
            status_code: 0,
            request_debug: "[network:dns] GET http://unreachable.example".to_string(),
            response_body: None,
        };
        assert_eq!(classify_core_error(&error), Some(FailoverReason::NetworkDns));
    }

    #[test]
    fn classifies_server_error_status_without_tag() {
        let error = CoreError::Http {
            status_code: 503,
            request_debug: "GET http://host/twelve".to_string(),
            response_body: None,
        };
        assert_eq!(classify_core_error(&error), Some(FailoverReason::Http5xx));
    }

    #[test]
    fn client_errors_are_not_classified() {
        let error = CoreError::Http {
            status_code: 404,
            request_debug: "GET http://host/missing".to_string(),
            response_body: None,
        };
        assert_eq!(classify_core_error(&error), None);
    }

    #[test]
    fn non_http_errors_are_not_classified() {
        let error = CoreError::MapAst {
            message: "bad node".to_string(),
            ast_path: AstPath::root(),
            source_location: None,
        };
        assert_eq!(classify_core_error(&error), None);
    }
}
