//! Credential check: is the configured endpoint reachable and the key accepted?
//!
//! The check submits a four-byte inline document to the read model. The
//! service rejects that content with `InvalidRequest`, which can only happen
//! after authentication succeeded, so that rejection counts as success.

use crate::config::ServiceConfig;
use crate::error::LayoutError;
use crate::pipeline::service::DocumentIntelligenceClient;
use serde::Serialize;
use tracing::{debug, info};

pub const CONNECTED_MESSAGE: &str = "Successfully connected to Azure Document Intelligence service";

/// Outcome of [`verify_credentials`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CredentialCheck {
    pub ok: bool,
    pub message: String,
}

impl CredentialCheck {
    fn passed() -> Self {
        Self {
            ok: true,
            message: CONNECTED_MESSAGE.to_string(),
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Check the endpoint and key in `config` against the live service.
///
/// Never returns an error: every failure is folded into a `CredentialCheck`
/// with `ok == false` and a human-readable message.
pub async fn verify_credentials(config: &ServiceConfig) -> CredentialCheck {
    if let Some(check) = missing_settings(config) {
        return check;
    }

    let client = match DocumentIntelligenceClient::new(config) {
        Ok(c) => c,
        Err(e) => return CredentialCheck::failed(format!("Unexpected error: {e}")),
    };

    debug!(
        "Checking access at {}",
        client.analyze_url(crate::pipeline::service::ACCESS_CHECK_MODEL_ID)
    );
    let check = interpret_access_check(client.check_access().await);
    info!("Credential check: {}", check.message);
    check
}

/// Blocking wrapper around [`verify_credentials`].
pub fn verify_credentials_sync(config: &ServiceConfig) -> Result<CredentialCheck, LayoutError> {
    let rt = tokio::runtime::Runtime::new()
        .map_err(|e| LayoutError::Internal(format!("Failed to create tokio runtime: {}", e)))?;
    Ok(rt.block_on(verify_credentials(config)))
}

fn missing_settings(config: &ServiceConfig) -> Option<CredentialCheck> {
    let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());
    match (set(&config.endpoint), set(&config.api_key)) {
        (false, false) => Some(CredentialCheck::failed(
            "Missing Azure credentials in environment variables",
        )),
        (false, true) => Some(CredentialCheck::failed(
            "Missing Azure endpoint in environment variables",
        )),
        (true, false) => Some(CredentialCheck::failed(
            "Missing Azure key in environment variables",
        )),
        (true, true) => None,
    }
}

/// Map the access check's outcome to a verdict.
pub fn interpret_access_check(result: Result<(), LayoutError>) -> CredentialCheck {
    match result {
        Ok(()) => CredentialCheck::passed(),
        Err(LayoutError::ServiceStatus { status: 404, .. }) => {
            CredentialCheck::failed("Invalid endpoint URL")
        }
        Err(e @ LayoutError::ServiceStatus { .. }) => {
            if e.to_string().contains("InvalidRequest") {
                CredentialCheck::passed()
            } else {
                CredentialCheck::failed(format!("Invalid credentials or service error: {e}"))
            }
        }
        Err(e) => CredentialCheck::failed(format!("Unexpected error: {e}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(status: u16, code: Option<&str>, message: &str) -> LayoutError {
        LayoutError::ServiceStatus {
            status,
            code: code.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[tokio::test]
    async fn missing_both_settings() {
        let check = verify_credentials(&ServiceConfig::default()).await;
        assert!(!check.ok);
        assert_eq!(check.message, "Missing Azure credentials in environment variables");
    }

    #[tokio::test]
    async fn missing_endpoint_only() {
        let config = ServiceConfig {
            api_key: Some("k".into()),
            ..ServiceConfig::default()
        };
        let check = verify_credentials(&config).await;
        assert_eq!(check.message, "Missing Azure endpoint in environment variables");
    }

    #[tokio::test]
    async fn missing_key_only() {
        let config = ServiceConfig {
            endpoint: Some("https://x.example.com".into()),
            api_key: Some("  ".into()),
            ..ServiceConfig::default()
        };
        let check = verify_credentials(&config).await;
        assert_eq!(check.message, "Missing Azure key in environment variables");
    }

    #[test]
    fn accepted_submission_passes() {
        assert_eq!(interpret_access_check(Ok(())), CredentialCheck::passed());
    }

    #[test]
    fn invalid_request_rejection_passes() {
        let check = interpret_access_check(Err(status(400, Some("InvalidRequest"), "Invalid request.")));
        assert!(check.ok);
        assert_eq!(check.message, CONNECTED_MESSAGE);
    }

    #[test]
    fn not_found_means_bad_endpoint() {
        let check = interpret_access_check(Err(status(404, None, "Resource not found")));
        assert_eq!(check, CredentialCheck::failed("Invalid endpoint URL"));
    }

    #[test]
    fn unauthorized_is_reported() {
        let check = interpret_access_check(Err(status(401, Some("401"), "Access denied")));
        assert!(!check.ok);
        assert!(check.message.starts_with("Invalid credentials or service error:"));
        assert!(check.message.contains("Access denied"));
    }

    #[test]
    fn transport_failure_is_unexpected() {
        let check = interpret_access_check(Err(LayoutError::ServiceRequest {
            detail: "dns error: failed to lookup address".into(),
        }));
        assert!(!check.ok);
        assert!(check.message.starts_with("Unexpected error:"));
    }
}
