//! The layout service seam and its Document Intelligence REST client.
//!
//! ## Protocol
//!
//! 1. `POST {endpoint}/documentintelligence/documentModels/{model}:analyze?api-version=…`
//!    with a JSON body holding either `base64Source` or `urlSource`.
//!    The service answers `202 Accepted` with an `Operation-Location` header.
//! 2. `GET {Operation-Location}` until `status` is terminal. Between checks the
//!    client waits for the `Retry-After` the service sends, or
//!    [`ServiceConfig::poll_interval_ms`] when there is none.
//!
//! Status checks are not retries: a transport or HTTP error on any request
//! ends the analysis immediately.

use crate::config::{Credentials, ServiceConfig};
use crate::error::LayoutError;
use crate::pipeline::encode::encode_request;
use crate::pipeline::input::DocumentSource;
use crate::pipeline::wire::{
    AnalyzeOperation, AnalyzeRequest, AnalyzeResult, ErrorEnvelope, OperationStatus,
};
use crate::progress::ProgressCallback;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Header carrying the access key.
pub const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Header carrying the status URL of an accepted analysis.
pub const OPERATION_LOCATION_HEADER: &str = "operation-location";

/// Model used by the credential check; cheaper than layout.
pub const ACCESS_CHECK_MODEL_ID: &str = "prebuilt-read";

/// Anything that can turn a document into a raw layout result.
///
/// [`DocumentIntelligenceClient`] is the production implementation; tests and
/// embedders can inject their own through [`ServiceConfig::service`].
#[async_trait]
pub trait LayoutService: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str {
        "layout-service"
    }

    /// Analyse one document and return the service's result.
    async fn analyze(&self, source: &DocumentSource) -> Result<AnalyzeResult, LayoutError>;
}

/// REST client for the Document Intelligence analyze API.
pub struct DocumentIntelligenceClient {
    http: reqwest::Client,
    credentials: Credentials,
    model_id: String,
    api_version: String,
    poll_interval: Duration,
    max_polls: u32,
    progress: Option<ProgressCallback>,
}

impl std::fmt::Debug for DocumentIntelligenceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentIntelligenceClient")
            .field("credentials", &self.credentials)
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .field("poll_interval", &self.poll_interval)
            .field("max_polls", &self.max_polls)
            .finish()
    }
}

impl DocumentIntelligenceClient {
    /// Build a client from `config`. Fails with
    /// [`LayoutError::MissingCredentials`] before any network activity.
    pub fn new(config: &ServiceConfig) -> Result<Self, LayoutError> {
        let credentials = config.credentials()?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| LayoutError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            credentials,
            model_id: config.model_id.clone(),
            api_version: config.api_version.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
            progress: config.progress_callback.clone(),
        })
    }

    /// The analyze URL for `model_id`.
    pub fn analyze_url(&self, model_id: &str) -> String {
        analyze_url(&self.credentials.endpoint, model_id, &self.api_version)
    }

    /// Submit a document; returns the operation URL to poll.
    pub async fn submit(
        &self,
        model_id: &str,
        request: &AnalyzeRequest,
    ) -> Result<String, LayoutError> {
        let url = self.analyze_url(model_id);
        debug!("POST {}", url);

        let response = self
            .http
            .post(&url)
            .header(KEY_HEADER, &self.credentials.api_key)
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status.as_u16(), &body));
        }

        response
            .headers()
            .get(OPERATION_LOCATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or(LayoutError::MissingOperationLocation)
    }

    /// Poll `operation_url` until the analysis reaches a terminal status.
    pub async fn poll(&self, operation_url: &str) -> Result<AnalyzeResult, LayoutError> {
        for attempt in 1..=self.max_polls {
            let response = self
                .http
                .get(operation_url)
                .header(KEY_HEADER, &self.credentials.api_key)
                .send()
                .await
                .map_err(transport_error)?;

            let status = response.status();
            let wait = retry_after(response.headers()).unwrap_or(self.poll_interval);
            let body = response.text().await.map_err(transport_error)?;
            if !status.is_success() {
                return Err(status_error(status.as_u16(), &body));
            }

            let operation: AnalyzeOperation =
                serde_json::from_str(&body).map_err(|e| LayoutError::MalformedResponse {
                    detail: format!("operation status: {e}"),
                })?;

            debug!("Status check {}: {:?}", attempt, operation.status);
            if let Some(ref cb) = self.progress {
                cb.on_operation_status(attempt, status_label(operation.status));
            }

            if !operation.status.is_terminal() {
                if attempt < self.max_polls {
                    tokio::time::sleep(wait).await;
                }
                continue;
            }

            return match operation.status {
                OperationStatus::Succeeded => {
                    operation
                        .analyze_result
                        .ok_or_else(|| LayoutError::MalformedResponse {
                            detail: "operation succeeded without analyzeResult".into(),
                        })
                }
                other => {
                    let error = operation.error.unwrap_or_default();
                    let code = match error.detailed_code() {
                        "" => status_label(other).to_string(),
                        code => code.to_string(),
                    };
                    warn!("Analysis ended with status {:?}: {}", other, error.message);
                    Err(LayoutError::AnalysisFailed {
                        code,
                        message: error.message,
                    })
                }
            };
        }

        Err(LayoutError::PollLimitExceeded {
            attempts: self.max_polls,
        })
    }

    /// Submit a tiny inline document to the read model and discard the
    /// operation. Used to check that endpoint and key are accepted.
    pub async fn check_access(&self) -> Result<(), LayoutError> {
        let request = encode_request(&DocumentSource::Bytes {
            path: "access-check".into(),
            data: b"test".to_vec(),
        });
        self.submit(ACCESS_CHECK_MODEL_ID, &request).await.map(|_| ())
    }
}

#[async_trait]
impl LayoutService for DocumentIntelligenceClient {
    fn name(&self) -> &str {
        "document-intelligence"
    }

    async fn analyze(&self, source: &DocumentSource) -> Result<AnalyzeResult, LayoutError> {
        let request = encode_request(source);
        let operation_url = self.submit(&self.model_id, &request).await?;
        info!("Analysis accepted ({}), polling", self.model_id);
        self.poll(&operation_url).await
    }
}

/// Build the analyze URL from an endpoint without trailing slash.
pub fn analyze_url(endpoint: &str, model_id: &str, api_version: &str) -> String {
    format!(
        "{}/documentintelligence/documentModels/{}:analyze?api-version={}",
        endpoint.trim_end_matches('/'),
        model_id,
        api_version
    )
}

/// Map a non-success HTTP response to [`LayoutError::ServiceStatus`],
/// extracting code and message from the JSON error envelope when present.
pub fn status_error(status: u16, body: &str) -> LayoutError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => {
            let error = envelope.error;
            let mut message = error.message.clone();
            if let Some(inner) = error.innererror.as_deref() {
                if !inner.message.is_empty() {
                    message = format!("{message} ({}: {})", inner.code, inner.message);
                }
            }
            LayoutError::ServiceStatus {
                status,
                code: (!error.code.is_empty()).then_some(error.code),
                message,
            }
        }
        Err(_) => LayoutError::ServiceStatus {
            status,
            code: None,
            message: if body.trim().is_empty() {
                "<empty body>".to_string()
            } else {
                body.trim().to_string()
            },
        },
    }
}

fn transport_error(e: reqwest::Error) -> LayoutError {
    let detail = if e.is_timeout() {
        format!("request timed out: {e}")
    } else {
        e.to_string()
    };
    LayoutError::ServiceRequest { detail }
}

/// `Retry-After` in whole seconds, if present and parseable.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

fn status_label(status: OperationStatus) -> &'static str {
    match status {
        OperationStatus::NotStarted => "notStarted",
        OperationStatus::Running => "running",
        OperationStatus::Succeeded => "succeeded",
        OperationStatus::Failed => "failed",
        OperationStatus::Canceled => "canceled",
        OperationStatus::Skipped => "skipped",
        OperationStatus::Unknown => "unknown",
    }
}
