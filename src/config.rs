//! Configuration types for layout analysis and overlay rendering.
//!
//! Configuration is an explicit value handed to constructors. The only place
//! that reads the process environment is [`ServiceConfig::from_env`]; every
//! other component receives what it needs through these structs, and
//! credentials are validated once, when the service client is built.

use crate::error::LayoutError;
use crate::pipeline::service::LayoutService;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Environment variable holding the service endpoint URL.
pub const ENDPOINT_ENV: &str = "AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT";

/// Environment variable holding the service access key.
pub const KEY_ENV: &str = "AZURE_DOCUMENT_INTELLIGENCE_KEY";

/// Environment variable pointing at a pdfium library (file or directory).
pub const PDFIUM_LIB_ENV: &str = "PDFIUM_LIB_PATH";

/// Model used for layout analysis.
pub const DEFAULT_MODEL_ID: &str = "prebuilt-layout";

/// REST API version of the analyze endpoint.
pub const DEFAULT_API_VERSION: &str = "2024-11-30";

/// Settings for the remote layout-analysis service.
///
/// Built via [`ServiceConfig::builder()`], [`ServiceConfig::from_env()`] or
/// [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use edgequake_layout::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .endpoint("https://my-resource.cognitiveservices.azure.com")
///     .api_key("secret")
///     .poll_interval_ms(500)
///     .build()
///     .unwrap();
/// assert_eq!(config.model_id, "prebuilt-layout");
/// ```
#[derive(Clone)]
pub struct ServiceConfig {
    /// Resource endpoint, e.g. `https://<name>.cognitiveservices.azure.com`.
    pub endpoint: Option<String>,

    /// Access key sent as `Ocp-Apim-Subscription-Key`.
    pub api_key: Option<String>,

    /// Analysis model. Default: `prebuilt-layout`.
    pub model_id: String,

    /// REST API version. Default: `2024-11-30`.
    pub api_version: String,

    /// Delay between status checks when the service sends no `Retry-After`.
    /// Default: 1000.
    pub poll_interval_ms: u64,

    /// Status checks before giving up on a running operation. Default: 120.
    pub max_polls: u32,

    /// Timeout for each individual HTTP request in seconds. Default: 120.
    pub request_timeout_secs: u64,

    /// Pre-constructed service. Takes precedence over endpoint and key.
    pub service: Option<Arc<dyn LayoutService>>,

    /// Receives submission and polling events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model_id: DEFAULT_MODEL_ID.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            poll_interval_ms: 1000,
            max_polls: 120,
            request_timeout_secs: 120,
            service: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model_id", &self.model_id)
            .field("api_version", &self.api_version)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_polls", &self.max_polls)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("service", &self.service.as_ref().map(|_| "<dyn LayoutService>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn AnalysisProgressCallback>"),
            )
            .finish()
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults plus endpoint and key from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Defaults plus endpoint and key from `lookup`. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            endpoint: read(ENDPOINT_ENV),
            api_key: read(KEY_ENV),
            ..Self::default()
        }
    }

    /// Endpoint and key, or an error naming every missing setting.
    pub fn credentials(&self) -> Result<Credentials, LayoutError> {
        let endpoint = self.endpoint.as_deref().filter(|v| !v.trim().is_empty());
        let api_key = self.api_key.as_deref().filter(|v| !v.trim().is_empty());

        match (endpoint, api_key) {
            (Some(endpoint), Some(key)) => Ok(Credentials {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                api_key: key.to_string(),
            }),
            (endpoint, key) => {
                let missing: Vec<&str> = [
                    endpoint.is_none().then_some(ENDPOINT_ENV),
                    key.is_none().then_some(KEY_ENV),
                ]
                .into_iter()
                .flatten()
                .collect();
                Err(LayoutError::MissingCredentials {
                    missing: missing.join(" and "),
                    hint: "Export them in the environment or pass --endpoint / --key.".into(),
                })
            }
        }
    }
}

/// Validated endpoint and key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Without a trailing slash.
    pub endpoint: String,
    pub api_key: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
}

impl ServiceConfigBuilder {
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn model_id(mut self, model: impl Into<String>) -> Self {
        self.config.model_id = model.into();
        self
    }

    pub fn api_version(mut self, version: impl Into<String>) -> Self {
        self.config.api_version = version.into();
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_polls(mut self, n: u32) -> Self {
        self.config.max_polls = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs;
        self
    }

    pub fn service(mut self, service: Arc<dyn LayoutService>) -> Self {
        self.config.service = Some(service);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// Credentials are not checked here; they are checked when a client is
    /// constructed, so a config can be built before the environment is known.
    pub fn build(self) -> Result<ServiceConfig, LayoutError> {
        let c = &self.config;
        if c.model_id.trim().is_empty() {
            return Err(LayoutError::InvalidConfig("model id must not be empty".into()));
        }
        if c.api_version.trim().is_empty() {
            return Err(LayoutError::InvalidConfig("API version must not be empty".into()));
        }
        if c.max_polls == 0 {
            return Err(LayoutError::InvalidConfig("max polls must be ≥ 1".into()));
        }
        if c.request_timeout_secs == 0 {
            return Err(LayoutError::InvalidConfig(
                "request timeout must be ≥ 1 second".into(),
            ));
        }
        if let Some(endpoint) = c.endpoint.as_deref() {
            if !endpoint.trim().is_empty()
                && !(endpoint.starts_with("https://") || endpoint.starts_with("http://"))
            {
                return Err(LayoutError::InvalidConfig(format!(
                    "endpoint must be an http(s) URL, got '{endpoint}'"
                )));
            }
        }
        Ok(self.config)
    }
}

/// Settings for the overlay renderer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OverlayConfig {
    /// pdfium library file, or a directory containing it. When `None`,
    /// `./` and then the system library search path are tried.
    pub pdfium_lib_path: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,
}

impl OverlayConfig {
    pub fn builder() -> OverlayConfigBuilder {
        OverlayConfigBuilder {
            config: Self::default(),
        }
    }

    /// Defaults plus `PDFIUM_LIB_PATH` from the process environment.
    pub fn from_env() -> Self {
        Self {
            pdfium_lib_path: std::env::var_os(PDFIUM_LIB_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            password: None,
        }
    }
}

/// Builder for [`OverlayConfig`].
#[derive(Debug)]
pub struct OverlayConfigBuilder {
    config: OverlayConfig,
}

impl OverlayConfigBuilder {
    pub fn pdfium_lib_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pdfium_lib_path = Some(path.into());
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn build(self) -> OverlayConfig {
        self.config
    }
}
