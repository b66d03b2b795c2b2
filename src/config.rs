//! Configuration types for image transformation jobs.
//!
//! All client behaviour is controlled through [`TransformConfig`], built via
//! its [`TransformConfigBuilder`]. The credential lives here and is handed to
//! [`crate::client::TransformClient`] at construction, so tests can point a
//! client at a fake endpoint with a fake key without touching global state.

use crate::error::TransformError;
use crate::progress::ProgressCallback;
use crate::prompts::{DEFAULT_MODEL_LABEL, DEFAULT_PIPELINE_ID};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Public Kimera API root.
pub const DEFAULT_BASE_URL: &str = "https://api.kimera.ai/v1";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "KIMERA_API_KEY";

/// Environment variable overriding [`DEFAULT_BASE_URL`].
pub const BASE_URL_ENV: &str = "KIMERA_API_BASE";

/// Configuration for a transformation client.
///
/// # Example
/// ```rust
/// use kimera_transform::{MaterializeStrategy, TransformConfig};
///
/// let config = TransformConfig::builder()
///     .api_key("sk-test")
///     .strategy(MaterializeStrategy::Upload { endpoint: None })
///     .poll_interval_ms(2_000)
///     .build()
///     .unwrap();
/// assert_eq!(config.max_attempts, 60);
/// ```
#[derive(Clone)]
pub struct TransformConfig {
    /// API key sent as `x-api-key` on every request. Never logged.
    pub api_key: String,

    /// API root, without trailing slash. Default: [`DEFAULT_BASE_URL`].
    pub base_url: String,

    /// Remote pipeline (template) identifier. Default: `4avRtmmE`.
    pub pipeline_id: String,

    /// Value of the `model_hidden` pipeline input. Default: `ChatGPT image`.
    pub model_label: String,

    /// How the image is turned into a `user_image` value. Default: inline.
    pub strategy: MaterializeStrategy,

    /// Fixed wait between status checks in milliseconds. Default: 5000.
    pub poll_interval_ms: u64,

    /// Maximum number of status checks per job. Default: 60.
    ///
    /// With the default interval this is a five-minute ceiling.
    pub max_attempts: u32,

    /// Per-request timeout in seconds. Default: 60.
    ///
    /// A status check that hits this timeout counts as a transient failure.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds. Default: 10.
    pub connect_timeout_secs: u64,

    /// Optional observer for submission and polling events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            pipeline_id: DEFAULT_PIPELINE_ID.to_string(),
            model_label: DEFAULT_MODEL_LABEL.to_string(),
            strategy: MaterializeStrategy::default(),
            poll_interval_ms: 5_000,
            max_attempts: 60,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for TransformConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransformConfig")
            .field("api_key", &if self.api_key.is_empty() { "<unset>" } else { "<redacted>" })
            .field("base_url", &self.base_url)
            .field("pipeline_id", &self.pipeline_id)
            .field("model_label", &self.model_label)
            .field("strategy", &self.strategy)
            .field("poll_interval_ms", &self.poll_interval_ms)
            .field("max_attempts", &self.max_attempts)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field(
                "progress_callback",
                &self
                    .progress_callback
                    .as_ref()
                    .map(|_| "<dyn TransformProgressCallback>"),
            )
            .finish()
    }
}

impl TransformConfig {
    /// Create a new builder for `TransformConfig`.
    pub fn builder() -> TransformConfigBuilder {
        TransformConfigBuilder {
            config: Self::default(),
        }
    }

    /// Build a config from `KIMERA_API_KEY` and, when set, `KIMERA_API_BASE`.
    pub fn from_env() -> Result<Self, TransformError> {
        let api_key = std::env::var(API_KEY_ENV).map_err(|_| {
            TransformError::InvalidConfig(format!("{API_KEY_ENV} is not set"))
        })?;

        let mut builder = Self::builder().api_key(api_key);
        if let Ok(base) = std::env::var(BASE_URL_ENV) {
            if !base.is_empty() {
                builder = builder.base_url(base);
            }
        }
        builder.build()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// `POST` target for job creation.
    pub fn run_url(&self) -> String {
        format!("{}/pipeline/run", self.base_url)
    }

    /// `GET` target for a job's status.
    ///
    /// The job id is opaque and pushed as one percent-encoded path segment.
    pub fn status_url(&self, job_id: &str) -> Result<reqwest::Url, TransformError> {
        let invalid = || {
            TransformError::InvalidConfig(format!(
                "base URL '{}' is not a valid URL",
                self.base_url
            ))
        };
        let mut url = reqwest::Url::parse(&self.run_url()).map_err(|_| invalid())?;
        url.path_segments_mut()
            .map_err(|_| invalid())?
            .pop_if_empty()
            .push(job_id);
        Ok(url)
    }

    /// `POST` target for upload-then-reference, or `None` for inline encoding.
    pub fn upload_url(&self) -> Option<String> {
        match &self.strategy {
            MaterializeStrategy::Inline => None,
            MaterializeStrategy::Upload {
                endpoint: Some(endpoint),
            } => Some(endpoint.clone()),
            MaterializeStrategy::Upload { endpoint: None } => {
                Some(format!("{}/upload", self.base_url))
            }
        }
    }
}

/// Builder for [`TransformConfig`].
#[derive(Debug)]
pub struct TransformConfigBuilder {
    config: TransformConfig,
}

impl TransformConfigBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn pipeline_id(mut self, id: impl Into<String>) -> Self {
        self.config.pipeline_id = id.into();
        self
    }

    pub fn model_label(mut self, label: impl Into<String>) -> Self {
        self.config.model_label = label.into();
        self
    }

    pub fn strategy(mut self, strategy: MaterializeStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn max_attempts(mut self, n: u32) -> Self {
        self.config.max_attempts = n;
        self
    }

    pub fn request_timeout_secs(mut self, secs: u64) -> Self {
        self.config.request_timeout_secs = secs.max(1);
        self
    }

    pub fn connect_timeout_secs(mut self, secs: u64) -> Self {
        self.config.connect_timeout_secs = secs.max(1);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<TransformConfig, TransformError> {
        let c = &self.config;
        if c.api_key.trim().is_empty() {
            return Err(TransformError::InvalidConfig(format!(
                "an API key is required (set {API_KEY_ENV} or pass --api-key)"
            )));
        }
        if !(c.base_url.starts_with("http://") || c.base_url.starts_with("https://")) {
            return Err(TransformError::InvalidConfig(format!(
                "base URL must be http:// or https://, got '{}'",
                c.base_url
            )));
        }
        if let Err(e) = reqwest::Url::parse(&c.base_url) {
            return Err(TransformError::InvalidConfig(format!(
                "base URL '{}' is not a valid URL: {e}",
                c.base_url
            )));
        }
        if c.max_attempts == 0 {
            return Err(TransformError::InvalidConfig(
                "max_attempts must be ≥ 1".into(),
            ));
        }
        if c.pipeline_id.is_empty() {
            return Err(TransformError::InvalidConfig(
                "pipeline_id must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// How a local image becomes the `user_image` pipeline input.
///
/// | Strategy | Network | `user_image` value |
/// |----------|---------|--------------------|
/// | `Inline` | none | `data:<media-type>;base64,<bytes>` |
/// | `Upload` | one `POST` (multipart) | public URL returned by the endpoint |
///
/// An upload failure is reported as
/// [`TransformError::MaterializationFailed`] and never falls back to
/// inline encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterializeStrategy {
    /// Encode the bytes as a self-contained data URI. (default)
    #[default]
    Inline,
    /// Upload to a storage endpoint and reference the returned URL.
    /// `None` uses the provider's own `{base}/upload`.
    Upload { endpoint: Option<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_provider_contract() {
        let c = TransformConfig::default();
        assert_eq!(c.base_url, "https://api.kimera.ai/v1");
        assert_eq!(c.pipeline_id, "4avRtmmE");
        assert_eq!(c.model_label, "ChatGPT image");
        assert_eq!(c.poll_interval_ms, 5_000);
        assert_eq!(c.max_attempts, 60);
        assert_eq!(c.strategy, MaterializeStrategy::Inline);
    }

    #[test]
    fn build_requires_api_key() {
        let err = TransformConfig::builder().build().unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig(_)));

        let err = TransformConfig::builder().api_key("   ").build().unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig(_)));
    }

    #[test]
    fn build_rejects_zero_attempts() {
        let err = TransformConfig::builder()
            .api_key("k")
            .max_attempts(0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("max_attempts"));
    }

    #[test]
    fn build_rejects_non_http_base() {
        let err = TransformConfig::builder()
            .api_key("k")
            .base_url("ftp://example.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig(_)));
    }

    #[test]
    fn urls_are_built_from_trimmed_base() {
        let c = TransformConfig::builder()
            .api_key("k")
            .base_url("http://localhost:8080/v1/")
            .build()
            .unwrap();
        assert_eq!(c.run_url(), "http://localhost:8080/v1/pipeline/run");
        assert_eq!(
            c.status_url("job-1").unwrap().as_str(),
            "http://localhost:8080/v1/pipeline/run/job-1"
        );
        assert_eq!(c.upload_url(), None);
    }

    #[test]
    fn status_url_encodes_job_id_as_one_segment() {
        let c = TransformConfig::builder()
            .api_key("k")
            .base_url("http://localhost:8080/v1")
            .build()
            .unwrap();
        let url = c.status_url("batch/7?x=1#frag").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/v1/pipeline/run/batch%2F7%3Fx=1%23frag"
        );
        assert_eq!(url.query(), None);
        assert_eq!(url.fragment(), None);
    }

    #[test]
    fn build_rejects_unparseable_base() {
        let err = TransformConfig::builder()
            .api_key("k")
            .base_url("http://exa mple.com")
            .build()
            .unwrap_err();
        assert!(matches!(err, TransformError::InvalidConfig(_)));
    }

    #[test]
    fn upload_url_defaults_to_provider_endpoint() {
        let c = TransformConfig::builder()
            .api_key("k")
            .strategy(MaterializeStrategy::Upload { endpoint: None })
            .build()
            .unwrap();
        assert_eq!(
            c.upload_url().as_deref(),
            Some("https://api.kimera.ai/v1/upload")
        );

        let c = TransformConfig::builder()
            .api_key("k")
            .strategy(MaterializeStrategy::Upload {
                endpoint: Some("https://storage.example.com/put".into()),
            })
            .build()
            .unwrap();
        assert_eq!(
            c.upload_url().as_deref(),
            Some("https://storage.example.com/put")
        );
    }

    #[test]
    fn debug_redacts_api_key() {
        let c = TransformConfig::builder()
            .api_key("super-secret")
            .build()
            .unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("super-secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
