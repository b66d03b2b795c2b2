//! Data model shared by the pipeline stages.
//!
//! * [`ImageAsset`]: caller-owned image bytes plus media type.
//! * [`JobDescriptor`]: what the service returns when it accepts a job.
//! * [`TransformationJob`]: the client's view of a job while it is polled.
//! * [`PollAttempt`]: one status check, kept for the final report.
//! * [`TransformOutput`]: the successful result handed back to callers.

use crate::error::TransformError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// An image selected or captured by the user.
///
/// Construction validates that the bytes are non-empty and the media type is
/// an `image/*` type, so an `ImageAsset` that exists is always submittable.
#[derive(Clone, PartialEq, Eq)]
pub struct ImageAsset {
    bytes: Vec<u8>,
    media_type: String,
    file_name: Option<String>,
}

impl fmt::Debug for ImageAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageAsset")
            .field("size", &self.bytes.len())
            .field("media_type", &self.media_type)
            .field("file_name", &self.file_name)
            .finish()
    }
}

impl ImageAsset {
    /// Wrap bytes whose media type is already known (e.g. a camera frame).
    pub fn new(
        bytes: impl Into<Vec<u8>>,
        media_type: impl Into<String>,
    ) -> Result<Self, TransformError> {
        let bytes = bytes.into();
        let media_type = media_type.into();
        if bytes.is_empty() {
            return Err(TransformError::InvalidInput {
                reason: "image is empty".into(),
            });
        }
        if !media_type.starts_with("image/") {
            return Err(TransformError::InvalidInput {
                reason: format!("expected an image/* media type, got '{media_type}'"),
            });
        }
        Ok(Self {
            bytes,
            media_type,
            file_name: None,
        })
    }

    /// Wrap bytes and detect the media type from their magic bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self, TransformError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(TransformError::InvalidInput {
                reason: "image is empty".into(),
            });
        }
        let format = image::guess_format(&bytes).map_err(|e| TransformError::InvalidInput {
            reason: format!("not a recognised image: {e}"),
        })?;
        Self::new(bytes, format.to_mime_type())
    }

    /// Read an image file from disk and detect its media type.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, TransformError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| TransformError::InvalidInput {
                reason: format!("cannot read '{}': {e}", path.display()),
            })?;

        let mut asset = Self::from_bytes(bytes)?;
        asset.file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        debug!(
            "Loaded {} ({} bytes, {})",
            path.display(),
            asset.size(),
            asset.media_type
        );
        Ok(asset)
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    /// File name used for multipart uploads.
    ///
    /// Falls back to `image.<ext>` derived from the media type.
    pub fn file_name(&self) -> String {
        if let Some(ref name) = self.file_name {
            return name.clone();
        }
        let ext = self
            .media_type
            .strip_prefix("image/")
            .map(|s| s.split(['+', ';']).next().unwrap_or(s))
            .filter(|s| !s.is_empty())
            .unwrap_or("bin");
        let ext = if ext == "jpeg" { "jpg" } else { ext };
        format!("image.{ext}")
    }
}

/// The service's answer to a successful creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    /// Opaque job identifier. Never empty once returned by the client.
    pub id: String,
    /// Initial status string (e.g. `Queued`).
    #[serde(default)]
    pub status: String,
    /// Free-text message some provider versions attach.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The client's view of one job while it is being polled.
///
/// Only polling reads change it; the client never edits status by itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformationJob {
    pub id: String,
    pub status: String,
    pub result_url: Option<String>,
}

impl From<JobDescriptor> for TransformationJob {
    fn from(d: JobDescriptor) -> Self {
        Self {
            id: d.id,
            status: d.status,
            result_url: None,
        }
    }
}

/// One status check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PollAttempt {
    /// 1-indexed attempt number.
    pub attempt: u32,
    /// Status reported by the service, or `None` when the check failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Failure description when the check did not produce a status.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Milliseconds since polling started.
    pub elapsed_ms: u64,
}

/// A finished transformation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransformOutput {
    pub job_id: String,
    /// Location of the transformed image.
    pub result_url: String,
    /// Terminal status string as reported by the service.
    pub status: String,
    /// Number of status checks issued.
    pub attempts: u32,
    /// Wall-clock time spent polling.
    pub duration_ms: u64,
    pub history: Vec<PollAttempt>,
}
