//! Image materialisation: `ImageAsset` → value for the `user_image` input.
//!
//! Two strategies, chosen by [`MaterializeStrategy`] in the config:
//!
//! * **Inline**: `data:<media-type>;base64,<payload>`. Pure, no network.
//!   Payload size is not checked locally; an oversized body surfaces as a
//!   submission error.
//! * **Upload**: multipart `POST` of the bytes to a storage endpoint, which
//!   answers with a public URL under `url`, `file_url` or `image_url`.
//!
//! Every upload failure becomes [`TransformError::MaterializationFailed`]
//! and no job is created. The upload never falls back to inline encoding.

use crate::config::{MaterializeStrategy, TransformConfig};
use crate::error::TransformError;
use crate::job::ImageAsset;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, info};

/// Response keys that may carry the uploaded file's URL, in priority order.
const UPLOAD_URL_KEYS: [&str; 3] = ["url", "file_url", "image_url"];

/// Encode an image as a self-contained data URI.
///
/// Deterministic: the same asset always yields the same string.
pub fn encode_inline(asset: &ImageAsset) -> String {
    let b64 = STANDARD.encode(asset.bytes());
    debug!(
        "Encoded {} bytes → {} bytes base64 ({})",
        asset.size(),
        b64.len(),
        asset.media_type()
    );
    format!("data:{};base64,{}", asset.media_type(), b64)
}

/// Produce the `user_image` value for `asset` using the configured strategy.
pub async fn materialize(
    http: &reqwest::Client,
    config: &TransformConfig,
    asset: &ImageAsset,
) -> Result<String, TransformError> {
    match config.upload_url() {
        None => Ok(encode_inline(asset)),
        Some(url) => {
            if let Some(ref cb) = config.progress_callback {
                cb.on_upload_start(asset.size());
            }
            // The credential only goes to the provider's own upload route.
            let api_key = match config.strategy {
                MaterializeStrategy::Upload { endpoint: None } => Some(config.api_key.as_str()),
                _ => None,
            };
            upload(http, &url, api_key, asset).await
        }
    }
}

/// Upload `asset` as a multipart `file` part and return the public URL.
///
/// `api_key` is sent as `x-api-key` when present.
pub async fn upload(
    http: &reqwest::Client,
    url: &str,
    api_key: Option<&str>,
    asset: &ImageAsset,
) -> Result<String, TransformError> {
    info!("Uploading {} bytes to {}", asset.size(), url);

    let part = Part::bytes(asset.bytes().to_vec())
        .file_name(asset.file_name())
        .mime_str(asset.media_type())
        .map_err(|e| TransformError::MaterializationFailed {
            reason: format!("invalid media type '{}': {e}", asset.media_type()),
            status: None,
        })?;
    let form = Form::new().part("file", part);

    let mut request = http.post(url).multipart(form);
    if let Some(key) = api_key {
        request = request.header("x-api-key", key);
    }
    let response = request
        .send()
        .await
        .map_err(|e| TransformError::MaterializationFailed {
            reason: format!("upload request failed: {e}"),
            status: None,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransformError::MaterializationFailed {
            reason: if body.is_empty() {
                "upload rejected".to_string()
            } else {
                format!("upload rejected: {body}")
            },
            status: Some(status.as_u16()),
        });
    }

    let body: Value = response
        .json()
        .await
        .map_err(|e| TransformError::MaterializationFailed {
            reason: format!("upload response is not JSON: {e}"),
            status: Some(status.as_u16()),
        })?;

    let uploaded = extract_upload_url(&body).ok_or_else(|| {
        TransformError::MaterializationFailed {
            reason: format!(
                "upload response has none of {}",
                UPLOAD_URL_KEYS.join(", ")
            ),
            status: Some(status.as_u16()),
        }
    })?;

    info!("Uploaded image → {}", uploaded);
    Ok(uploaded)
}

/// First non-empty string among `url`, `file_url`, `image_url`.
pub fn extract_upload_url(body: &Value) -> Option<String> {
    UPLOAD_URL_KEYS
        .iter()
        .filter_map(|k| body.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Human-readable name of the active strategy, for logs.
pub fn strategy_name(strategy: &MaterializeStrategy) -> &'static str {
    match strategy {
        MaterializeStrategy::Inline => "inline",
        MaterializeStrategy::Upload { .. } => "upload",
    }
}
