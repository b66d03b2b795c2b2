//! One-call entry points.
//!
//! [`transform`] loads an image from disk, runs the whole job and returns the
//! result reference. [`transform_to_file`] additionally downloads the result.
//! Use [`crate::client::TransformClient`] directly when you already hold the
//! bytes, need cancellation, or want to drive the stages yourself.

use crate::client::TransformClient;
use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::job::{ImageAsset, TransformOutput};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Transform the image at `image_path` according to `prompt`.
///
/// # Errors
/// Any [`TransformError`]; see [`TransformError::kind`] for the categories.
pub async fn transform(
    image_path: impl AsRef<Path>,
    prompt: &str,
    config: &TransformConfig,
) -> Result<TransformOutput, TransformError> {
    let asset = ImageAsset::from_path(image_path).await?;
    let client = TransformClient::new(config.clone())?;
    client.run(&asset, prompt).await
}

/// Synchronous wrapper around [`transform`].
///
/// Creates a temporary tokio runtime internally.
pub fn transform_sync(
    image_path: impl AsRef<Path>,
    prompt: &str,
    config: &TransformConfig,
) -> Result<TransformOutput, TransformError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| TransformError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(transform(image_path, prompt, config))
}

/// Transform an image and save the result to `output_path`.
pub async fn transform_to_file(
    image_path: impl AsRef<Path>,
    prompt: &str,
    output_path: impl AsRef<Path>,
    config: &TransformConfig,
) -> Result<TransformOutput, TransformError> {
    let asset = ImageAsset::from_path(image_path).await?;
    let client = TransformClient::new(config.clone())?;
    let output = client.run(&asset, prompt).await?;
    client
        .download_result(&output.result_url, output_path)
        .await?;
    Ok(output)
}

/// `ai-transformed-<unix-millis>.jpg`, the default name for a saved result.
pub fn default_output_name() -> PathBuf {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    PathBuf::from(format!("ai-transformed-{millis}.jpg"))
}

/// Save a result reference (HTTP(S) URL or `data:` URI) to `path`.
///
/// Writes to a sibling `.tmp` file and renames it into place so a failed
/// download never leaves a truncated image behind. Returns the byte count.
///
/// The timeouts of `http` bound the download;
/// [`TransformClient::download_result`] uses the configured ones.
pub async fn download_result(
    http: &reqwest::Client,
    reference: &str,
    path: impl AsRef<Path>,
) -> Result<u64, TransformError> {
    download_result_with_cancel(http, reference, path, &CancellationToken::new()).await
}

/// [`download_result`] that stops with [`TransformError::Interrupted`] when
/// `cancel` fires. The temporary file is removed.
pub async fn download_result_with_cancel(
    http: &reqwest::Client,
    reference: &str,
    path: impl AsRef<Path>,
    cancel: &CancellationToken,
) -> Result<u64, TransformError> {
    const STAGE: &str = "result download";
    let path = path.as_ref();
    let write_err = |source: std::io::Error| TransformError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    let download_err = |reason: String| TransformError::DownloadFailed {
        url: reference.to_string(),
        reason,
    };

    let source = if reference.starts_with("data:") {
        ResultSource::Inline(decode_data_uri(reference)?)
    } else {
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(TransformError::Interrupted { stage: STAGE }),
            res = http.get(reference).send() => res.map_err(|e| download_err(e.to_string()))?,
        };
        if !response.status().is_success() {
            return Err(download_err(format!("HTTP {}", response.status())));
        }
        ResultSource::Remote(response)
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = tmp_path_for(path);
    let result: Result<u64, TransformError> = async {
        let mut file = tokio::fs::File::create(&tmp_path)
            .await
            .map_err(write_err)?;
        let written = match source {
            ResultSource::Inline(bytes) => {
                file.write_all(&bytes).await.map_err(write_err)?;
                bytes.len() as u64
            }
            ResultSource::Remote(response) => {
                let mut stream = response.bytes_stream();
                let mut written = 0u64;
                loop {
                    let next = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => {
                            return Err(TransformError::Interrupted { stage: STAGE })
                        }
                        next = stream.next() => next,
                    };
                    let Some(chunk) = next else { break };
                    let chunk = chunk.map_err(|e| download_err(e.to_string()))?;
                    file.write_all(&chunk).await.map_err(write_err)?;
                    written += chunk.len() as u64;
                }
                written
            }
        };
        file.flush().await.map_err(write_err)?;
        drop(file);
        tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;
        Ok(written)
    }
    .await;

    let written = match result {
        Ok(n) => n,
        Err(e) => {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(e);
        }
    };

    info!("Saved {} bytes → {}", written, path.display());
    Ok(written)
}

enum ResultSource {
    Inline(Vec<u8>),
    Remote(reqwest::Response),
}

/// Decode a base64 `data:` URI into raw bytes.
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, TransformError> {
    let invalid = |reason: &str| TransformError::DownloadFailed {
        url: truncate_uri(uri),
        reason: reason.to_string(),
    };

    let rest = uri
        .strip_prefix("data:")
        .ok_or_else(|| invalid("not a data URI"))?;
    let (meta, payload) = rest
        .split_once(',')
        .ok_or_else(|| invalid("data URI has no payload"))?;
    if !meta.ends_with(";base64") {
        return Err(invalid("only base64 data URIs are supported"));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| invalid(&format!("invalid base64 payload: {e}")))
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "result".into());
    name.push(".tmp");
    path.with_file_name(name)
}

fn truncate_uri(uri: &str) -> String {
    match uri.char_indices().nth(48) {
        Some((idx, _)) => format!("{}…", &uri[..idx]),
        None => uri.to_string(),
    }
}
