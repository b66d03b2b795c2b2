//! Job submission: one `POST {base}/pipeline/run` per transformation.
//!
//! ```text
//! { "pipeline_id": "<template>",
//!   "inputs": { "model_hidden": "<label>",
//!               "gen_text":     "<prompt>",
//!               "user_image":   "<data-URI or URL>" } }
//! ```
//!
//! Non-2xx answers are classified by status code so the caller can tell a
//! bad key (401) from a missing permission (403), a quota hit (429) and
//! everything else. Submission is never retried here.

use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::job::JobDescriptor;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info};

/// Body of the creation request.
#[derive(Debug, Serialize)]
pub struct RunRequest<'a> {
    pub pipeline_id: &'a str,
    pub inputs: RunInputs<'a>,
}

#[derive(Debug, Serialize)]
pub struct RunInputs<'a> {
    pub model_hidden: &'a str,
    pub gen_text: &'a str,
    pub user_image: &'a str,
}

pub fn build_request<'a>(
    config: &'a TransformConfig,
    prompt: &'a str,
    user_image: &'a str,
) -> RunRequest<'a> {
    RunRequest {
        pipeline_id: &config.pipeline_id,
        inputs: RunInputs {
            model_hidden: &config.model_label,
            gen_text: prompt,
            user_image,
        },
    }
}

/// Send the creation request and return the accepted job.
///
/// # Errors
/// * `Unauthorized` / `Forbidden` / `RateLimited` for 401 / 403 / 429
/// * `SubmissionFailed` for any other non-2xx
/// * `Transport` when no response was received
/// * `UnexpectedResponse` when a 2xx body has no usable `id`
pub async fn submit(
    http: &reqwest::Client,
    config: &TransformConfig,
    prompt: &str,
    user_image: &str,
) -> Result<JobDescriptor, TransformError> {
    let request = build_request(config, prompt, user_image);
    debug!(
        "Submitting to pipeline {} (prompt {} chars, image {} chars)",
        config.pipeline_id,
        prompt.len(),
        user_image.len()
    );

    let response = http
        .post(config.run_url())
        .header("x-api-key", &config.api_key)
        .json(&request)
        .send()
        .await
        .map_err(|e| TransformError::Transport {
            operation: "job submission",
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        let retry_after = parse_retry_after(response.headers());
        let body = response.text().await.unwrap_or_default();
        return Err(classify_rejection(status, retry_after, body));
    }

    let body = response
        .text()
        .await
        .map_err(|e| TransformError::Transport {
            operation: "job submission",
            source: e,
        })?;
    let job = parse_descriptor(&body)?;

    info!("Job {} accepted (status '{}')", job.id, job.status);
    Ok(job)
}

/// Parse a 2xx creation body, insisting on a non-empty `id`.
pub fn parse_descriptor(body: &str) -> Result<JobDescriptor, TransformError> {
    let job: JobDescriptor =
        serde_json::from_str(body).map_err(|e| TransformError::UnexpectedResponse {
            context: "job submission",
            detail: format!("{e}: {}", truncate(body, 200)),
        })?;
    if job.id.trim().is_empty() {
        return Err(TransformError::UnexpectedResponse {
            context: "job submission",
            detail: "response carries an empty job id".into(),
        });
    }
    Ok(job)
}

/// Map a non-2xx creation response onto the error taxonomy.
pub fn classify_rejection(
    status: StatusCode,
    retry_after_secs: Option<u64>,
    body: String,
) -> TransformError {
    match status {
        StatusCode::UNAUTHORIZED => TransformError::Unauthorized {
            detail: non_empty_or(body, "invalid or missing API key"),
        },
        StatusCode::FORBIDDEN => TransformError::Forbidden {
            detail: non_empty_or(body, "API key lacks permission for this pipeline"),
        },
        StatusCode::TOO_MANY_REQUESTS => TransformError::RateLimited { retry_after_secs },
        other => TransformError::SubmissionFailed {
            status: other.as_u16(),
            body,
        },
    }
}

/// `Retry-After` in seconds, when the header is a plain integer.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
}

fn non_empty_or(body: String, fallback: &str) -> String {
    if body.trim().is_empty() {
        fallback.to_string()
    } else {
        body
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    fn config() -> TransformConfig {
        TransformConfig::builder().api_key("k").build().unwrap()
    }

    #[test]
    fn request_body_shape() {
        let c = config();
        let req = build_request(&c, "a knight", "data:image/png;base64,AAAA");
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(v["pipeline_id"], "4avRtmmE");
        assert_eq!(v["inputs"]["model_hidden"], "ChatGPT image");
        assert_eq!(v["inputs"]["gen_text"], "a knight");
        assert_eq!(v["inputs"]["user_image"], "data:image/png;base64,AAAA");
    }

    #[test]
    fn classify_auth_codes() {
        assert!(matches!(
            classify_rejection(StatusCode::UNAUTHORIZED, None, String::new()),
            TransformError::Unauthorized { .. }
        ));
        assert!(matches!(
            classify_rejection(StatusCode::FORBIDDEN, None, "nope".into()),
            TransformError::Forbidden { ref detail } if detail == "nope"
        ));
    }

    #[test]
    fn classify_rate_limit_keeps_retry_after() {
        match classify_rejection(StatusCode::TOO_MANY_REQUESTS, Some(12), String::new()) {
            TransformError::RateLimited { retry_after_secs } => {
                assert_eq!(retry_after_secs, Some(12))
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn classify_other_keeps_status_and_body() {
        match classify_rejection(StatusCode::BAD_REQUEST, None, "bad prompt".into()) {
            TransformError::SubmissionFailed { status, body } => {
                assert_eq!(status, 400);
                assert_eq!(body, "bad prompt");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn retry_after_only_accepts_seconds() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(parse_retry_after(&headers), Some(30));
        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn descriptor_requires_id() {
        assert!(parse_descriptor(r#"{"id":"j1","status":"Queued"}"#).is_ok());
        assert!(matches!(
            parse_descriptor(r#"{"id":"","status":"Queued"}"#),
            Err(TransformError::UnexpectedResponse { .. })
        ));
        assert!(matches!(
            parse_descriptor("<html>gateway</html>"),
            Err(TransformError::UnexpectedResponse { .. })
        ));
    }
}
