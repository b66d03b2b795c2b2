//! Status polling: bounded, strictly sequential, cancellable.
//!
//! ```text
//! Submitted ──▶ Polling ──┬──▶ Completed          (Ok(TransformOutput))
//!                 ▲   │   ├──▶ Failed             (RemoteFailure)
//!                 └───┘   ├──▶ TimedOut           (Timeout)
//!        in progress or   ├──▶ TransportAborted   (last check's own error)
//!        transient error  └──▶ Cancelled          (Cancelled)
//! ```
//!
//! One check is in flight at a time; the next one starts only after the
//! previous resolved and the fixed interval elapsed. A failed check before
//! the last attempt is reported to the progress callback and otherwise
//! ignored. A failed check on the last attempt is returned as-is instead of
//! a generic timeout.
//!
//! The cancellation token is checked before every attempt and raced against
//! the inter-attempt sleep. An in-flight check is allowed to finish.

use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::job::{PollAttempt, TransformOutput, TransformationJob};
use crate::pipeline::status::{normalize, JobOutcome, StatusResponse};
use std::time::Instant;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Issue a single `GET {base}/pipeline/run/{id}`.
pub async fn check_status(
    http: &reqwest::Client,
    config: &TransformConfig,
    job_id: &str,
) -> Result<StatusResponse, TransformError> {
    let response = http
        .get(config.status_url(job_id)?)
        .header("x-api-key", &config.api_key)
        .send()
        .await
        .map_err(|e| TransformError::Transport {
            operation: "status check",
            source: e,
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(TransformError::StatusCheckFailed {
            job_id: job_id.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let body = response
        .text()
        .await
        .map_err(|e| TransformError::Transport {
            operation: "status check",
            source: e,
        })?;

    serde_json::from_str(&body).map_err(|e| TransformError::UnexpectedResponse {
        context: "status check",
        detail: e.to_string(),
    })
}

/// Poll `job` until it reaches a terminal state, the attempt budget runs
/// out, or `cancel` fires.
///
/// At most `config.max_attempts` status checks are issued.
pub async fn poll_for_completion(
    http: &reqwest::Client,
    config: &TransformConfig,
    mut job: TransformationJob,
    cancel: &CancellationToken,
) -> Result<TransformOutput, TransformError> {
    let start = Instant::now();
    let max_attempts = config.max_attempts;
    let interval = config.poll_interval();
    let mut history: Vec<PollAttempt> = Vec::new();

    info!(
        "Polling job {} (every {}ms, at most {} checks)",
        job.id, config.poll_interval_ms, max_attempts
    );

    for attempt in 1..=max_attempts {
        if cancel.is_cancelled() {
            return Err(cancelled(&job, attempt - 1));
        }

        let result = check_status(http, config, &job.id).await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(response) => {
                history.push(PollAttempt {
                    attempt,
                    status: Some(response.status.clone()),
                    error: None,
                    elapsed_ms,
                });
                job.status = response.status.clone();
                if let Some(ref cb) = config.progress_callback {
                    cb.on_status(&response.status, attempt);
                }

                match normalize(&response) {
                    JobOutcome::Success(url) => {
                        info!(
                            "Job {} completed after {} checks ({}ms)",
                            job.id, attempt, elapsed_ms
                        );
                        if let Some(ref cb) = config.progress_callback {
                            cb.on_complete(&url, attempt);
                        }
                        job.result_url = Some(url.clone());
                        return Ok(TransformOutput {
                            job_id: job.id,
                            result_url: url,
                            status: job.status,
                            attempts: attempt,
                            duration_ms: elapsed_ms,
                            history,
                        });
                    }
                    JobOutcome::Failure { status, message } => {
                        warn!("Job {} failed remotely with status '{}'", job.id, status);
                        return Err(TransformError::RemoteFailure {
                            job_id: job.id,
                            status,
                            message,
                        });
                    }
                    JobOutcome::InProgress => {
                        debug!(
                            "Job {}: attempt {}/{} status '{}'",
                            job.id, attempt, max_attempts, job.status
                        );
                    }
                }
            }
            Err(e) => {
                let err_msg = e.to_string();
                history.push(PollAttempt {
                    attempt,
                    status: None,
                    error: Some(err_msg.clone()),
                    elapsed_ms,
                });
                if let Some(ref cb) = config.progress_callback {
                    cb.on_check_failed(attempt, &err_msg);
                }
                if attempt == max_attempts {
                    warn!("Job {}: final status check failed: {}", job.id, err_msg);
                    return Err(e);
                }
                warn!(
                    "Job {}: attempt {}/{} failed: {}",
                    job.id, attempt, max_attempts, err_msg
                );
            }
        }

        if attempt < max_attempts {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(&job, attempt)),
                _ = sleep(interval) => {}
            }
        }
    }

    warn!("Job {} still '{}' after {} checks", job.id, job.status, max_attempts);
    Err(TransformError::Timeout {
        job_id: job.id,
        attempts: max_attempts,
    })
}

fn cancelled(job: &TransformationJob, attempts: u32) -> TransformError {
    info!("Polling for job {} cancelled after {} checks", job.id, attempts);
    TransformError::Cancelled {
        job_id: job.id.clone(),
        attempts,
    }
}
