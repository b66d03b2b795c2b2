//! Error types for the kimera-transform library.
//!
//! Every fatal outcome of a transformation is a [`TransformError`]. The
//! variants are fine-grained so diagnostics keep the HTTP status, response
//! body and job id; [`TransformError::kind`] collapses them into the flat
//! [`ErrorKind`] a UI layer switches on, and [`TransformError::user_hint`]
//! maps that onto one of four user-facing messages.
//!
//! Transient status-check failures that happen before the final polling
//! attempt never surface here. They are reported through
//! [`crate::progress::TransformProgressCallback::on_check_failed`] and the
//! loop moves on.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the kimera-transform library.
#[derive(Debug, Error)]
pub enum TransformError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Missing image, empty prompt, or content that is not an image.
    /// Raised before any network call.
    #[error("Invalid input: {reason}")]
    InvalidInput { reason: String },

    // ── Materialisation errors ────────────────────────────────────────────
    /// The image could not be encoded or uploaded. No job was created.
    #[error("Image materialisation failed{}: {reason}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    MaterializationFailed { reason: String, status: Option<u16> },

    // ── Submission errors ─────────────────────────────────────────────────
    /// HTTP 401: the API key is missing or invalid.
    #[error("Authentication failed: {detail}\nCheck your KIMERA_API_KEY.")]
    Unauthorized { detail: String },

    /// HTTP 403: the API key is valid but lacks permission.
    #[error("Permission denied: {detail}")]
    Forbidden { detail: String },

    /// HTTP 429: caller should back off before submitting again.
    #[error("Rate limit exceeded{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// Any other non-2xx response to the creation request.
    #[error("Submission failed with HTTP {status}: {body}")]
    SubmissionFailed { status: u16, body: String },

    /// No HTTP response was obtained (DNS, connect, timeout).
    #[error("Network error during {operation}: {source}\nCheck your internet connection.")]
    Transport {
        operation: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// A 2xx response whose body could not be used.
    #[error("Unexpected response from {context}: {detail}")]
    UnexpectedResponse { context: &'static str, detail: String },

    // ── Polling errors ────────────────────────────────────────────────────
    /// A status check returned non-2xx on the final polling attempt.
    #[error("Status check for job '{job_id}' failed with HTTP {status}: {body}")]
    StatusCheckFailed {
        job_id: String,
        status: u16,
        body: String,
    },

    /// The service accepted the job and later reported it failed.
    #[error("Job '{job_id}' failed remotely with status '{status}'{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    RemoteFailure {
        job_id: String,
        status: String,
        message: Option<String>,
    },

    /// The attempt budget ran out without a terminal status.
    #[error("Job '{job_id}' did not finish after {attempts} status checks")]
    Timeout { job_id: String, attempts: u32 },

    /// Polling was abandoned through the cancellation token.
    #[error("Polling for job '{job_id}' was cancelled after {attempts} status checks")]
    Cancelled { job_id: String, attempts: u32 },

    /// Cancelled before polling started, or while saving the result. A
    /// submission aborted mid-request may still have reached the service.
    #[error("Cancelled during {stage}")]
    Interrupted { stage: &'static str },

    // ── Result download errors ────────────────────────────────────────────
    /// Fetching the finished image failed.
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// Could not create or write the output image file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Flat classification of a [`TransformError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Materialization,
    Auth,
    Permission,
    RateLimit,
    Submission,
    Transport,
    /// A status check answered with an error; the job itself may be fine.
    StatusCheck,
    RemoteTerminal,
    Timeout,
    Cancelled,
    Download,
    Config,
    Internal,
}

impl TransformError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TransformError::InvalidInput { .. } => ErrorKind::Validation,
            TransformError::MaterializationFailed { .. } => ErrorKind::Materialization,
            TransformError::Unauthorized { .. } => ErrorKind::Auth,
            TransformError::Forbidden { .. } => ErrorKind::Permission,
            TransformError::RateLimited { .. } => ErrorKind::RateLimit,
            TransformError::SubmissionFailed { .. } => ErrorKind::Submission,
            TransformError::UnexpectedResponse { context, .. } => {
                if *context == "status check" {
                    ErrorKind::StatusCheck
                } else {
                    ErrorKind::Submission
                }
            }
            TransformError::StatusCheckFailed { status: 401, .. } => ErrorKind::Auth,
            TransformError::StatusCheckFailed { status: 403, .. } => ErrorKind::Permission,
            TransformError::StatusCheckFailed { .. } => ErrorKind::StatusCheck,
            TransformError::Transport { .. } => ErrorKind::Transport,
            TransformError::RemoteFailure { .. } => ErrorKind::RemoteTerminal,
            TransformError::Timeout { .. } => ErrorKind::Timeout,
            TransformError::Cancelled { .. } | TransformError::Interrupted { .. } => {
                ErrorKind::Cancelled
            }
            TransformError::DownloadFailed { .. } | TransformError::OutputWriteFailed { .. } => {
                ErrorKind::Download
            }
            TransformError::InvalidConfig(_) => ErrorKind::Config,
            TransformError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// One-line guidance for an end user.
    pub fn user_hint(&self) -> &'static str {
        match self.kind() {
            ErrorKind::Auth | ErrorKind::Permission | ErrorKind::Config => {
                "Check your credentials."
            }
            ErrorKind::Transport | ErrorKind::StatusCheck | ErrorKind::Download => {
                "Check your connection."
            }
            ErrorKind::Timeout => "This is taking too long, try again.",
            ErrorKind::RateLimit => "Too many requests, wait a moment and try again.",
            ErrorKind::Validation => "Select an image and enter a prompt.",
            ErrorKind::Cancelled => "The transformation was cancelled.",
            ErrorKind::Materialization
            | ErrorKind::Submission
            | ErrorKind::RemoteTerminal
            | ErrorKind::Internal => "The service rejected the job.",
        }
    }

    /// Whether submitting a fresh job could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Transport
                | ErrorKind::StatusCheck
                | ErrorKind::RateLimit
                | ErrorKind::Timeout
                | ErrorKind::Materialization
                | ErrorKind::RemoteTerminal
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_display_with_retry() {
        let e = TransformError::RateLimited {
            retry_after_secs: Some(30),
        };
        assert!(e.to_string().contains("retry after 30s"), "got: {e}");
    }

    #[test]
    fn rate_limit_display_without_retry() {
        let e = TransformError::RateLimited {
            retry_after_secs: None,
        };
        assert_eq!(e.to_string(), "Rate limit exceeded");
    }

    #[test]
    fn materialization_display_includes_status() {
        let e = TransformError::MaterializationFailed {
            reason: "bucket full".into(),
            status: Some(507),
        };
        let msg = e.to_string();
        assert!(msg.contains("HTTP 507"), "got: {msg}");
        assert!(msg.contains("bucket full"));
    }

    #[test]
    fn remote_failure_display() {
        let e = TransformError::RemoteFailure {
            job_id: "abc".into(),
            status: "Failed".into(),
            message: Some("NSFW".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("'abc'"));
        assert!(msg.contains("'Failed': NSFW"));
    }

    #[test]
    fn hints_distinguish_the_four_user_messages() {
        let auth = TransformError::Unauthorized {
            detail: "bad key".into(),
        };
        let rejected = TransformError::RemoteFailure {
            job_id: "j".into(),
            status: "error".into(),
            message: None,
        };
        let timeout = TransformError::Timeout {
            job_id: "j".into(),
            attempts: 60,
        };
        assert_eq!(auth.user_hint(), "Check your credentials.");
        assert_eq!(rejected.user_hint(), "The service rejected the job.");
        assert_eq!(timeout.user_hint(), "This is taking too long, try again.");
        assert_ne!(auth.user_hint(), timeout.user_hint());
    }

    #[test]
    fn auth_is_not_retryable() {
        let e = TransformError::Forbidden {
            detail: "no access".into(),
        };
        assert_eq!(e.kind(), ErrorKind::Permission);
        assert!(!e.is_retryable());
        assert!(TransformError::Timeout {
            job_id: "j".into(),
            attempts: 1
        }
        .is_retryable());
    }

    #[test]
    fn failed_status_check_points_at_the_connection() {
        let gateway = TransformError::StatusCheckFailed {
            job_id: "j".into(),
            status: 502,
            body: "bad gateway".into(),
        };
        assert_eq!(gateway.kind(), ErrorKind::StatusCheck);
        assert_eq!(gateway.user_hint(), "Check your connection.");
        assert!(gateway.is_retryable());

        let garbled = TransformError::UnexpectedResponse {
            context: "status check",
            detail: "expected value".into(),
        };
        assert_eq!(garbled.kind(), ErrorKind::StatusCheck);
    }

    #[test]
    fn status_check_auth_codes_keep_their_meaning() {
        let revoked = TransformError::StatusCheckFailed {
            job_id: "j".into(),
            status: 401,
            body: String::new(),
        };
        assert_eq!(revoked.kind(), ErrorKind::Auth);
        assert_eq!(revoked.user_hint(), "Check your credentials.");
        let unexpected_submission = TransformError::UnexpectedResponse {
            context: "job submission",
            detail: "empty id".into(),
        };
        assert_eq!(unexpected_submission.kind(), ErrorKind::Submission);
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TransformError>();
    }
}
