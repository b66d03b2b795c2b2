//! Status normalisation: provider JSON → [`JobOutcome`].
//!
//! Provider versions disagree on vocabulary and shape:
//!
//! | Aspect | Observed forms |
//! |--------|----------------|
//! | success | `Completed`, `completed`, `Succeeded`, `succeeded` |
//! | failure | `Failed`, `failed`, `Error`, `error` |
//! | result  | `output.output_image`, flat `result` |
//!
//! Matching is case-sensitive against the known synonyms. Any other status,
//! and a success status without a usable result, is [`JobOutcome::InProgress`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Statuses that mean the job finished successfully.
pub const SUCCESS_STATUSES: &[&str] = &["Completed", "completed", "Succeeded", "succeeded"];

/// Statuses that mean the job failed remotely.
pub const FAILURE_STATUSES: &[&str] = &["Failed", "failed", "Error", "error"];

/// Body of `GET {base}/pipeline/run/{id}`.
///
/// A missing, `null` or non-string `status` reads as `""`, which normalises
/// to [`JobOutcome::InProgress`] like any other unknown status.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatusResponse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "lenient_message")]
    pub message: Option<String>,
    #[serde(default)]
    pub output: Option<Value>,
    #[serde(default)]
    pub result: Option<Value>,
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_message<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

/// Provider-agnostic reading of one status response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// Finished; carries the result image reference.
    Success(String),
    /// The service reports the job failed.
    Failure {
        status: String,
        message: Option<String>,
    },
    /// Anything else. Keep polling.
    InProgress,
}

impl JobOutcome {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobOutcome::InProgress)
    }
}

pub fn normalize(response: &StatusResponse) -> JobOutcome {
    let status = response.status.as_str();

    if FAILURE_STATUSES.contains(&status) {
        return JobOutcome::Failure {
            status: status.to_string(),
            message: response.message.clone().filter(|m| !m.is_empty()),
        };
    }

    if SUCCESS_STATUSES.contains(&status) {
        if let Some(url) = result_reference(response) {
            return JobOutcome::Success(url);
        }
    }

    JobOutcome::InProgress
}

/// The result image reference, from whichever shape the provider used.
///
/// `output.output_image` wins over `result` when both are present.
pub fn result_reference(response: &StatusResponse) -> Option<String> {
    let nested = response
        .output
        .as_ref()
        .and_then(|o| o.get("output_image"))
        .and_then(Value::as_str);
    let flat = response.result.as_ref().and_then(Value::as_str);

    nested
        .into_iter()
        .chain(flat)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> StatusResponse {
        serde_json::from_str(json).expect("valid status json")
    }

    #[test]
    fn nested_output_shape_succeeds() {
        let r = parse(r#"{"status":"Completed","output":{"output_image":"https://cdn/x.png"}}"#);
        assert_eq!(normalize(&r), JobOutcome::Success("https://cdn/x.png".into()));
    }

    #[test]
    fn flat_result_shape_succeeds() {
        let r = parse(r#"{"status":"completed","result":"https://cdn/y.png"}"#);
        assert_eq!(normalize(&r), JobOutcome::Success("https://cdn/y.png".into()));
    }

    #[test]
    fn nested_shape_preferred_over_flat() {
        let r = parse(
            r#"{"status":"Completed","output":{"output_image":"https://a"},"result":"https://b"}"#,
        );
        assert_eq!(result_reference(&r).as_deref(), Some("https://a"));
    }

    #[test]
    fn completed_without_result_keeps_polling() {
        let r = parse(r#"{"status":"Completed","output":{}}"#);
        assert_eq!(normalize(&r), JobOutcome::InProgress);
        let r = parse(r#"{"status":"completed","result":""}"#);
        assert_eq!(normalize(&r), JobOutcome::InProgress);
    }

    #[test]
    fn failure_synonyms_are_terminal() {
        for s in ["Failed", "failed", "Error", "error"] {
            let r = parse(&format!(r#"{{"status":"{s}","message":"boom"}}"#));
            assert_eq!(
                normalize(&r),
                JobOutcome::Failure {
                    status: s.into(),
                    message: Some("boom".into())
                }
            );
        }
    }

    #[test]
    fn matching_is_case_sensitive() {
        for s in ["FAILED", "COMPLETED", "ERROR"] {
            let r = parse(&format!(r#"{{"status":"{s}","result":"https://x"}}"#));
            assert_eq!(normalize(&r), JobOutcome::InProgress, "{s}");
        }
    }

    #[test]
    fn unknown_status_is_in_progress() {
        for s in ["Processing", "Queued", "running", "Cancelled", ""] {
            let r = parse(&format!(r#"{{"status":"{s}"}}"#));
            assert!(!normalize(&r).is_terminal(), "{s}");
        }
    }

    #[test]
    fn null_or_non_string_status_is_in_progress() {
        for body in [
            r#"{"status":null}"#,
            r#"{"status":3}"#,
            r#"{"status":{"x":1},"message":null}"#,
        ] {
            let r = parse(body);
            assert_eq!(r.status, "", "{body}");
            assert_eq!(normalize(&r), JobOutcome::InProgress, "{body}");
        }
    }

    #[test]
    fn non_string_failure_message_is_dropped() {
        let r = parse(r#"{"status":"Failed","message":{"code":7}}"#);
        assert_eq!(
            normalize(&r),
            JobOutcome::Failure {
                status: "Failed".into(),
                message: None
            }
        );
    }

    #[test]
    fn missing_status_field_is_in_progress() {
        let r = parse(r#"{"id":"abc"}"#);
        assert_eq!(normalize(&r), JobOutcome::InProgress);
    }
}
