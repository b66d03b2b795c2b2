//! Progress-callback trait for submission and polling events.
//!
//! Inject an [`Arc<dyn TransformProgressCallback>`] via
//! [`crate::config::TransformConfigBuilder::progress_callback`] to follow a
//! job without polling it yourself. The polling loop calls
//! [`on_status`](TransformProgressCallback::on_status) after every check that
//! produced a status and
//! [`on_check_failed`](TransformProgressCallback::on_check_failed) after every
//! check that did not; both carry the 1-indexed attempt number.
//!
//! # Example
//!
//! ```rust
//! use kimera_transform::{TransformConfig, TransformProgressCallback};
//! use std::sync::{Arc, Mutex};
//!
//! struct StatusLog {
//!     seen: Mutex<Vec<String>>,
//! }
//!
//! impl TransformProgressCallback for StatusLog {
//!     fn on_status(&self, status: &str, attempt: u32) {
//!         self.seen.lock().unwrap().push(format!("{attempt}:{status}"));
//!     }
//! }
//!
//! let log = Arc::new(StatusLog { seen: Mutex::new(Vec::new()) });
//!
//! let config = TransformConfig::builder()
//!     .api_key("sk-test")
//!     .progress_callback(log as Arc<dyn TransformProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::job::JobDescriptor;
use std::sync::Arc;

/// Called by the client as a transformation moves through its stages.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. Calls for one job are strictly sequential.
pub trait TransformProgressCallback: Send + Sync {
    /// Called before the image is uploaded (upload strategy only).
    ///
    /// # Arguments
    /// * `size_bytes`: raw image size
    fn on_upload_start(&self, size_bytes: usize) {
        let _ = size_bytes;
    }

    /// Called once the service has accepted the job.
    fn on_submitted(&self, job: &JobDescriptor) {
        let _ = job;
    }

    /// Called after each status check that returned a status.
    ///
    /// # Arguments
    /// * `status`: raw provider status string
    /// * `attempt`: 1-indexed attempt number
    fn on_status(&self, status: &str, attempt: u32) {
        let _ = (status, attempt);
    }

    /// Called after each status check that failed (network or non-2xx).
    ///
    /// Failures before the last attempt are absorbed by the loop; this is the
    /// only place they are observable.
    fn on_check_failed(&self, attempt: u32, error: &str) {
        let _ = (attempt, error);
    }

    /// Called once when the job reaches success.
    fn on_complete(&self, result_url: &str, attempts: u32) {
        let _ = (result_url, attempts);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TransformProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TransformConfig`].
pub type ProgressCallback = Arc<dyn TransformProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

    struct TrackingCallback {
        statuses: AtomicUsize,
        failures: AtomicUsize,
        last_attempt: AtomicU32,
    }

    impl TransformProgressCallback for TrackingCallback {
        fn on_status(&self, _status: &str, attempt: u32) {
            self.statuses.fetch_add(1, Ordering::SeqCst);
            self.last_attempt.store(attempt, Ordering::SeqCst);
        }

        fn on_check_failed(&self, attempt: u32, _error: &str) {
            self.failures.fetch_add(1, Ordering::SeqCst);
            self.last_attempt.store(attempt, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_upload_start(1024);
        cb.on_submitted(&JobDescriptor {
            id: "job".into(),
            status: "Queued".into(),
            message: None,
        });
        cb.on_status("Processing", 1);
        cb.on_check_failed(2, "connection reset");
        cb.on_complete("https://cdn.example.com/out.png", 3);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback {
            statuses: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
            last_attempt: AtomicU32::new(0),
        };

        tracker.on_status("Queued", 1);
        tracker.on_status("Processing", 2);
        tracker.on_check_failed(3, "HTTP 502");
        tracker.on_status("Processing", 4);

        assert_eq!(tracker.statuses.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.last_attempt.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: Arc<dyn TransformProgressCallback> = Arc::new(NoopProgressCallback);
        cb.on_status("Processing", 1);
        cb.on_complete("https://cdn.example.com/out.png", 1);
    }
}
