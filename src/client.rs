//! [`TransformClient`]: one HTTP client, one configuration, one job at a time.
//!
//! The client owns a `reqwest::Client` built from the config's timeouts and
//! the injected credential. Each stage is exposed separately so a UI can
//! show its own progress between them; [`TransformClient::run`] chains them.

use crate::config::TransformConfig;
use crate::error::TransformError;
use crate::job::{ImageAsset, JobDescriptor, TransformOutput, TransformationJob};
use crate::pipeline::status::StatusResponse;
use crate::pipeline::{materialize, poll, submit};
use crate::prompts::normalize_prompt;
use crate::transform;
use std::future::Future;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Client for the Kimera pipeline API.
#[derive(Debug, Clone)]
pub struct TransformClient {
    http: reqwest::Client,
    config: TransformConfig,
}

impl TransformClient {
    /// Build a client with its own connection pool.
    pub fn new(config: TransformConfig) -> Result<Self, TransformError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .user_agent(concat!("kimera-transform/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransformError::Internal(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { http, config })
    }

    /// Reuse an existing `reqwest::Client`. Its timeouts take precedence.
    pub fn with_http_client(config: TransformConfig, http: reqwest::Client) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Turn `asset` into a `user_image` value using the configured strategy.
    pub async fn materialize(&self, asset: &ImageAsset) -> Result<String, TransformError> {
        materialize::materialize(&self.http, &self.config, asset).await
    }

    /// Send the creation request. Never retried automatically.
    pub async fn submit(
        &self,
        prompt: &str,
        user_image: &str,
    ) -> Result<JobDescriptor, TransformError> {
        let prompt = normalize_prompt(prompt)?;
        let job = submit::submit(&self.http, &self.config, &prompt, user_image).await?;
        if let Some(ref cb) = self.config.progress_callback {
            cb.on_submitted(&job);
        }
        Ok(job)
    }

    /// One status check, without interpretation.
    pub async fn check_status(&self, job_id: &str) -> Result<StatusResponse, TransformError> {
        poll::check_status(&self.http, &self.config, job_id).await
    }

    /// Poll `job` until it succeeds, fails, times out, or `cancel` fires.
    pub async fn poll_for_completion(
        &self,
        job: &JobDescriptor,
        cancel: &CancellationToken,
    ) -> Result<TransformOutput, TransformError> {
        poll::poll_for_completion(
            &self.http,
            &self.config,
            TransformationJob::from(job.clone()),
            cancel,
        )
        .await
    }

    /// Save a result reference to `path`, bounded by the configured
    /// request timeout.
    pub async fn download_result(
        &self,
        reference: &str,
        path: impl AsRef<Path>,
    ) -> Result<u64, TransformError> {
        transform::download_result(&self.http, reference, path).await
    }

    /// [`download_result`](Self::download_result) that stops when `cancel`
    /// fires, leaving no partial file behind.
    pub async fn download_result_with_cancel(
        &self,
        reference: &str,
        path: impl AsRef<Path>,
        cancel: &CancellationToken,
    ) -> Result<u64, TransformError> {
        transform::download_result_with_cancel(&self.http, reference, path, cancel).await
    }

    /// Validate, materialise, submit and poll, with no way to cancel.
    pub async fn run(
        &self,
        asset: &ImageAsset,
        prompt: &str,
    ) -> Result<TransformOutput, TransformError> {
        self.run_with_cancel(asset, prompt, &CancellationToken::new())
            .await
    }

    /// Validate, materialise, submit and poll.
    ///
    /// Input problems are reported before any network call. `cancel` aborts
    /// whichever stage is running: an upload or submission in flight is
    /// dropped and reported as [`TransformError::Interrupted`], polling stops
    /// with [`TransformError::Cancelled`]. A job that was already submitted
    /// keeps running remotely.
    pub async fn run_with_cancel(
        &self,
        asset: &ImageAsset,
        prompt: &str,
        cancel: &CancellationToken,
    ) -> Result<TransformOutput, TransformError> {
        let prompt = normalize_prompt(prompt)?;
        info!(
            "Starting transformation: {} bytes {} via {} materialisation, prompt {} chars",
            asset.size(),
            asset.media_type(),
            materialize::strategy_name(&self.config.strategy),
            prompt.len()
        );

        let user_image =
            until_cancelled(cancel, "image materialisation", self.materialize(asset)).await?;
        let job = until_cancelled(cancel, "job submission", self.submit(&prompt, &user_image))
            .await?;
        drop(user_image);

        self.poll_for_completion(&job, cancel).await
    }
}

/// Run `stage` unless `cancel` fires first.
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    stage: &'static str,
    fut: impl Future<Output = Result<T, TransformError>>,
) -> Result<T, TransformError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            info!("Cancelled during {}", stage);
            Err(TransformError::Interrupted { stage })
        }
        res = fut => res,
    }
}
