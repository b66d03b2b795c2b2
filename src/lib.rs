//! # kimera-transform
//!
//! Submit a photo and a text prompt to the Kimera image-transformation
//! pipeline, then poll until the transformed image is ready.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image + prompt
//!  │
//!  ├─ 1. Validate      empty prompt / non-image bytes rejected locally
//!  ├─ 2. Materialize   data URI (inline) or upload → public URL
//!  ├─ 3. Submit        POST /pipeline/run → job id
//!  ├─ 4. Poll          GET /pipeline/run/{id} every 5 s, at most 60 times
//!  └─ 5. Result        image URL, or a classified TransformError
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use kimera_transform::{transform, TransformConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Reads KIMERA_API_KEY (and optionally KIMERA_API_BASE)
//!     let config = TransformConfig::from_env()?;
//!     let output = transform("selfie.jpg", "a medieval knight in golden armor", &config).await?;
//!     println!("{}", output.result_url);
//!     eprintln!("finished after {} status checks", output.attempts);
//!     Ok(())
//! }
//! ```
//!
//! ## Cancellation
//!
//! ```rust,no_run
//! use kimera_transform::{CancellationToken, ImageAsset, TransformClient, TransformConfig};
//!
//! # async fn demo(bytes: Vec<u8>) -> Result<(), kimera_transform::TransformError> {
//! let client = TransformClient::new(TransformConfig::from_env()?)?;
//! let asset = ImageAsset::new(bytes, "image/jpeg")?;
//! let cancel = CancellationToken::new();
//!
//! let guard = cancel.clone();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     guard.cancel();
//! });
//!
//! let output = client.run_with_cancel(&asset, "a space explorer", &cancel).await?;
//! # let _ = output;
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `kimera` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! kimera-transform = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod error;
pub mod job;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod transform;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::TransformClient;
pub use config::{MaterializeStrategy, TransformConfig, TransformConfigBuilder};
pub use error::{ErrorKind, TransformError};
pub use job::{ImageAsset, JobDescriptor, PollAttempt, TransformOutput, TransformationJob};
pub use pipeline::status::{JobOutcome, StatusResponse};
pub use progress::{NoopProgressCallback, ProgressCallback, TransformProgressCallback};
pub use prompts::EXAMPLE_PROMPTS;
pub use transform::{
    default_output_name, download_result, download_result_with_cancel, transform, transform_sync,
    transform_to_file,
};
pub use tokio_util::sync::CancellationToken;
