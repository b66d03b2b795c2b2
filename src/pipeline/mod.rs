//! Pipeline stages of one image transformation.
//!
//! Each submodule implements exactly one step and is testable on its own.
//!
//! ## Data Flow
//!
//! ```text
//! materialize ──▶ submit ──▶ poll ⟲ status
//! (data URI/URL)  (job id)   (bounded loop, normalised outcome)
//! ```
//!
//! 1. [`materialize`]: turn an [`crate::job::ImageAsset`] into a
//!    `user_image` value, inline or via upload
//! 2. [`submit`]: send the creation request and classify rejections
//! 3. [`poll`]: check status at a fixed interval until terminal,
//!    exhausted, or cancelled
//! 4. [`status`]: map provider status vocabularies and result shapes
//!    onto [`status::JobOutcome`]

pub mod materialize;
pub mod poll;
pub mod status;
pub mod submit;
