//! Fixed pipeline inputs and prompt helpers.
//!
//! The pipeline id and model label select the remote processing graph; they
//! are opaque to this crate and only overridable through
//! [`crate::config::TransformConfigBuilder`]. The example prompts are the
//! suggestions offered to users who have not written their own yet.

use crate::error::TransformError;

/// Template identifier of the image-transformation pipeline.
pub const DEFAULT_PIPELINE_ID: &str = "4avRtmmE";

/// Value sent as the `model_hidden` pipeline input.
pub const DEFAULT_MODEL_LABEL: &str = "ChatGPT image";

/// Suggested prompts.
pub const EXAMPLE_PROMPTS: &[&str] = &[
    "a cyberpunk warrior with neon armor",
    "a magical forest fairy with glowing wings",
    "a futuristic robot with chrome plating",
    "a medieval knight in golden armor",
    "a space explorer in an alien landscape",
];

/// Trim a user prompt and reject it when nothing is left.
pub fn normalize_prompt(prompt: &str) -> Result<String, TransformError> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(TransformError::InvalidInput {
            reason: "prompt is empty".into(),
        });
    }
    Ok(trimmed.to_string())
}
