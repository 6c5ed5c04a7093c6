//! Error types for model calls.

use thiserror::Error;

use crate::structured::Stage;

/// A failed model interaction.
///
/// Every variant is treated as transient: the retry executor retries it until
/// its attempt bound is reached.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("API request failed: {0}")]
    Api(String),

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The payload held no usable JSON structure
    #[error("Failed to parse model output: {0}")]
    Parse(String),

    /// The parsed structure did not match the expected schema
    #[error("Schema validation failed: {0}")]
    Schema(String),
}

/// A stage whose model call kept failing until its retries ran out.
#[derive(Debug, Error)]
#[error("{stage} failed after {attempts} attempt(s): {source}")]
pub struct StageError {
    pub stage: Stage,
    pub attempts: u32,
    #[source]
    pub source: LlmError,
}

impl StageError {
    /// Whether this failure must abort the whole turn.
    pub fn is_fatal(&self) -> bool {
        self.stage.is_fatal()
    }
}
