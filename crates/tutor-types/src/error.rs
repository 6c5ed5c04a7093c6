//! Error types shared across the tutor pipeline.

use thiserror::Error;

/// Error type for settings loading and validation.
#[derive(Debug, Error)]
pub enum TutorError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
