//! Error types for the orchestrator.

use thiserror::Error;

use tutor_llm::StageError;
use tutor_types::TutorError;

/// Failure of a whole turn.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A stage exhausted its retries
    #[error(transparent)]
    Stage(#[from] StageError),

    /// The pipeline could not be assembled
    #[error("Configuration error: {0}")]
    Config(String),
}

impl PipelineError {
    /// The failing stage's error, if any.
    pub fn stage_error(&self) -> Option<&StageError> {
        match self {
            PipelineError::Stage(e) => Some(e),
            PipelineError::Config(_) => None,
        }
    }
}

impl From<TutorError> for PipelineError {
    fn from(e: TutorError) -> Self {
        PipelineError::Config(e.to_string())
    }
}
