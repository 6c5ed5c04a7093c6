//! Retried structured model calls.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use tutor_types::{ChatMessage, PipelineEvent, PipelineObserver, Schema};

use crate::client::LlmClient;
use crate::error::{LlmError, StageError};
use crate::retry::{call_with_retry, RetryPolicy};
use crate::sanitizer::sanitize;

/// Pipeline stage issuing a model call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    IntentClassification,
    ContextQueryGeneration,
    ContextSummarization,
    ResponseGeneration,
    ResponseRefinement,
    ResponseValidation,
    DirectResponse,
}

impl Stage {
    pub fn name(&self) -> &'static str {
        match self {
            Stage::IntentClassification => "Intent Classification",
            Stage::ContextQueryGeneration => "Context Query Generation",
            Stage::ContextSummarization => "Context Summarization",
            Stage::ResponseGeneration => "Response Generation",
            Stage::ResponseRefinement => "Response Refinement",
            Stage::ResponseValidation => "Response Validation",
            Stage::DirectResponse => "Direct Response",
        }
    }

    /// Stages with no degraded path: exhausting their retries aborts the turn.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Stage::IntentClassification | Stage::ContextQueryGeneration
        )
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Sanitize a payload and decode it into `T`.
pub fn decode<T: Schema>(payload: &Value) -> Result<T, LlmError> {
    let value = sanitize(payload)?;
    let parsed: T = serde_json::from_value(value)
        .map_err(|e| LlmError::Schema(format!("{}: {}", T::NAME, e)))?;
    parsed
        .into_validated()
        .map_err(|e| LlmError::Schema(format!("{}: {}", T::NAME, e)))
}

/// Issues model calls that must come back as a given schema.
///
/// Each attempt runs chat -> sanitize -> decode; any failure along the way
/// counts as a failed attempt for the retry policy.
#[derive(Clone)]
pub struct StructuredCaller {
    client: Arc<dyn LlmClient>,
    retry: RetryPolicy,
    observer: Arc<dyn PipelineObserver>,
}

impl StructuredCaller {
    pub fn new(
        client: Arc<dyn LlmClient>,
        retry: RetryPolicy,
        observer: Arc<dyn PipelineObserver>,
    ) -> Self {
        Self {
            client,
            retry,
            observer,
        }
    }

    pub fn observer(&self) -> &Arc<dyn PipelineObserver> {
        &self.observer
    }

    /// Call the model for `stage` and decode the result as `T`.
    pub async fn call<T: Schema>(
        &self,
        stage: Stage,
        messages: &[ChatMessage],
    ) -> Result<T, StageError> {
        let start = Instant::now();
        let result = call_with_retry(&self.retry, move || async move {
            self.attempt::<T>(stage, messages).await
        })
        .await;

        match result {
            Ok(value) => {
                debug!(
                    stage = stage.name(),
                    schema = T::NAME,
                    elapsed_ms = start.elapsed().as_millis() as u64,
                    "Structured call succeeded"
                );
                Ok(value)
            }
            Err(source) => {
                self.observer.on_event(
                    &PipelineEvent::error(format!("{} failed after retries", stage))
                        .with_details(source.to_string()),
                );
                Err(StageError {
                    stage,
                    attempts: self.retry.attempts(),
                    source,
                })
            }
        }
    }

    async fn attempt<T: Schema>(
        &self,
        stage: Stage,
        messages: &[ChatMessage],
    ) -> Result<T, LlmError> {
        let outcome = match self.client.chat(messages).await {
            Ok(payload) => decode::<T>(&payload),
            Err(e) => Err(e),
        };

        if let Err(e) = &outcome {
            self.observer.on_event(
                &PipelineEvent::error(format!("{} failed", stage)).with_details(e.to_string()),
            );
        }
        outcome
    }
}
