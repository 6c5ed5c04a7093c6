//! Response layer: the generate / validate / refine loop.
//!
//! Each attempt runs exactly one generation and one validation call. An
//! `Optimal` verdict ends the loop; a `Suboptimal` one carries its feedback
//! and the rejected candidate into the next attempt's prompt. When the
//! attempts run out the last candidate is returned as is.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use tutor_llm::{Stage, StageError, StructuredCaller};
use tutor_types::{
    render_history, ChatMessage, ContextBundle, PipelineEvent, PipelineSettings, Quality,
    Response, ResponseValidation,
};

use crate::prompts::{generate_prompt, validate_prompt};

/// Feedback carried from a rejected candidate into the next attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refinement {
    /// Why the previous candidate was rejected
    pub reason: String,

    /// How to improve it
    pub resolution: String,

    /// The rejected candidate
    pub previous: String,
}

impl Refinement {
    /// Build from a suboptimal verdict.
    ///
    /// Returns `None` when the verdict carries no usable feedback, in which
    /// case the next attempt is a plain generation.
    pub fn from_verdict(verdict: &ResponseValidation, previous: &str) -> Option<Self> {
        match (&verdict.reason, &verdict.resolution) {
            (Some(reason), Some(resolution)) if !previous.trim().is_empty() => Some(Self {
                reason: reason.clone(),
                resolution: resolution.clone(),
                previous: previous.to_string(),
            }),
            _ => None,
        }
    }
}

/// Result of the response layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseOutcome {
    /// Final answer text
    pub response: String,

    /// Attempts used, 1-based
    pub attempts: u32,

    /// Verdict of the returned candidate
    pub quality: Quality,
}

/// Configuration for [`ResponseLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseLayerConfig {
    /// Generate/validate cycles before settling for the last candidate
    pub max_attempts: u32,

    /// History messages embedded into prompts
    pub history_turns: usize,
}

impl Default for ResponseLayerConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            history_turns: 10,
        }
    }
}

impl From<&PipelineSettings> for ResponseLayerConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            max_attempts: settings.max_response_attempts,
            history_turns: settings.history_turns,
        }
    }
}

/// Produces a validated answer from the context bundle.
pub struct ResponseLayer {
    caller: StructuredCaller,
    config: ResponseLayerConfig,
}

impl ResponseLayer {
    pub fn new(caller: StructuredCaller, config: ResponseLayerConfig) -> Self {
        Self { caller, config }
    }

    fn emit(&self, event: PipelineEvent) {
        self.caller.observer().on_event(&event);
    }

    pub async fn run(
        &self,
        query: &str,
        history: &[ChatMessage],
        topic: &str,
        context: &ContextBundle,
    ) -> Result<ResponseOutcome, StageError> {
        let max_attempts = self.config.max_attempts.max(1);
        self.emit(PipelineEvent::step("Response Layer").with_details(format!(
            "Starting response generation with max {} attempts",
            max_attempts
        )));
        let start = Instant::now();

        let rendered_history = render_history(history, self.config.history_turns);
        let rendered_context = context.render();
        let passages = context.non_empty_passages();

        let mut refinement: Option<Refinement> = None;
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let is_final = attempt >= max_attempts;
            self.emit(
                PipelineEvent::info(format!("Response Attempt {}/{}", attempt, max_attempts))
                    .with_details("Generating response"),
            );

            let cycle = self
                .cycle(
                    query,
                    history,
                    &rendered_history,
                    topic,
                    &rendered_context,
                    passages,
                    refinement.as_ref(),
                )
                .await;

            let (candidate, verdict) = match cycle {
                Ok(pair) => pair,
                Err(e) => {
                    self.emit(
                        PipelineEvent::error(format!("Response generation attempt {} failed", attempt))
                            .with_details(e.to_string()),
                    );
                    if is_final {
                        return Err(e);
                    }
                    continue;
                }
            };

            if verdict.is_optimal() {
                self.emit(PipelineEvent::success("Response Layer Complete").with_details(format!(
                    "Optimal response achieved on attempt {}",
                    attempt
                )));
                self.emit(PipelineEvent::timing("Response Layer", start.elapsed()));
                return Ok(ResponseOutcome {
                    response: candidate.response,
                    attempts: attempt,
                    quality: Quality::Optimal,
                });
            }

            if is_final {
                warn!(attempts = attempt, "Settling for suboptimal response");
                self.emit(PipelineEvent::warning("Response Layer Complete").with_details(format!(
                    "Using suboptimal response after {} attempts",
                    attempt
                )));
                self.emit(PipelineEvent::timing("Response Layer", start.elapsed()));
                return Ok(ResponseOutcome {
                    response: candidate.response,
                    attempts: attempt,
                    quality: Quality::Suboptimal,
                });
            }

            refinement = Refinement::from_verdict(&verdict, &candidate.response);
            self.emit(
                PipelineEvent::warning("Response needs refinement").with_details(format!(
                    "Attempting refinement {}/{}",
                    attempt + 1,
                    max_attempts
                )),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn cycle(
        &self,
        query: &str,
        history: &[ChatMessage],
        rendered_history: &str,
        topic: &str,
        rendered_context: &str,
        passages: usize,
        refinement: Option<&Refinement>,
    ) -> Result<(Response, ResponseValidation), StageError> {
        let candidate = self
            .generate(
                query,
                history,
                rendered_history,
                topic,
                rendered_context,
                passages,
                refinement,
            )
            .await?;
        let verdict = self
            .validate(&candidate.response, query, rendered_history, topic, rendered_context)
            .await?;
        Ok((candidate, verdict))
    }

    #[allow(clippy::too_many_arguments)]
    async fn generate(
        &self,
        query: &str,
        history: &[ChatMessage],
        rendered_history: &str,
        topic: &str,
        rendered_context: &str,
        passages: usize,
        refinement: Option<&Refinement>,
    ) -> Result<Response, StageError> {
        let stage = match refinement {
            Some(_) => Stage::ResponseRefinement,
            None => Stage::ResponseGeneration,
        };
        self.emit(
            PipelineEvent::step(stage.name())
                .with_details(format!("Using {} context passages", passages)),
        );
        if let Some(refinement) = refinement {
            let reason: String = refinement.reason.chars().take(100).collect();
            self.emit(
                PipelineEvent::warning("Response Refinement Required")
                    .with_details(format!("Reason: {}...", reason)),
            );
        }
        let start = Instant::now();

        let prompt = generate_prompt(query, rendered_history, topic, rendered_context, refinement);
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(prompt));

        let response: Response = self.caller.call(stage, &messages).await?;

        self.emit(
            PipelineEvent::success(format!("{} Complete", stage)).with_details(format!(
                "Generated response of {} chars",
                response.response.chars().count()
            )),
        );
        self.emit(PipelineEvent::timing(stage.name(), start.elapsed()));
        Ok(response)
    }

    async fn validate(
        &self,
        candidate: &str,
        query: &str,
        rendered_history: &str,
        topic: &str,
        rendered_context: &str,
    ) -> Result<ResponseValidation, StageError> {
        self.emit(
            PipelineEvent::step(Stage::ResponseValidation.name())
                .with_details("Evaluating response quality"),
        );
        let start = Instant::now();

        let prompt = validate_prompt(candidate, query, rendered_history, topic, rendered_context);
        let verdict: ResponseValidation = self
            .caller
            .call(Stage::ResponseValidation, &[ChatMessage::user(prompt)])
            .await?;

        if verdict.is_optimal() {
            self.emit(
                PipelineEvent::success("Response Validation Complete")
                    .with_details("Response quality: Optimal"),
            );
        } else {
            self.emit(
                PipelineEvent::warning("Response Validation Complete")
                    .with_details(format!("Response quality: {}", verdict.quality.as_str())),
            );
            self.emit(PipelineEvent::debug("Validation Issues").with_details(format!(
                "Reason: {}",
                verdict.reason.as_deref().unwrap_or("None")
            )));
        }
        debug!(quality = verdict.quality.as_str(), "Validated candidate");
        self.emit(PipelineEvent::timing(
            Stage::ResponseValidation.name(),
            start.elapsed(),
        ));
        Ok(verdict)
    }
}
