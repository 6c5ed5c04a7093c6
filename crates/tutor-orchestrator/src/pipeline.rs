//! Pipeline controller.
//!
//! One call to [`Pipeline::run`] handles one user turn:
//!
//! 1. classify intent and topic
//! 2. route on the intent mode
//!    - `Learning`: context layer, then response layer
//!    - every other mode: direct responder
//! 3. return the answer with the retrieved source metadata, if any
//!
//! Stages run strictly one after another. The pipeline keeps no state
//! between turns, so a single instance can serve concurrent turns.

use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{info, info_span, Instrument};
use ulid::Ulid;

use tutor_llm::{ApiLlmClient, ApiLlmConfig, LlmClient, RetryPolicy, StructuredCaller};
use tutor_retrieval::{ContextLayer, ContextLayerConfig, HttpSearch, HttpSearchConfig, SemanticSearch};
use tutor_types::{
    ChatMessage, IntentMode, Metadata, PipelineEvent, PipelineObserver, Settings, TracingObserver,
};

use crate::classifier::IntentClassifier;
use crate::direct::DirectResponder;
use crate::error::PipelineError;
use crate::response::{ResponseLayer, ResponseLayerConfig};

/// Characters of the query shown in the pipeline start event.
const QUERY_PREVIEW_CHARS: usize = 100;

/// Answer for one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub response: String,

    /// Unique sources behind the answer; `None` when nothing was retrieved
    pub metadata: Option<Vec<Metadata>>,

    pub intent: IntentMode,

    pub topic: Option<String>,
}

/// The tutoring pipeline.
pub struct Pipeline {
    classifier: IntentClassifier,
    context: ContextLayer,
    response: ResponseLayer,
    direct: DirectResponder,
    observer: Arc<dyn PipelineObserver>,
}

impl Pipeline {
    /// Assemble a pipeline from its collaborators.
    pub fn new(
        client: Arc<dyn LlmClient>,
        search: Arc<dyn SemanticSearch>,
        observer: Arc<dyn PipelineObserver>,
        settings: &Settings,
    ) -> Result<Self, PipelineError> {
        settings.validate()?;

        let caller = StructuredCaller::new(
            client,
            RetryPolicy::from(&settings.retry),
            observer.clone(),
        );
        let history_turns = settings.pipeline.history_turns;

        Ok(Self {
            classifier: IntentClassifier::new(caller.clone(), history_turns),
            context: ContextLayer::new(
                caller.clone(),
                search,
                ContextLayerConfig::from(&settings.pipeline),
            ),
            response: ResponseLayer::new(
                caller.clone(),
                ResponseLayerConfig::from(&settings.pipeline),
            ),
            direct: DirectResponder::new(caller, history_turns),
            observer,
        })
    }

    /// Assemble a pipeline talking to the configured model API and search
    /// service, reporting through `tracing`.
    pub fn from_settings(settings: &Settings) -> Result<Self, PipelineError> {
        let llm_config = ApiLlmConfig::from_settings(&settings.llm)
            .map_err(|e| PipelineError::Config(e.to_string()))?;
        let client =
            ApiLlmClient::new(llm_config).map_err(|e| PipelineError::Config(e.to_string()))?;
        let search_config = HttpSearchConfig::from_settings(&settings.search).ok_or_else(|| {
            PipelineError::Config(
                "no search endpoint: set search.endpoint or TUTOR_SEARCH__ENDPOINT".to_string(),
            )
        })?;
        let search =
            HttpSearch::new(search_config).map_err(|e| PipelineError::Config(e.to_string()))?;

        Self::new(
            Arc::new(client),
            Arc::new(search),
            Arc::new(TracingObserver),
            settings,
        )
    }

    fn emit(&self, event: PipelineEvent) {
        self.observer.on_event(&event);
    }

    /// Handle one user turn.
    pub async fn run(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<PipelineOutput, PipelineError> {
        let turn_id = Ulid::new().to_string();
        let span = info_span!("turn", turn_id = %turn_id);
        self.run_turn(&turn_id, query, history)
            .instrument(span)
            .await
    }

    async fn run_turn(
        &self,
        turn_id: &str,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<PipelineOutput, PipelineError> {
        let start = Instant::now();
        let preview: String = query.chars().take(QUERY_PREVIEW_CHARS).collect();
        self.emit(
            PipelineEvent::info("Pipeline Start")
                .with_details(format!("Turn {}, query: {}", turn_id, preview)),
        );

        match self.route(query, history).await {
            Ok(output) => {
                self.emit(PipelineEvent::success("Pipeline Success").with_details(format!(
                    "Generated response for {} query",
                    output.intent
                )));
                if let Some(metadata) = &output.metadata {
                    self.emit(PipelineEvent::info("Response Metadata").with_details(format!(
                        "Includes {} source documents",
                        metadata.len()
                    )));
                }
                self.finish(turn_id, start);
                Ok(output)
            }
            Err(e) => {
                self.emit(PipelineEvent::error("Pipeline Failed").with_details(format!(
                    "Total duration: {:.2}s: {}",
                    start.elapsed().as_secs_f64(),
                    e
                )));
                self.finish(turn_id, start);
                Err(e)
            }
        }
    }

    fn finish(&self, turn_id: &str, start: Instant) {
        let elapsed = start.elapsed();
        info!(turn_id, elapsed_ms = elapsed.as_millis() as u64, "Turn finished");
        self.emit(
            PipelineEvent::info("Pipeline End").with_details(format!(
                "Turn {} completed in {:.2}s",
                turn_id,
                elapsed.as_secs_f64()
            )),
        );
        self.emit(PipelineEvent::timing("Pipeline", elapsed));
    }

    async fn route(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<PipelineOutput, PipelineError> {
        let intent = self.classifier.classify(query, history).await?;
        let mode = IntentMode::from_label(&intent.intent);
        let topic = intent.topic;
        let topic_text = topic.as_deref().unwrap_or("");

        self.emit(
            PipelineEvent::info("Intent Routing")
                .with_details(format!("Routing to {} pipeline", mode)),
        );

        let (response, metadata) = match &mode {
            IntentMode::Learning => {
                self.emit(
                    PipelineEvent::info("Learning Mode Pipeline")
                        .with_details("Using context retrieval and response generation"),
                );
                let bundle = self.context.run(query, history, topic_text).await?;
                let outcome = self
                    .response
                    .run(query, history, topic_text, &bundle)
                    .await?;
                let metadata = Some(bundle.metadata).filter(|m| !m.is_empty());
                (outcome.response, metadata)
            }
            IntentMode::Misc | IntentMode::Normal => {
                self.emit(
                    PipelineEvent::info(format!("{} Pipeline", mode))
                        .with_details("Using direct response generation"),
                );
                let response = self.direct.respond_direct(query, history).await?;
                (response.response, None)
            }
            IntentMode::Revision | IntentMode::Cheatsheet | IntentMode::Unrecognized(_) => {
                self.emit(
                    PipelineEvent::info(format!("{} Pipeline", mode))
                        .with_details("Using direct response generation (fallback)"),
                );
                let response = self.direct.respond_direct(query, history).await?;
                (response.response, None)
            }
        };

        Ok(PipelineOutput {
            response,
            metadata,
            intent: mode,
            topic,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tutor_llm::ScriptedLlmClient;
    use tutor_retrieval::MockSearch;
    use tutor_types::{EventLevel, RecordingObserver, RetrievedItem};

    fn settings() -> Settings {
        let mut settings = Settings::default();
        settings.retry.delay_ms = 0;
        settings
    }

    fn pipeline(
        client: ScriptedLlmClient,
        search: MockSearch,
    ) -> (Pipeline, Arc<ScriptedLlmClient>, Arc<MockSearch>, Arc<RecordingObserver>) {
        let client = Arc::new(client);
        let search = Arc::new(search);
        let observer = Arc::new(RecordingObserver::new());
        let pipeline = Pipeline::new(client.clone(), search.clone(), observer.clone(), &settings())
            .unwrap();
        (pipeline, client, search, observer)
    }

    #[tokio::test]
    async fn test_revision_mode_uses_direct_responder() {
        let client = ScriptedLlmClient::new()
            .push_json(json!({"intent": "Revision Mode", "topic": "Density"}))
            .push_json(json!({"response": "Quiz time!"}));
        let (pipeline, client, search, _) = pipeline(client, MockSearch::new());

        let output = pipeline.run("Quiz me on density", &[]).await.unwrap();

        assert_eq!(output.response, "Quiz time!");
        assert_eq!(output.intent, IntentMode::Revision);
        assert_eq!(output.metadata, None);
        assert_eq!(client.call_count(), 2);
        assert!(search.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unrecognized_label_falls_back_to_direct() {
        let client = ScriptedLlmClient::new()
            .push_json(json!({"intent": "Exam Mode"}))
            .push_json(json!({"response": "Happy to help."}));
        let (pipeline, _, _, observer) = pipeline(client, MockSearch::new());

        let output = pipeline.run("hello", &[]).await.unwrap();

        assert_eq!(output.intent, IntentMode::Unrecognized("Exam Mode".to_string()));
        assert_eq!(output.topic, None);
        assert_eq!(observer.count(EventLevel::Info, "Exam Mode Pipeline"), 1);
    }

    #[tokio::test]
    async fn test_learning_mode_returns_metadata() {
        let client = ScriptedLlmClient::new()
            .push_json(json!({"intent": "Learning Mode", "topic": "Density"}))
            .push_json(json!({"queries": ["Density"]}))
            .push_json(json!({"response": "Density = m/V"}))
            .push_json(json!({"quality": "Optimal", "reason": "None", "resolution": "None"}));
        let mut source = Metadata::new();
        source.insert("source".to_string(), json!("chem.pdf"));
        let search = MockSearch::new().with_results(
            "Density",
            vec![RetrievedItem::new("Density is mass per unit volume.", source.clone())],
        );
        let (pipeline, _, _, observer) = pipeline(client, search);

        let output = pipeline.run("What is density?", &[]).await.unwrap();

        assert_eq!(output.response, "Density = m/V");
        assert_eq!(output.metadata, Some(vec![source]));
        assert_eq!(output.topic.as_deref(), Some("Density"));
        assert_eq!(observer.count(EventLevel::Success, "Pipeline Success"), 1);
        assert_eq!(observer.count(EventLevel::Timing, "Pipeline"), 1);
    }

    #[tokio::test]
    async fn test_learning_mode_without_hits_has_no_metadata() {
        let client = ScriptedLlmClient::new()
            .push_json(json!({"intent": "Learning Mode", "topic": "Density"}))
            .push_json(json!({"queries": ["Density"]}))
            .push_json(json!({"response": "I couldn't find material, but density is m/V."}))
            .push_json(json!({"quality": "Optimal"}));
        let (pipeline, _, _, _) = pipeline(client, MockSearch::new());

        let output = pipeline.run("What is density?", &[]).await.unwrap();
        assert_eq!(output.metadata, None);
    }

    #[tokio::test]
    async fn test_classifier_failure_aborts_turn() {
        let client = ScriptedLlmClient::new()
            .push_content("")
            .push_content("")
            .push_content("");
        let (pipeline, client, _, observer) = pipeline(client, MockSearch::new());

        let err = pipeline.run("q", &[]).await.unwrap_err();

        let stage = err.stage_error().map(|e| e.stage);
        assert_eq!(stage, Some(tutor_llm::Stage::IntentClassification));
        assert_eq!(client.call_count(), 3);
        assert_eq!(observer.count(EventLevel::Error, "Pipeline Failed"), 1);
        assert_eq!(observer.count(EventLevel::Timing, "Pipeline"), 1);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let mut settings = settings();
        settings.pipeline.max_response_attempts = 0;
        let result = Pipeline::new(
            Arc::new(ScriptedLlmClient::new()),
            Arc::new(MockSearch::new()),
            Arc::new(RecordingObserver::new()),
            &settings,
        );
        assert!(matches!(result, Err(PipelineError::Config(_))));
    }

    #[test]
    fn test_from_settings_without_api_key_is_config_error() {
        if std::env::var_os("OPENAI_API_KEY").is_some() {
            return;
        }
        let mut settings = settings();
        settings.search.endpoint = Some("http://127.0.0.1:9/search".to_string());

        match Pipeline::from_settings(&settings) {
            Err(PipelineError::Config(msg)) => assert!(msg.contains("API key")),
            Err(other) => panic!("expected a config error, got {other}"),
            Ok(_) => panic!("expected a config error"),
        }
    }

    #[test]
    fn test_from_settings_without_search_endpoint_is_config_error() {
        let mut settings = settings();
        settings.llm.api_key = Some("sk-test".to_string());
        settings.search.endpoint = None;

        match Pipeline::from_settings(&settings) {
            Err(PipelineError::Config(msg)) => assert!(msg.contains("search endpoint")),
            Err(other) => panic!("expected a config error, got {other}"),
            Ok(_) => panic!("expected a config error"),
        }
    }
}
