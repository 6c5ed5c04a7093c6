//! Intent classification for queries.
//!
//! The [`IntentClassifier`] asks the model to place the query into one of the
//! five intent modes and to name the topic of conversation. There is no
//! heuristic fallback: if the model cannot produce a valid [`Intent`] within
//! the retry budget the turn is aborted.

use std::time::Instant;

use tracing::debug;

use tutor_llm::{Stage, StageError, StructuredCaller};
use tutor_types::{render_history, ChatMessage, Intent, PipelineEvent};

use crate::prompts::intent_prompt;

/// Classifies a query's intent and topic.
pub struct IntentClassifier {
    caller: StructuredCaller,
    history_turns: usize,
}

impl IntentClassifier {
    pub fn new(caller: StructuredCaller, history_turns: usize) -> Self {
        Self {
            caller,
            history_turns,
        }
    }

    /// Classify `query` given the conversation so far.
    pub async fn classify(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<Intent, StageError> {
        let observer = self.caller.observer();
        observer.on_event(
            &PipelineEvent::step(Stage::IntentClassification.name()).with_details(format!(
                "Analyzing query with {} chat history items",
                history.len()
            )),
        );
        let start = Instant::now();

        let prompt = intent_prompt(query, &render_history(history, self.history_turns));
        let intent: Intent = self
            .caller
            .call(Stage::IntentClassification, &[ChatMessage::user(prompt)])
            .await?;

        debug!(intent = %intent.intent, topic = ?intent.topic, "Classified query");
        observer.on_event(
            &PipelineEvent::success("Intent Classification Complete").with_details(format!(
                "Intent: {}, Topic: {}",
                intent.intent,
                intent.topic.as_deref().unwrap_or("None")
            )),
        );
        observer.on_event(&PipelineEvent::timing(
            Stage::IntentClassification.name(),
            start.elapsed(),
        ));
        Ok(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tutor_llm::{RetryPolicy, ScriptedLlmClient};
    use tutor_types::{EventLevel, RecordingObserver};

    fn classifier(
        client: ScriptedLlmClient,
    ) -> (IntentClassifier, Arc<ScriptedLlmClient>, Arc<RecordingObserver>) {
        let client = Arc::new(client);
        let observer = Arc::new(RecordingObserver::new());
        let caller = StructuredCaller::new(
            client.clone(),
            RetryPolicy::new(3, Duration::ZERO),
            observer.clone(),
        );
        (IntentClassifier::new(caller, 10), client, observer)
    }

    #[tokio::test]
    async fn test_classify_learning_query() {
        let (classifier, client, observer) = classifier(
            ScriptedLlmClient::new()
                .push_json(json!({"intent": "Learning Mode", "topic": "Density"})),
        );
        let history = vec![
            ChatMessage::user("Hey, can you help me study for my Chemistry exam?"),
            ChatMessage::assistant("Of course! What topic are you focusing on today?"),
        ];

        let intent = classifier
            .classify("What is the formula of density?", &history)
            .await
            .unwrap();

        assert_eq!(intent.intent, "Learning Mode");
        assert_eq!(intent.topic.as_deref(), Some("Density"));

        let requests = client.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].len(), 1);
        assert!(requests[0][0]
            .content
            .contains("Bot: \"Of course! What topic are you focusing on today?\""));
        assert_eq!(
            observer.count(EventLevel::Success, "Intent Classification Complete"),
            1
        );
    }

    #[tokio::test]
    async fn test_classify_tolerates_truncated_payload() {
        let (classifier, _, _) = classifier(
            ScriptedLlmClient::new().push_content(r#"{"intent": "Misc Mode", "topic": "Photosyn"#),
        );

        let intent = classifier.classify("thanks!", &[]).await.unwrap();
        assert_eq!(intent.intent, "Misc Mode");
        assert_eq!(intent.topic, None);
    }

    #[tokio::test]
    async fn test_classify_exhaustion_is_fatal() {
        let (classifier, client, _) = classifier(
            ScriptedLlmClient::new()
                .push_content("I think it's learning mode")
                .push_content("")
                .push_json(json!({"topic": "Density"})),
        );

        let err = classifier.classify("q", &[]).await.unwrap_err();
        assert_eq!(err.stage, Stage::IntentClassification);
        assert!(err.is_fatal());
        assert_eq!(client.call_count(), 3);
    }
}
