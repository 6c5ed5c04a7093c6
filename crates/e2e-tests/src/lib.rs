//! End-to-end test infrastructure for the tutor pipeline.
//!
//! Provides a shared TestHarness wiring a full [`Pipeline`] to a scripted
//! model, a mock knowledge base and a recording observer, plus helpers for
//! building model replies and search hits.

use std::sync::Arc;

use serde_json::{json, Value};

use tutor_llm::ScriptedLlmClient;
use tutor_orchestrator::Pipeline;
use tutor_retrieval::MockSearch;
use tutor_types::{ChatMessage, Metadata, RecordingObserver, RetrievedItem, Settings};

/// Shared test harness for E2E tests.
///
/// Holds the collaborators behind the pipeline so tests can inspect every
/// model request, every search and every emitted event after a turn.
pub struct TestHarness {
    pub client: Arc<ScriptedLlmClient>,
    pub search: Arc<MockSearch>,
    pub observer: Arc<RecordingObserver>,
    pub pipeline: Pipeline,
}

impl TestHarness {
    /// Create a harness with default settings and no retry delay.
    pub fn new(client: ScriptedLlmClient, search: MockSearch) -> Self {
        Self::with_settings(client, search, test_settings())
    }

    /// Create a harness with explicit settings.
    pub fn with_settings(client: ScriptedLlmClient, search: MockSearch, settings: Settings) -> Self {
        let client = Arc::new(client);
        let search = Arc::new(search);
        let observer = Arc::new(RecordingObserver::new());
        let pipeline = Pipeline::new(client.clone(), search.clone(), observer.clone(), &settings)
            .expect("Failed to build test pipeline");

        Self {
            client,
            search,
            observer,
            pipeline,
        }
    }
}

/// Default settings with the retry delay removed.
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.retry.delay_ms = 0;
    settings
}

/// The two-message chemistry conversation used across tests.
pub fn chemistry_history() -> Vec<ChatMessage> {
    vec![
        ChatMessage::user("Hey, can you help me study for my Chemistry exam?"),
        ChatMessage::assistant("Of course! What topic are you focusing on today?"),
    ]
}

/// Classifier reply.
pub fn intent_reply(intent: &str, topic: &str) -> Value {
    json!({ "intent": intent, "topic": topic })
}

/// Context query generator reply.
pub fn queries_reply(queries: &[&str]) -> Value {
    json!({ "queries": queries })
}

/// Generator or direct responder reply.
pub fn response_reply(text: &str) -> Value {
    json!({ "response": text })
}

/// Judge reply accepting the candidate.
pub fn optimal_reply() -> Value {
    json!({ "quality": "Optimal", "reason": "None", "resolution": "None" })
}

/// Judge reply rejecting the candidate.
pub fn suboptimal_reply(reason: &str, resolution: &str) -> Value {
    json!({ "quality": "Suboptimal", "reason": reason, "resolution": resolution })
}

/// Source metadata for a document page.
pub fn source(document: &str, page: u64) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), json!(document));
    metadata.insert("page".to_string(), json!(page));
    metadata
}

/// Search hit from a document page.
pub fn hit(passage: &str, document: &str, page: u64) -> RetrievedItem {
    RetrievedItem::new(passage, source(document, page))
}
