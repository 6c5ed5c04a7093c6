//! Error path E2E tests.
//!
//! Classification and query generation have no degraded path: exhausting
//! either aborts the turn with the failing stage reported.

use pretty_assertions::assert_eq;

use e2e_tests::{intent_reply, response_reply, TestHarness};
use tutor_llm::{LlmError, ScriptedLlmClient, Stage};
use tutor_orchestrator::PipelineError;
use tutor_retrieval::MockSearch;
use tutor_types::EventLevel;

fn failed_stage(err: &PipelineError) -> Option<Stage> {
    err.stage_error().map(|e| e.stage)
}

#[tokio::test]
async fn test_classifier_exhaustion_aborts_turn() {
    let client = ScriptedLlmClient::new()
        .push_error(LlmError::RateLimitExceeded)
        .push_content("Learning, I think")
        .push_content("");
    let harness = TestHarness::new(client, MockSearch::new());

    let err = harness.pipeline.run("What is density?", &[]).await.unwrap_err();

    assert_eq!(failed_stage(&err), Some(Stage::IntentClassification));
    assert_eq!(harness.client.call_count(), 3);
    assert!(harness.search.calls().is_empty());
    assert_eq!(
        harness
            .observer
            .count(EventLevel::Error, "Intent Classification failed"),
        3
    );
    assert_eq!(harness.observer.count(EventLevel::Error, "Pipeline Failed"), 1);
}

#[tokio::test]
async fn test_query_generation_failure_aborts_turn() {
    let client = ScriptedLlmClient::new()
        .push_json(intent_reply("Learning Mode", "Density"))
        .push_json(serde_json::json!({"queries": []}))
        .push_json(serde_json::json!({"queries": ["", "  "]}))
        .push_content("no queries today");
    let harness = TestHarness::new(client, MockSearch::new());

    let err = harness.pipeline.run("What is density?", &[]).await.unwrap_err();

    assert_eq!(failed_stage(&err), Some(Stage::ContextQueryGeneration));
    assert_eq!(harness.client.call_count(), 4);
    assert!(harness.search.calls().is_empty());
}

#[tokio::test]
async fn test_direct_response_failure_aborts_turn() {
    let client = ScriptedLlmClient::new()
        .push_json(intent_reply("Misc Mode", "Density"))
        .push_json(serde_json::json!({"text": "wrong key"}))
        .push_json(serde_json::json!({"text": "wrong key"}))
        .push_json(serde_json::json!({"text": "wrong key"}))
        .push_json(response_reply("never reached"));
    let harness = TestHarness::new(client, MockSearch::new());

    let err = harness.pipeline.run("thanks!", &[]).await.unwrap_err();

    assert_eq!(failed_stage(&err), Some(Stage::DirectResponse));
    assert_eq!(harness.client.remaining(), 1);
}
