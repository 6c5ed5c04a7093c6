//! Graceful degradation E2E tests.
//!
//! Search failures and empty knowledge bases must never abort a learning
//! turn: the affected queries contribute nothing and the answer is still
//! generated.

use pretty_assertions::assert_eq;

use e2e_tests::{
    hit, intent_reply, optimal_reply, queries_reply, response_reply, source, TestHarness,
};
use tutor_llm::ScriptedLlmClient;
use tutor_retrieval::MockSearch;
use tutor_types::EventLevel;

fn learning_client(queries: &[&str], answer: &str) -> ScriptedLlmClient {
    ScriptedLlmClient::new()
        .push_json(intent_reply("Learning Mode", "Density"))
        .push_json(queries_reply(queries))
        .push_json(response_reply(answer))
        .push_json(optimal_reply())
}

#[tokio::test]
async fn test_one_failing_search_keeps_the_rest() {
    let search = MockSearch::new()
        .with_failure("Density")
        .with_results("Density Units", vec![hit("kg/m^3", "chem.pdf", 5)]);
    let harness = TestHarness::new(
        learning_client(&["Density", "Density Units"], "Measured in kg/m^3."),
        search,
    );

    let output = harness.pipeline.run("Units of density?", &[]).await.unwrap();

    assert_eq!(output.response, "Measured in kg/m^3.");
    assert_eq!(output.metadata, Some(vec![source("chem.pdf", 5)]));
    assert_eq!(
        harness
            .observer
            .count(EventLevel::Error, "Context retrieval failed for query: Density"),
        1
    );
}

#[tokio::test]
async fn test_all_searches_failing_still_answers() {
    let search = MockSearch::new().with_failure("Density").with_failure("Mass");
    let harness = TestHarness::new(
        learning_client(&["Density", "Mass"], "Density is m/V."),
        search,
    );

    let output = harness.pipeline.run("What is density?", &[]).await.unwrap();

    assert_eq!(output.response, "Density is m/V.");
    assert_eq!(output.metadata, None);
    // No search is retried
    assert_eq!(harness.search.calls(), vec!["Density", "Mass"]);

    let generation = &harness.client.requests()[2];
    let prompt = &generation[generation.len() - 1].content;
    assert!(prompt.contains("(no context available)"));
}

#[tokio::test]
async fn test_empty_knowledge_base_yields_no_metadata() {
    let harness = TestHarness::new(
        learning_client(&["Density"], "Density is m/V."),
        MockSearch::new(),
    );

    let output = harness.pipeline.run("What is density?", &[]).await.unwrap();

    assert_eq!(output.metadata, None);
    assert_eq!(harness.client.call_count(), 4);
}
