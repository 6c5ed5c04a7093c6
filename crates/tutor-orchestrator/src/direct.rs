//! Direct responder for turns that need no retrieval.

use std::time::Instant;

use tutor_llm::{Stage, StageError, StructuredCaller};
use tutor_types::{render_history, ChatMessage, PipelineEvent, Response};

use crate::prompts::direct_prompt;

/// Answers conversationally from the history alone.
pub struct DirectResponder {
    caller: StructuredCaller,
    history_turns: usize,
}

impl DirectResponder {
    pub fn new(caller: StructuredCaller, history_turns: usize) -> Self {
        Self {
            caller,
            history_turns,
        }
    }

    /// Single structured call; no context and no validation loop.
    pub async fn respond_direct(
        &self,
        query: &str,
        history: &[ChatMessage],
    ) -> Result<Response, StageError> {
        let observer = self.caller.observer();
        observer.on_event(
            &PipelineEvent::step(Stage::DirectResponse.name())
                .with_details("Generating response without context retrieval"),
        );
        let start = Instant::now();

        let prompt = direct_prompt(query, &render_history(history, self.history_turns));
        let mut messages = history.to_vec();
        messages.push(ChatMessage::user(prompt));

        let response: Response = self.caller.call(Stage::DirectResponse, &messages).await?;

        observer.on_event(
            &PipelineEvent::success("Direct Response Complete").with_details(format!(
                "Generated response of {} chars",
                response.response.chars().count()
            )),
        );
        observer.on_event(&PipelineEvent::timing(
            Stage::DirectResponse.name(),
            start.elapsed(),
        ));
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;
    use tutor_llm::{RetryPolicy, ScriptedLlmClient};
    use tutor_types::NoopObserver;

    #[tokio::test]
    async fn test_direct_response_sends_history_then_prompt() {
        let client = Arc::new(
            ScriptedLlmClient::new()
                .push_content("Sure! Here you go:\n```json\n{\"response\": \"You're welcome!\"}\n```"),
        );
        let caller = StructuredCaller::new(
            client.clone(),
            RetryPolicy::new(3, Duration::ZERO),
            Arc::new(NoopObserver),
        );
        let responder = DirectResponder::new(caller, 10);
        let history = vec![ChatMessage::user("Explain photosynthesis")];

        let response = responder
            .respond_direct("Awesome, thanks so much!", &history)
            .await
            .unwrap();

        assert_eq!(response.response, "You're welcome!");
        let request = &client.requests()[0];
        assert_eq!(request.len(), 2);
        assert_eq!(request[0], history[0]);
        assert!(request[1].content.contains("Awesome, thanks so much!"));
    }

    #[tokio::test]
    async fn test_direct_response_exhaustion() {
        let client = Arc::new(
            ScriptedLlmClient::new()
                .push_json(json!({"answer": "wrong key"}))
                .push_json(json!({"answer": "wrong key"})),
        );
        let caller = StructuredCaller::new(
            client,
            RetryPolicy::new(2, Duration::ZERO),
            Arc::new(NoopObserver),
        );
        let responder = DirectResponder::new(caller, 10);

        let err = responder.respond_direct("hi", &[]).await.unwrap_err();
        assert_eq!(err.stage, Stage::DirectResponse);
        assert_eq!(err.attempts, 2);
    }
}
