//! Deterministic clients for testing without a live model.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use tutor_types::ChatMessage;

use crate::client::LlmClient;
use crate::error::LlmError;

/// Wrap `content` in a chat-completion payload.
pub fn completion_payload(content: &str) -> Value {
    json!({
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

/// Client replaying a queue of scripted replies in order.
///
/// Every request is recorded. Once the script runs out, calls fail with
/// [`LlmError::Api`].
#[derive(Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<Result<Value, LlmError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw payload.
    pub fn push_payload(self, payload: Value) -> Self {
        self.lock_replies().push_back(Ok(payload));
        self
    }

    /// Queue a completion with the given text.
    pub fn push_content(self, content: &str) -> Self {
        self.push_payload(completion_payload(content))
    }

    /// Queue a completion carrying `value` inside a ```json fence.
    pub fn push_json(self, value: Value) -> Self {
        self.push_content(&format!("```json\n{}\n```", value))
    }

    /// Queue a failure.
    pub fn push_error(self, error: LlmError) -> Self {
        self.lock_replies().push_back(Err(error));
        self
    }

    /// Number of chat calls made so far.
    pub fn call_count(&self) -> usize {
        self.lock_requests().len()
    }

    /// Messages of every call, in call order.
    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.lock_requests().clone()
    }

    /// Scripted replies not consumed yet.
    pub fn remaining(&self) -> usize {
        self.lock_replies().len()
    }

    fn lock_replies(&self) -> std::sync::MutexGuard<'_, VecDeque<Result<Value, LlmError>>> {
        self.replies.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn lock_requests(&self) -> std::sync::MutexGuard<'_, Vec<Vec<ChatMessage>>> {
        self.requests.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn chat(&self, messages: &[ChatMessage]) -> Result<Value, LlmError> {
        self.lock_requests().push(messages.to_vec());
        self.lock_replies()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Api("scripted replies exhausted".to_string())))
    }
}
