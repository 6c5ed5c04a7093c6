//! Chat message types.
//!
//! Chat history is owned by the caller and is only ever read by the
//! pipeline: it is embedded into prompts and forwarded to the model ahead of
//! the stage prompt.

use serde::{Deserialize, Serialize};

/// Role of the message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user
    User,
    /// Chatbot reply
    Assistant,
    /// System instruction
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
            Role::System => write!(f, "system"),
        }
    }
}

/// A single role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who wrote the message
    pub role: Role,

    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Create a message with the given role.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Create a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Render the most recent `turns` messages of a history for prompt embedding.
///
/// Each message becomes one line of the form `User: "..."` / `Bot: "..."`,
/// matching the worked examples in the stage prompts. An empty history
/// renders as `(no previous messages)`.
pub fn render_history(history: &[ChatMessage], turns: usize) -> String {
    let start = history.len().saturating_sub(turns);
    let window = &history[start..];

    if window.is_empty() {
        return "(no previous messages)".to_string();
    }

    window
        .iter()
        .map(|m| {
            let speaker = match m.role {
                Role::User => "User",
                Role::Assistant => "Bot",
                Role::System => "System",
            };
            format!("{}: \"{}\"", speaker, m.content)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::assistant("Of course!");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"Of course!"}"#);
    }

    #[test]
    fn test_history_deserializes_from_api_shape() {
        let json = r#"[{"role": "user", "content": "hi"}, {"role": "system", "content": "be nice"}]"#;
        let history: Vec<ChatMessage> = serde_json::from_str(json).unwrap();
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].role, Role::System);
    }

    #[test]
    fn test_render_history_keeps_last_turns() {
        let history = vec![
            ChatMessage::user("one"),
            ChatMessage::assistant("two"),
            ChatMessage::user("three"),
        ];

        let rendered = render_history(&history, 2);
        assert_eq!(rendered, "Bot: \"two\"\nUser: \"three\"");
    }

    #[test]
    fn test_render_empty_history() {
        assert_eq!(render_history(&[], 10), "(no previous messages)");
    }
}
