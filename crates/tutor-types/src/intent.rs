//! Intent modes used for pipeline routing.

use serde::{Deserialize, Serialize};

/// Routing category of a user turn.
///
/// The classifier returns free text; anything outside the five known labels
/// is kept verbatim in [`IntentMode::Unrecognized`] so the controller can
/// still route it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentMode {
    /// Foundational "what is" / "how does" questions. Uses retrieval.
    Learning,
    /// Layered questions, MCQs and quizzes.
    Revision,
    /// Summaries, key points, formula lists.
    Cheatsheet,
    /// Clarifications answerable from the chat history.
    Normal,
    /// Greetings, thanks and other conversational filler.
    Misc,
    /// Any label the classifier produced that is not one of the above.
    Unrecognized(String),
}

impl IntentMode {
    /// Map a classifier label such as `"Learning Mode"` to a mode.
    pub fn from_label(label: &str) -> Self {
        match label.trim() {
            "Learning Mode" => IntentMode::Learning,
            "Revision Mode" => IntentMode::Revision,
            "Cheatsheet Mode" => IntentMode::Cheatsheet,
            "Normal Mode" => IntentMode::Normal,
            "Misc Mode" => IntentMode::Misc,
            other => IntentMode::Unrecognized(other.to_string()),
        }
    }

    /// Label as the classifier prompt spells it.
    pub fn label(&self) -> &str {
        match self {
            IntentMode::Learning => "Learning Mode",
            IntentMode::Revision => "Revision Mode",
            IntentMode::Cheatsheet => "Cheatsheet Mode",
            IntentMode::Normal => "Normal Mode",
            IntentMode::Misc => "Misc Mode",
            IntentMode::Unrecognized(label) => label,
        }
    }
}

impl std::fmt::Display for IntentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_labels_round_trip() {
        for mode in [
            IntentMode::Learning,
            IntentMode::Revision,
            IntentMode::Cheatsheet,
            IntentMode::Normal,
            IntentMode::Misc,
        ] {
            assert_eq!(IntentMode::from_label(mode.label()), mode);
        }
    }

    #[test]
    fn test_unknown_label_is_kept() {
        let mode = IntentMode::from_label("Quiz Mode");
        assert_eq!(mode, IntentMode::Unrecognized("Quiz Mode".to_string()));
        assert_eq!(mode.label(), "Quiz Mode");
    }
}
