//! Retrieved context types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Source metadata of a retrieved passage (string keys, scalar values).
pub type Metadata = serde_json::Map<String, Value>;

/// One (passage, metadata) pair returned by semantic search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedItem {
    /// Passage text
    pub passage: String,

    /// Metadata identifying the source chunk
    #[serde(default)]
    pub metadata: Metadata,
}

impl RetrievedItem {
    pub fn new(passage: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            passage: passage.into(),
            metadata,
        }
    }
}

/// Context gathered for one user turn.
///
/// `passages` keeps source order across all context queries; `metadata`
/// holds each unique source once, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextBundle {
    pub passages: Vec<String>,
    pub metadata: Vec<Metadata>,
}

impl ContextBundle {
    /// True when no passage carries any text.
    pub fn is_blank(&self) -> bool {
        self.passages.iter().all(|p| p.trim().is_empty())
    }

    /// Number of passages with text.
    pub fn non_empty_passages(&self) -> usize {
        self.passages.iter().filter(|p| !p.trim().is_empty()).count()
    }

    /// Render passages as a numbered block for prompt embedding.
    pub fn render(&self) -> String {
        let lines: Vec<String> = self
            .passages
            .iter()
            .filter(|p| !p.trim().is_empty())
            .enumerate()
            .map(|(i, p)| format!("[{}] {}", i + 1, p.trim()))
            .collect();

        if lines.is_empty() {
            "(no context available)".to_string()
        } else {
            lines.join("\n\n")
        }
    }
}

/// Canonical dedup key for a metadata map.
///
/// Keys are compared as an unordered set of key/value pairs, so two maps
/// with the same entries in a different insertion order produce the same key.
/// Whole-number floats compare equal to the integer (`4.0` matches `4`).
pub fn metadata_key(metadata: &Metadata) -> String {
    let mut entries: Vec<(&String, String)> = metadata
        .iter()
        .map(|(k, v)| (k, canonical(v).to_string()))
        .collect();
    entries.sort();

    entries
        .into_iter()
        .map(|(k, v)| format!("{}={}", Value::String(k.clone()), v))
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

fn canonical(value: &Value) -> Value {
    match value {
        Value::Number(n) => match n.as_f64() {
            Some(f)
                if n.is_f64()
                    && f.fract() == 0.0
                    && f >= i64::MIN as f64
                    && f < i64::MAX as f64 =>
            {
                Value::from(f as i64)
            }
            _ => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(canonical).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), canonical(v)))
                .collect(),
        ),
        _ => value.clone(),
    }
}
