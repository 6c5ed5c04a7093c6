//! Structured-output schemas.
//!
//! Every model-backed stage asks for a JSON object with a fixed set of keys.
//! The sanitized payload is decoded into one of these types and then passed
//! through [`Schema::into_validated`], which enforces the invariants serde
//! alone cannot express. Either failure is reported by the caller as a schema
//! error and retried.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Upper bound on context queries kept from a single generation call.
pub const MAX_CONTEXT_QUERIES: usize = 3;

/// A structured output the model is asked to produce.
pub trait Schema: DeserializeOwned + Send {
    /// Name used in logs and error messages.
    const NAME: &'static str;

    /// Check invariants and normalise the decoded value.
    fn into_validated(self) -> Result<Self, String> {
        Ok(self)
    }
}

/// Classified intent and conversation topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    /// Raw intent label, e.g. "Learning Mode"
    pub intent: String,

    /// Main topic of the conversation, if the model found one
    #[serde(default)]
    pub topic: Option<String>,
}

impl Schema for Intent {
    const NAME: &'static str = "Intent";

    fn into_validated(mut self) -> Result<Self, String> {
        self.intent = self.intent.trim().to_string();
        if self.intent.is_empty() {
            return Err("intent must not be empty".to_string());
        }
        self.topic = self
            .topic
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(self)
    }
}

/// Queries to run against the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextQueries {
    pub queries: Vec<String>,
}

impl Schema for ContextQueries {
    const NAME: &'static str = "ContextQueries";

    fn into_validated(mut self) -> Result<Self, String> {
        self.queries = self
            .queries
            .into_iter()
            .map(|q| q.trim().to_string())
            .collect();

        if self.queries.is_empty() {
            return Err("at least one context query is required".to_string());
        }
        if self.queries.iter().any(|q| q.is_empty()) {
            return Err("context queries must not be blank".to_string());
        }
        if self.queries.len() > MAX_CONTEXT_QUERIES {
            tracing::warn!(
                generated = self.queries.len(),
                kept = MAX_CONTEXT_QUERIES,
                "Too many context queries, keeping the first ones"
            );
            self.queries.truncate(MAX_CONTEXT_QUERIES);
        }
        Ok(self)
    }
}

/// Condensed synopsis of the passages fetched for one context query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextSummary {
    pub summary: String,
}

impl Schema for ContextSummary {
    const NAME: &'static str = "ContextSummary";
}

/// Generated reply text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub response: String,
}

impl Response {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}

impl Schema for Response {
    const NAME: &'static str = "Response";
}

/// Quality judgement of a response candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quality {
    Optimal,
    Suboptimal,
}

impl Quality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Quality::Optimal => "Optimal",
            Quality::Suboptimal => "Suboptimal",
        }
    }
}

/// Validation verdict for a response candidate.
///
/// `reason` and `resolution` only carry meaning for [`Quality::Suboptimal`];
/// the literal `"None"` the model is instructed to emit for optimal answers
/// is normalised to `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseValidation {
    pub quality: Quality,

    #[serde(default)]
    pub reason: Option<String>,

    #[serde(default)]
    pub resolution: Option<String>,
}

impl ResponseValidation {
    /// Verdict accepting the candidate.
    pub fn optimal() -> Self {
        Self {
            quality: Quality::Optimal,
            reason: None,
            resolution: None,
        }
    }

    /// Verdict rejecting the candidate with feedback.
    pub fn suboptimal(reason: impl Into<String>, resolution: impl Into<String>) -> Self {
        Self {
            quality: Quality::Suboptimal,
            reason: Some(reason.into()),
            resolution: Some(resolution.into()),
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.quality == Quality::Optimal
    }
}

impl Schema for ResponseValidation {
    const NAME: &'static str = "ResponseValidation";

    fn into_validated(mut self) -> Result<Self, String> {
        self.reason = normalize_feedback(self.reason);
        self.resolution = normalize_feedback(self.resolution);
        if self.quality == Quality::Optimal {
            self.reason = None;
            self.resolution = None;
        }
        Ok(self)
    }
}

fn normalize_feedback(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("none"))
}
