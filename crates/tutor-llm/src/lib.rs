//! # tutor-llm
//!
//! Everything between a pipeline stage and the reasoning service:
//!
//! - [`LlmClient`]: the injected chat-completion capability, with an
//!   OpenAI-compatible HTTP implementation and scripted test doubles
//! - [`call_with_retry`]: fixed-interval bounded retry used by every stage
//! - [`sanitize`]: extracts the completion text from a payload and parses it
//!   as JSON, tolerating markdown fences and truncation
//! - [`StructuredCaller`]: chat, sanitize and schema-decode in one retried call
//!
//! ```rust,ignore
//! let caller = StructuredCaller::new(client, RetryPolicy::default(), observer);
//! let intent: Intent = caller.call(Stage::IntentClassification, &messages).await?;
//! ```

mod client;
mod error;
mod mock;
pub mod retry;
pub mod sanitizer;
mod structured;

pub use client::{ApiLlmClient, ApiLlmConfig, LlmClient};
pub use error::{LlmError, StageError};
pub use mock::{completion_payload, ScriptedLlmClient};
pub use retry::{call_with_retry, RetryPolicy};
pub use sanitizer::{clean_json_text, extract_content, parse_partial_json, sanitize};
pub use structured::{decode, Stage, StructuredCaller};
