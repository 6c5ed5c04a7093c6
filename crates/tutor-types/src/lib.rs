//! # tutor-types
//!
//! Shared domain types for the tutor pipeline.
//!
//! This crate defines the data structures passed between pipeline stages:
//! - Messages: role-tagged chat history entries
//! - Schemas: structured outputs the language model is asked to produce
//! - Intent modes: the closed set of routing categories
//! - Context: retrieved passages, source metadata and the per-turn bundle
//! - Observer: the injected event sink stages report progress through
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use tutor_types::{ChatMessage, IntentMode};
//!
//! let history = vec![ChatMessage::user("Can you help me with chemistry?")];
//! assert_eq!(IntentMode::from_label("Learning Mode"), IntentMode::Learning);
//! assert_eq!(history.len(), 1);
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod intent;
pub mod message;
pub mod observer;
pub mod schema;

pub use config::{
    LlmSettings, PipelineSettings, RetrySettings, SearchSettings, Settings, SummarizationMode,
};
pub use context::{metadata_key, ContextBundle, Metadata, RetrievedItem};
pub use error::TutorError;
pub use intent::IntentMode;
pub use message::{render_history, ChatMessage, Role};
pub use observer::{
    EventLevel, NoopObserver, PipelineEvent, PipelineObserver, RecordingObserver,
    TracingObserver,
};
pub use schema::{
    ContextQueries, ContextSummary, Intent, Quality, Response, ResponseValidation, Schema,
    MAX_CONTEXT_QUERIES,
};
