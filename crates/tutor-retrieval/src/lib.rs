//! # tutor-retrieval
//!
//! Context layer of the tutor pipeline.
//!
//! For a learning-mode turn the layer asks the model for one to three focused
//! knowledge-base queries, runs each against the [`SemanticSearch`]
//! collaborator in order, and merges the hits into a [`ContextBundle`]
//! holding every unique source once.
//!
//! - [`search`]: the search capability plus HTTP and mock backends
//! - [`context`]: query generation, retrieval, dedup and optional summarization
//!
//! [`ContextBundle`]: tutor_types::ContextBundle

pub mod context;
mod error;
mod prompts;
pub mod search;

pub use context::{ContextLayer, ContextLayerConfig};
pub use error::SearchError;
pub use search::{HttpSearch, HttpSearchConfig, MockSearch, SemanticSearch};
