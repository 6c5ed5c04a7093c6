//! # tutor-orchestrator
//!
//! Turn orchestration for the tutor pipeline.
//!
//! ## Modules
//!
//! - [`classifier`]: intent and topic classification
//! - [`response`]: the generate / validate / refine loop
//! - [`direct`]: conversational answers without retrieval
//! - [`pipeline`]: intent routing across the stages
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tutor_orchestrator::Pipeline;
//! use tutor_types::{ChatMessage, Settings};
//!
//! let settings = Settings::load(None)?;
//! let pipeline = Pipeline::from_settings(&settings)?;
//! let history = vec![ChatMessage::user("Can you help me study chemistry?")];
//! let output = pipeline.run("What is the formula of density?", &history).await?;
//! println!("{}", output.response);
//! ```

pub mod classifier;
pub mod direct;
mod error;
mod prompts;
pub mod pipeline;
pub mod response;

pub use classifier::IntentClassifier;
pub use direct::DirectResponder;
pub use error::PipelineError;
pub use pipeline::{Pipeline, PipelineOutput};
pub use response::{Refinement, ResponseLayer, ResponseLayerConfig, ResponseOutcome};
