//! Search error types.

use thiserror::Error;

/// A failed semantic search call.
///
/// Search failures never abort a turn: the context layer logs them and
/// continues with an empty contribution for the affected query.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Search backend error: {0}")]
    Backend(String),

    #[error("Search request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid search response: {0}")]
    Decode(String),
}
