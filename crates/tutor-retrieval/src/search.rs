//! Semantic search capability.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use tutor_types::{RetrievedItem, SearchSettings};

use crate::error::SearchError;

/// Knowledge-base search.
///
/// Returns the finite list of (passage, metadata) hits for one query. The
/// context layer calls it once per context query and never retries.
#[async_trait]
pub trait SemanticSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<RetrievedItem>, SearchError>;
}

/// Configuration for [`HttpSearch`].
#[derive(Debug, Clone)]
pub struct HttpSearchConfig {
    /// Endpoint accepting `POST {"query": ..., "limit": ...}`
    pub endpoint: String,

    /// Hits requested per query
    pub limit: usize,

    /// Request timeout
    pub timeout: Duration,
}

impl HttpSearchConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            limit: 5,
            timeout: Duration::from_secs(30),
        }
    }

    /// Build from settings; `None` when no endpoint is configured.
    pub fn from_settings(settings: &SearchSettings) -> Option<Self> {
        settings.endpoint.as_ref().map(|endpoint| Self {
            endpoint: endpoint.clone(),
            limit: settings.limit,
            timeout: settings.timeout(),
        })
    }
}

/// Search service reached over HTTP.
///
/// The service answers with either a bare JSON array of
/// `{"passage", "metadata"}` objects or an object wrapping that array under
/// `"results"`.
pub struct HttpSearch {
    client: Client,
    config: HttpSearchConfig,
}

#[derive(Serialize)]
struct SearchRequest<'a> {
    query: &'a str,
    limit: usize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SearchReply {
    Bare(Vec<RetrievedItem>),
    Wrapped { results: Vec<RetrievedItem> },
}

impl HttpSearch {
    pub fn new(config: HttpSearchConfig) -> Result<Self, SearchError> {
        let client = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl SemanticSearch for HttpSearch {
    async fn search(&self, query: &str) -> Result<Vec<RetrievedItem>, SearchError> {
        debug!(endpoint = %self.config.endpoint, query, "Running semantic search");

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&SearchRequest {
                query,
                limit: self.config.limit,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Backend(format!("HTTP {}: {}", status, body)));
        }

        let body = response.text().await?;
        let reply: SearchReply =
            serde_json::from_str(&body).map_err(|e| SearchError::Decode(e.to_string()))?;

        Ok(match reply {
            SearchReply::Bare(items) => items,
            SearchReply::Wrapped { results } => results,
        })
    }
}

/// Mock search for testing.
///
/// Unknown queries return no hits. Every query is logged in call order.
#[derive(Default)]
pub struct MockSearch {
    /// Hits to return per query
    pub results: HashMap<String, Vec<RetrievedItem>>,
    /// Queries that fail
    pub fail_queries: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl MockSearch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add hits for a query.
    pub fn with_results(mut self, query: impl Into<String>, results: Vec<RetrievedItem>) -> Self {
        self.results.insert(query.into(), results);
        self
    }

    /// Mark a query as failing.
    pub fn with_failure(mut self, query: impl Into<String>) -> Self {
        self.fail_queries.insert(query.into());
        self
    }

    /// Queries searched so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls
            .lock()
            .map(|c| c.clone())
            .unwrap_or_else(|p| p.into_inner().clone())
    }
}

#[async_trait]
impl SemanticSearch for MockSearch {
    async fn search(&self, query: &str) -> Result<Vec<RetrievedItem>, SearchError> {
        match self.calls.lock() {
            Ok(mut calls) => calls.push(query.to_string()),
            Err(poisoned) => poisoned.into_inner().push(query.to_string()),
        }

        if self.fail_queries.contains(query) {
            return Err(SearchError::Backend(format!("search failed for '{}'", query)));
        }

        Ok(self.results.get(query).cloned().unwrap_or_default())
    }
}
