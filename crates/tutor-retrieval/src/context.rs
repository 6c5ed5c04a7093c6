//! Context layer: query generation, retrieval and source deduplication.
//!
//! Failure semantics:
//! - query generation exhausting its retries aborts the turn
//! - a failing search only costs that query's contribution (an empty passage)
//! - retrieval that finds nothing at all still succeeds with an empty bundle

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use tutor_llm::{Stage, StageError, StructuredCaller};
use tutor_types::{
    metadata_key, render_history, ChatMessage, ContextBundle, ContextQueries, ContextSummary,
    PipelineEvent, PipelineSettings, RetrievedItem, SummarizationMode,
};

use crate::prompts::{context_queries_prompt, context_summary_prompt};
use crate::search::SemanticSearch;

/// Configuration for [`ContextLayer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContextLayerConfig {
    /// History messages embedded into prompts
    pub history_turns: usize,

    /// Whether each query's hits are condensed into a synopsis
    pub summarization: SummarizationMode,
}

impl Default for ContextLayerConfig {
    fn default() -> Self {
        Self {
            history_turns: 10,
            summarization: SummarizationMode::Disabled,
        }
    }
}

impl From<&PipelineSettings> for ContextLayerConfig {
    fn from(settings: &PipelineSettings) -> Self {
        Self {
            history_turns: settings.history_turns,
            summarization: settings.summarization,
        }
    }
}

/// Builds the context bundle for a learning-mode turn.
pub struct ContextLayer {
    caller: StructuredCaller,
    search: Arc<dyn SemanticSearch>,
    config: ContextLayerConfig,
}

impl ContextLayer {
    pub fn new(
        caller: StructuredCaller,
        search: Arc<dyn SemanticSearch>,
        config: ContextLayerConfig,
    ) -> Self {
        Self {
            caller,
            search,
            config,
        }
    }

    fn emit(&self, event: PipelineEvent) {
        self.caller.observer().on_event(&event);
    }

    /// Generate queries, then retrieve and merge their context.
    pub async fn run(
        &self,
        query: &str,
        history: &[ChatMessage],
        topic: &str,
    ) -> Result<ContextBundle, StageError> {
        self.emit(
            PipelineEvent::step("Context Layer").with_details("Starting context retrieval pipeline"),
        );
        let start = Instant::now();

        let queries = match self.generate_queries(query, history, topic).await {
            Ok(queries) => queries,
            Err(e) => {
                self.emit(PipelineEvent::error("Context layer failed").with_details(e.to_string()));
                return Err(e);
            }
        };
        let bundle = self.retrieve(&queries.queries, history, topic, query).await;

        self.emit(
            PipelineEvent::success("Context Layer Complete")
                .with_details(format!("Retrieved {} context passages", bundle.passages.len())),
        );
        self.emit(PipelineEvent::timing("Context Layer", start.elapsed()));
        Ok(bundle)
    }

    /// Ask the model for 1-3 knowledge-base queries.
    pub async fn generate_queries(
        &self,
        query: &str,
        history: &[ChatMessage],
        topic: &str,
    ) -> Result<ContextQueries, StageError> {
        self.emit(
            PipelineEvent::step(Stage::ContextQueryGeneration.name())
                .with_details(format!("Generating queries for topic: {}", topic)),
        );
        let start = Instant::now();

        let prompt = context_queries_prompt(
            query,
            &render_history(history, self.config.history_turns),
            topic,
        );
        let messages = [ChatMessage::user(prompt)];

        let queries: ContextQueries = self
            .caller
            .call(Stage::ContextQueryGeneration, &messages)
            .await?;

        self.emit(
            PipelineEvent::success("Context Query Generation Complete")
                .with_details(format!("Generated {} queries", queries.queries.len())),
        );
        self.emit(
            PipelineEvent::info("Generated Context Queries")
                .with_details(format!("Queries: {}", queries.queries.join(", "))),
        );
        self.emit(PipelineEvent::timing(
            Stage::ContextQueryGeneration.name(),
            start.elapsed(),
        ));
        Ok(queries)
    }

    /// Search every query in order and merge the hits.
    ///
    /// Sources are deduplicated across all queries by their full metadata;
    /// the first occurrence decides both the kept passage and its position.
    pub async fn retrieve(
        &self,
        queries: &[String],
        history: &[ChatMessage],
        topic: &str,
        query: &str,
    ) -> ContextBundle {
        self.emit(
            PipelineEvent::step("Context Retrieval")
                .with_details(format!("Processing {} context queries", queries.len())),
        );
        let start = Instant::now();

        let mut bundle = ContextBundle::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (i, context_query) in queries.iter().enumerate() {
            self.emit(
                PipelineEvent::info(format!("Context Query {}/{}", i + 1, queries.len()))
                    .with_details(format!("Searching for: {}", context_query)),
            );

            let search_start = Instant::now();
            let items = match self.search.search(context_query).await {
                Ok(items) => items,
                Err(e) => {
                    self.emit(
                        PipelineEvent::error(format!(
                            "Context retrieval failed for query: {}",
                            context_query
                        ))
                        .with_details(e.to_string()),
                    );
                    bundle.passages.push(String::new());
                    continue;
                }
            };
            self.emit(PipelineEvent::success("Semantic Search Complete").with_details(format!(
                "Found {} results in {:.2}s",
                items.len(),
                search_start.elapsed().as_secs_f64()
            )));

            let fresh = merge_unique(&mut seen, &mut bundle, &items);
            debug!(
                query = %context_query,
                hits = items.len(),
                new_sources = fresh.len(),
                "Merged search hits"
            );

            match self.config.summarization {
                SummarizationMode::Disabled => bundle.passages.extend(fresh),
                SummarizationMode::Enabled => {
                    // Nothing to summarize; no synopsis and no model call
                    if items.is_empty() {
                        continue;
                    }
                    match self
                        .summarize(query, history, topic, context_query, &items)
                        .await
                    {
                        Ok(summary) => bundle.passages.push(summary.summary),
                        Err(e) => {
                            self.emit(
                                PipelineEvent::error(format!(
                                    "Context retrieval failed for query: {}",
                                    context_query
                                ))
                                .with_details(e.to_string()),
                            );
                            bundle.passages.push(String::new());
                        }
                    }
                }
            }
        }

        if bundle.is_blank() {
            self.emit(
                PipelineEvent::warning("No Context Retrieved")
                    .with_details("Answering without knowledge-base context"),
            );
        }
        info!(
            passages = bundle.non_empty_passages(),
            sources = bundle.metadata.len(),
            "Context retrieval finished"
        );
        self.emit(PipelineEvent::success("Context Retrieval Complete").with_details(format!(
            "Collected {} passages from {} unique sources",
            bundle.non_empty_passages(),
            bundle.metadata.len()
        )));
        self.emit(PipelineEvent::timing("Context Retrieval", start.elapsed()));
        bundle
    }

    /// Condense one query's hits into a topic-relevant synopsis.
    pub async fn summarize(
        &self,
        query: &str,
        history: &[ChatMessage],
        topic: &str,
        context_query: &str,
        items: &[RetrievedItem],
    ) -> Result<ContextSummary, StageError> {
        self.emit(PipelineEvent::step(Stage::ContextSummarization.name()).with_details(format!(
            "Summarizing {} items for query: {}",
            items.len(),
            context_query
        )));
        let start = Instant::now();

        let prompt = context_summary_prompt(
            query,
            &render_history(history, self.config.history_turns),
            topic,
            context_query,
            items,
        );
        let messages = [ChatMessage::user(prompt)];
        let summary: ContextSummary = self
            .caller
            .call(Stage::ContextSummarization, &messages)
            .await?;

        self.emit(PipelineEvent::success("Context Summarization Complete").with_details(format!(
            "Summary length: {} chars for query: {}",
            summary.summary.chars().count(),
            context_query
        )));
        self.emit(PipelineEvent::timing(
            Stage::ContextSummarization.name(),
            start.elapsed(),
        ));
        Ok(summary)
    }
}

/// Record unseen sources in `bundle.metadata`; return their passages in order.
fn merge_unique(
    seen: &mut HashSet<String>,
    bundle: &mut ContextBundle,
    items: &[RetrievedItem],
) -> Vec<String> {
    let mut fresh = Vec::new();
    for item in items {
        if seen.insert(metadata_key(&item.metadata)) {
            bundle.metadata.push(item.metadata.clone());
            fresh.push(item.passage.clone());
        }
    }
    fresh
}
