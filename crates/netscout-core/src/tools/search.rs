use super::WebToolkit;
use crate::envelope::{Envelope, Failure};
use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value, json};

#[derive(Debug, Serialize)]
struct SearchOutput<'a, T> {
    query: &'a str,
    results: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<&'static str>,
}

#[derive(Debug, Serialize)]
struct BatchOutput {
    total_queries: usize,
    results: Map<String, Value>,
}

fn require_query(query: &str) -> Result<()> {
    if query.trim().is_empty() {
        return Err(Error::InvalidInput("query must not be empty".into()));
    }
    Ok(())
}

/// Render one search call. An empty result list is still a success and
/// carries `empty_message`.
fn search_envelope<T: Serialize>(
    query: &str,
    outcome: Result<Vec<T>>,
    failure_prefix: &str,
    empty_message: &'static str,
) -> String {
    match outcome {
        Ok(results) => {
            let message = results.is_empty().then_some(empty_message);
            Envelope::success(SearchOutput {
                query,
                results,
                message,
            })
            .render()
        },
        Err(err) => Failure::new(failure_prefix, &err)
            .subject("query", query)
            .render(),
    }
}

impl WebToolkit {
    /// Web search returning `{title, url, snippet}` hits.
    #[tracing::instrument(skip(self))]
    pub async fn search_web(&self, query: &str, max_results: usize) -> String {
        let outcome = match require_query(query) {
            Ok(()) => self.search.text(query, max_results).await,
            Err(err) => Err(err),
        };
        search_envelope(query, outcome, "Search failed", "No results found.")
    }

    /// News search returning `{title, url, snippet, source, date}` hits.
    #[tracing::instrument(skip(self))]
    pub async fn search_news(&self, query: &str, max_results: usize) -> String {
        let outcome = match require_query(query) {
            Ok(()) => self.search.news(query, max_results).await,
            Err(err) => Err(err),
        };
        search_envelope(query, outcome, "News search failed", "No news found.")
    }

    /// Image search.
    #[tracing::instrument(skip(self))]
    pub async fn search_images(&self, query: &str, max_results: usize) -> String {
        let outcome = match require_query(query) {
            Ok(()) => self.search.images(query, max_results).await,
            Err(err) => Err(err),
        };
        search_envelope(query, outcome, "Image search failed", "No images found.")
    }

    /// Video search.
    #[tracing::instrument(skip(self))]
    pub async fn search_youtube(&self, query: &str, max_results: usize) -> String {
        let outcome = match require_query(query) {
            Ok(()) => self.search.videos(query, max_results).await,
            Err(err) => Err(err),
        };
        search_envelope(query, outcome, "YouTube search failed", "No videos found.")
    }

    /// Local business and place search.
    #[tracing::instrument(skip(self))]
    pub async fn search_maps(&self, query: &str, max_results: usize) -> String {
        let outcome = match require_query(query) {
            Ok(()) => self.search.places(query, max_results).await,
            Err(err) => Err(err),
        };
        search_envelope(query, outcome, "Maps search failed", "No places found.")
    }

    /// Run web searches for several queries.
    ///
    /// Only the first `limits.batch_max_queries` queries are executed;
    /// `total_queries` still counts every query given. Results are keyed by
    /// query text, and a failed query maps to `{"error": message}` without
    /// failing the batch.
    #[tracing::instrument(skip(self, queries), fields(count = queries.len()))]
    pub async fn batch_search(&self, queries: &[String], max_results_per_query: usize) -> String {
        let limit = self.config.limits.batch_max_queries;
        let mut results = Map::new();

        for query in queries.iter().take(limit) {
            let entry = match self.search.text(query, max_results_per_query).await {
                Ok(hits) => serde_json::to_value(hits).unwrap_or_else(|e| json!({ "error": e.to_string() })),
                Err(err) => {
                    tracing::debug!(query = %query, "batch query failed: {err}");
                    json!({ "error": err.to_string() })
                },
            };
            results.insert(query.clone(), entry);
        }

        Envelope::success(BatchOutput {
            total_queries: queries.len(),
            results,
        })
        .render()
    }
}
