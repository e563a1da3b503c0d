pub mod google;
pub mod mock;
pub mod types;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use types::Document;

/// Failure of a single search call. Never escapes a round.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("search failed with status {0}")]
    Status(u16),
    #[error("search request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("search timed out after {0:?}")]
    Timeout(Duration),
    #[error("search backend not configured: {0}")]
    NotConfigured(&'static str),
}

#[async_trait]
pub trait SearchBackend: Send + Sync {
    fn name(&self) -> &str;

    async fn search(&self, query: &str) -> Result<Vec<Document>, SearchError>;
}

/// Pick the backend from the environment: Google Custom Search when both
/// credentials are present, the offline canned backend otherwise.
pub fn backend_from_env(results_per_query: u32) -> Result<Arc<dyn SearchBackend>> {
    let key = dotenv::var("GOOGLE_CSE_API_KEY").ok().filter(|k| !k.is_empty());
    let cx = dotenv::var("GOOGLE_CSE_CX").ok().filter(|k| !k.is_empty());

    match (key, cx) {
        (Some(key), Some(cx)) => {
            info!("Using Google Custom Search backend");
            Ok(Arc::new(google::GoogleSearch::new(key, cx, results_per_query)?))
        }
        _ => {
            warn!("GOOGLE_CSE_API_KEY / GOOGLE_CSE_CX not set, using offline mock search");
            Ok(Arc::new(mock::MockSearch::new()))
        }
    }
}

/// Runs every query of a round concurrently and merges the hits.
pub struct FanOut {
    backend: Arc<dyn SearchBackend>,
    timeout: Duration,
}

impl FanOut {
    pub fn new(backend: Arc<dyn SearchBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Issue one search per query, wait for all of them, and merge by url.
    ///
    /// A failing or timed-out query contributes nothing. Results come back in
    /// submission order whatever order the calls finish in, so the merge only
    /// depends on the queries and what the backend returned for them.
    pub async fn search_all(&self, queries: &[String]) -> Vec<Document> {
        if queries.is_empty() {
            return Vec::new();
        }

        let calls = queries.iter().map(|q| self.search_one(q));
        let results = join_all(calls).await;

        let mut failed = 0usize;
        let batches: Vec<Vec<Document>> = results
            .into_iter()
            .zip(queries)
            .map(|(result, query)| match result {
                Ok(docs) => {
                    debug!(query = %query, hits = docs.len(), "search complete");
                    docs
                }
                Err(e) => {
                    failed += 1;
                    warn!(query = %query, error = %e, "search failed, skipping query");
                    Vec::new()
                }
            })
            .collect();

        let merged = merge_by_url(batches);
        info!(
            backend = self.backend.name(),
            queries = queries.len(),
            failed,
            doc_count = merged.len(),
            "fan-out complete"
        );
        merged
    }

    async fn search_one(&self, query: &str) -> Result<Vec<Document>, SearchError> {
        match tokio::time::timeout(self.timeout, self.backend.search(query)).await {
            Ok(result) => result,
            Err(_) => Err(SearchError::Timeout(self.timeout)),
        }
    }
}

/// Flatten per-query batches, keeping the first document seen for each url.
/// Documents without a url cannot be compared and are always kept.
pub fn merge_by_url<I>(batches: I) -> Vec<Document>
where
    I: IntoIterator<Item = Vec<Document>>,
{
    let mut seen = HashSet::new();
    let mut merged = Vec::new();

    for doc in batches.into_iter().flatten() {
        if doc.url.is_empty() || seen.insert(doc.url.clone()) {
            merged.push(doc);
        }
    }

    merged
}
