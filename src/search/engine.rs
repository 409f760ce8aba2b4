use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use futures::stream::{self, StreamExt};
use tracing::{debug, info, warn};

use super::scorer;
use super::{Query, SearchError, SearchResult};
use crate::embed::Embedder;
use crate::repository::{RepositoryClient, RepositoryEndpoint};

pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SCORING_CONCURRENCY: usize = 8;

/// Fans a query out to every configured repository and ranks what comes back.
///
/// Holds no per-search state: each call owns its futures and its result list,
/// and only the embedder, client and endpoint list are shared between calls.
pub struct SearchEngine<E, C> {
    embedder: Arc<E>,
    client: C,
    endpoints: Vec<RepositoryEndpoint>,
    fetch_timeout: Duration,
    scoring_concurrency: usize,
}

impl<E: Embedder, C: RepositoryClient> SearchEngine<E, C> {
    pub fn new(embedder: Arc<E>, client: C, endpoints: Vec<RepositoryEndpoint>) -> Self {
        Self {
            embedder,
            client,
            endpoints,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            scoring_concurrency: DEFAULT_SCORING_CONCURRENCY,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_scoring_concurrency(mut self, limit: usize) -> Self {
        self.scoring_concurrency = limit.max(1);
        self
    }

    pub fn endpoints(&self) -> &[RepositoryEndpoint] {
        &self.endpoints
    }

    /// Results scoring at least `threshold`, highest similarity first.
    ///
    /// Repositories that fail or time out contribute nothing; only invalid
    /// input or a failure to embed the query itself is an error.
    pub async fn search(
        &self,
        query_text: &str,
        threshold: f32,
    ) -> Result<Vec<SearchResult>, SearchError> {
        let query = Query::new(query_text, threshold)?;
        let query_vector = self.embed_query(&query).await?;

        let per_endpoint = self
            .endpoints
            .iter()
            .map(|endpoint| self.search_endpoint(endpoint, &query, Arc::clone(&query_vector)));

        let mut results: Vec<SearchResult> = join_all(per_endpoint)
            .await
            .into_iter()
            .flatten()
            .collect();

        results.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

        info!(
            query_len = query.text.len(),
            threshold = query.threshold,
            endpoints = self.endpoints.len(),
            results = results.len(),
            "search complete"
        );
        Ok(results)
    }

    async fn embed_query(&self, query: &Query) -> Result<Arc<[f32]>, SearchError> {
        let embedder = Arc::clone(&self.embedder);
        let text = query.text.clone();
        let vector = tokio::task::spawn_blocking(move || embedder.embed(&text))
            .await
            .map_err(|e| SearchError::Internal(e.to_string()))??;
        Ok(vector.into())
    }

    async fn search_endpoint(
        &self,
        endpoint: &RepositoryEndpoint,
        query: &Query,
        query_vector: Arc<[f32]>,
    ) -> Vec<SearchResult> {
        let fetch = self.client.fetch(endpoint, &query.text);
        let candidates = match tokio::time::timeout(self.fetch_timeout, fetch).await {
            Ok(candidates) => candidates,
            Err(_) => {
                warn!(
                    endpoint = %endpoint.name,
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "repository fetch timed out"
                );
                return Vec::new();
            }
        };

        let candidate_count = candidates.len();
        let threshold = query.threshold;

        let outcomes: Vec<_> = stream::iter(candidates)
            .map(|candidate| {
                let embedder = Arc::clone(&self.embedder);
                let query_vector = Arc::clone(&query_vector);
                tokio::task::spawn_blocking(move || {
                    scorer::score(embedder.as_ref(), candidate, &query_vector, threshold)
                })
            })
            .buffer_unordered(self.scoring_concurrency)
            .collect()
            .await;

        let mut results = Vec::new();
        for outcome in outcomes {
            match outcome {
                Ok(Ok(Some(result))) => results.push(result),
                Ok(Ok(None)) => {}
                Ok(Err(e)) => {
                    debug!(endpoint = %endpoint.name, error = %e, "candidate dropped");
                }
                Err(e) => {
                    warn!(endpoint = %endpoint.name, error = %e, "scoring task failed");
                }
            }
        }

        debug!(
            endpoint = %endpoint.name,
            candidates = candidate_count,
            kept = results.len(),
            "endpoint scored"
        );
        results
    }
}
