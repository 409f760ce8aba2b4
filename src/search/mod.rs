//! Query validation, candidate scoring and the multi-repository search pipeline.

pub(crate) mod engine;
pub(crate) mod scorer;

pub use engine::SearchEngine;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::embed::EmbeddingError;

pub const DEFAULT_THRESHOLD: f32 = 0.7;

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Query cannot be empty")]
    InvalidQuery,

    #[error("Threshold must be between 0 and 1 (got {0})")]
    InvalidThreshold(f32),

    #[error("failed to embed query: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("search task failed: {0}")]
    Internal(String),
}

/// A validated search request. Built once per call and only read afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub text: String,
    pub threshold: f32,
}

impl Query {
    pub fn new(text: &str, threshold: f32) -> Result<Self, SearchError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(SearchError::InvalidThreshold(threshold));
        }
        if text.trim().is_empty() {
            return Err(SearchError::InvalidQuery);
        }
        Ok(Self {
            text: text.to_string(),
            threshold,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    /// Issuing court as reported by the repository.
    pub source: String,
    pub url: String,
    pub similarity_score: f32,
    pub jurisdiction: String,
    pub date_published: DateTime<Utc>,
    /// Name of the configured repository the record came from.
    pub repository: String,
}
