use serde::{Deserialize, Serialize};

use crate::search::{DEFAULT_THRESHOLD, SearchResult};

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    /// Free-text legal question or keywords
    pub query: String,
    /// Minimum similarity in [0, 1] (default: 0.7)
    pub threshold: Option<f32>,
}

impl SearchParams {
    pub fn threshold(&self) -> f32 {
        self.threshold.unwrap_or(DEFAULT_THRESHOLD)
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub message: &'static str,
}
