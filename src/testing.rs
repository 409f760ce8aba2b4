//! Hand-written stand-ins for the embedder and repository client.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::embed::{Embedder, EmbeddingError, Vector};
use crate::repository::{RawCandidate, RepositoryClient, RepositoryEndpoint};

/// Maps exact texts to fixed vectors. Unknown texts embed to zero.
pub(crate) struct StubEmbedder {
    dimension: usize,
    vectors: HashMap<String, Vector>,
    failing: HashSet<String>,
}

impl StubEmbedder {
    pub(crate) fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
            failing: HashSet::new(),
        }
    }

    pub(crate) fn with(mut self, text: &str, vector: Vector) -> Self {
        assert_eq!(vector.len(), self.dimension);
        self.vectors.insert(text.to_string(), vector);
        self
    }

    pub(crate) fn failing(mut self, text: &str) -> Self {
        self.failing.insert(text.to_string());
        self
    }
}

impl Embedder for StubEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vector, EmbeddingError> {
        if text.trim().is_empty() || self.failing.contains(text) {
            return Err(EmbeddingError::EmptyInput);
        }
        Ok(self
            .vectors
            .get(text)
            .cloned()
            .unwrap_or_else(|| vec![0.0; self.dimension]))
    }
}

enum Reply {
    Records(Vec<RawCandidate>),
    Hang,
}

/// Answers per endpoint name; endpoints without a reply return nothing.
#[derive(Default)]
pub(crate) struct StubClient {
    replies: HashMap<String, Reply>,
    calls: Mutex<Vec<(String, String)>>,
}

impl StubClient {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Records for `endpoint`, each with `text` as content and `title` as title.
    pub(crate) fn returning(mut self, endpoint: &str, docs: &[(&str, &str)]) -> Self {
        let records = docs
            .iter()
            .map(|(title, text)| RawCandidate {
                repository: endpoint.to_string(),
                title: Some(title.to_string()),
                text: Some(text.to_string()),
                ..RawCandidate::default()
            })
            .collect();
        self.replies
            .insert(endpoint.to_string(), Reply::Records(records));
        self
    }

    pub(crate) fn returning_raw(mut self, endpoint: &str, records: Vec<RawCandidate>) -> Self {
        self.replies
            .insert(endpoint.to_string(), Reply::Records(records));
        self
    }

    pub(crate) fn hanging(mut self, endpoint: &str) -> Self {
        self.replies.insert(endpoint.to_string(), Reply::Hang);
        self
    }

    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

impl RepositoryClient for StubClient {
    async fn fetch(&self, endpoint: &RepositoryEndpoint, query: &str) -> Vec<RawCandidate> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.name.clone(), query.to_string()));
        match self.replies.get(&endpoint.name) {
            Some(Reply::Records(records)) => records.clone(),
            Some(Reply::Hang) => std::future::pending().await,
            None => Vec::new(),
        }
    }
}

pub(crate) fn endpoint(name: &str) -> RepositoryEndpoint {
    RepositoryEndpoint {
        name: name.to_string(),
        address: url::Url::parse(&format!("https://{name}.example.com/search"))
            .unwrap(),
        request: Default::default(),
        fields: Default::default(),
        credential: None,
    }
}
