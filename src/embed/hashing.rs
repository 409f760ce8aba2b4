use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock};

use tracing::debug;

use super::stopwords::ENGLISH;
use super::{Embedder, EmbeddingError, Vector};

pub const DEFAULT_DIMENSION: usize = 4096;
const MIN_TOKEN_CHARS: usize = 2;

static SHARED: OnceLock<Arc<HashingEmbedder>> = OnceLock::new();

/// Hashed TF-IDF-style bag of unigrams and bigrams.
///
/// Features are hashed into `dimension` buckets with FNV-1a, weighted by
/// sublinear term frequency and L2-normalised, so identical texts map to
/// identical unit vectors and unrelated texts share few buckets.
#[derive(Debug)]
pub struct HashingEmbedder {
    dimension: usize,
    stopwords: HashSet<&'static str>,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
            stopwords: ENGLISH.iter().copied().collect(),
        }
    }

    /// Process-wide instance, built on first call and never reconfigured.
    pub fn shared() -> Arc<Self> {
        SHARED
            .get_or_init(|| {
                debug!(dimension = DEFAULT_DIMENSION, "initialising hashing embedder");
                Arc::new(Self::new(DEFAULT_DIMENSION))
            })
            .clone()
    }

    fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() >= MIN_TOKEN_CHARS)
            .map(str::to_lowercase)
            .filter(|t| !self.stopwords.contains(t.as_str()))
            .collect()
    }

    fn bucket(&self, feature: &str) -> usize {
        (fnv1a64(feature) % self.dimension as u64) as usize
    }
}

impl Embedder for HashingEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn embed(&self, text: &str) -> Result<Vector, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let tokens = self.tokenize(text);
        let mut counts: HashMap<usize, u32> = HashMap::new();
        for token in &tokens {
            *counts.entry(self.bucket(token)).or_default() += 1;
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            *counts.entry(self.bucket(&bigram)).or_default() += 1;
        }

        let mut vector = vec![0.0f32; self.dimension];
        for (bucket, tf) in counts {
            vector[bucket] = 1.0 + (tf as f32).ln();
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}

fn fnv1a64(s: &str) -> u64 {
    let mut hash: u64 = 0xcbf29ce484222325;
    for b in s.as_bytes() {
        hash ^= *b as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
