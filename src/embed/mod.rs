//! Text embedding: turns free text into fixed-length vectors for similarity ranking.

mod hashing;
mod stopwords;

pub use hashing::HashingEmbedder;

pub type Vector = Vec<f32>;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,
}

/// Converts text into a vector whose length is the same for every call.
///
/// Implementations are shared across blocking-pool threads, so `embed` takes
/// `&self` and must not mutate model state.
pub trait Embedder: Send + Sync + 'static {
    fn dimension(&self) -> usize;

    fn embed(&self, text: &str) -> Result<Vector, EmbeddingError>;
}
